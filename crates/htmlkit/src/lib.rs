//! # htmlkit
//!
//! Embeddable HTML parsing and querying: a fault-tolerant HTML5 tokenizer
//! and tree builder, an arena DOM, and a CSS Selectors Level 3/4 subset
//! compiler and matcher.
//!
//! ```
//! use htmlkit::{parse, Queryable};
//!
//! let doc = parse("<ul><li class=\"x\">one</li><li>two</li></ul>").unwrap();
//! let items = doc.css("li.x");
//! assert_eq!(items.extract_texts(), vec!["one"]);
//! ```

use std::path::Path;

pub use htmlkit_common::{ErrorCode, ErrorHandling, Location, ParseError, ParseResult};
pub use htmlkit_css::{
    compile, compile_cached, compile_with, is_valid_selector, normalize_selector, AttrOperator,
    Combinator, CompileOutput, NthExpr, PseudoClass, PseudoElement, Selector, SelectorList,
    Specificity,
};
pub use htmlkit_dom::{
    Attribute, Document, ElementRef, Node, NodeData, NodeId, NodeType,
};
pub use htmlkit_parser::{
    BrHandling, CommentMode, ParseOutput, ParserOptions, TextProcessingMode, Token, TokenKind,
    Tokenizer, TreeBuilder, WhitespaceMode,
};
pub use htmlkit_query::{
    matches, query, query_all, query_all_within, query_first, query_first_within, try_query,
    ElementQuery, Queryable,
};

/// Parse HTML with default (lenient) options.
pub fn parse(html: &str) -> ParseResult<Document> {
    htmlkit_parser::parse(html, &ParserOptions::default())
}

/// Parse HTML with default options, keeping the error list.
pub fn parse_with_errors(html: &str) -> ParseResult<ParseOutput> {
    htmlkit_parser::parse_with_errors(html, &ParserOptions::default())
}

/// Parse HTML with explicit options.
pub fn parse_with(html: &str, options: &ParserOptions) -> ParseResult<Document> {
    htmlkit_parser::parse(html, options)
}

/// Parse HTML with explicit options, keeping the error list.
pub fn parse_with_errors_opts(html: &str, options: &ParserOptions) -> ParseResult<ParseOutput> {
    htmlkit_parser::parse_with_errors(html, options)
}

/// Read and parse a file with default options.
pub fn parse_file(path: impl AsRef<Path>) -> ParseResult<Document> {
    htmlkit_parser::parse_file(path, &ParserOptions::default())
}

/// Library version string.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
    }

    #[test]
    fn facade_parse_and_query() {
        let doc = parse("<div id=\"a\"><span>hi</span></div>").unwrap();
        assert_eq!(doc.css("#a span").extract_texts(), vec!["hi"]);
        assert_eq!(query_first(&doc, "span").unwrap().text_content(), "hi");
    }
}

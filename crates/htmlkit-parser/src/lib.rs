//! # htmlkit Parser
//!
//! Fault-tolerant HTML5 parsing: a state-machine [`Tokenizer`] feeding a
//! [`TreeBuilder`] that produces an [`htmlkit_dom::Document`].
//!
//! The default policy is lenient: recoverable errors are collected and a
//! partial document is always returned. Strict mode turns the first error
//! into a hard failure.

pub mod options;
pub mod tokenizer;
pub mod tree_builder;

use std::path::Path;

use htmlkit_common::{ErrorCode, ErrorHandling, Location, ParseError, ParseResult};
use htmlkit_dom::Document;
use tracing::debug;

pub use options::{
    BrHandling, CommentMode, ParserOptions, TextProcessingMode, WhitespaceMode, RAW_TEXT_ELEMENTS,
    RCDATA_ELEMENTS, VOID_ELEMENTS,
};
pub use tokenizer::{Token, TokenKind, Tokenizer};
pub use tree_builder::TreeBuilder;

/// A parsed document together with the errors collected along the way.
#[derive(Debug)]
pub struct ParseOutput {
    pub document: Document,
    pub errors: Vec<ParseError>,
}

/// Parse HTML, returning the document and the collected error list.
///
/// Under `ErrorHandling::Strict` the first recoverable error aborts and is
/// returned as `Err`; under `Ignore` the error list comes back empty.
pub fn parse_with_errors(html: &str, options: &ParserOptions) -> ParseResult<ParseOutput> {
    let mut tokenizer = Tokenizer::new(html, options);
    let mut builder = TreeBuilder::new(html.to_string(), options);
    let strict = options.error_handling.is_strict();

    loop {
        let token = tokenizer.next_token();
        let done = token.is_done();
        builder.process_token(token);
        if strict {
            if let Some(err) = tokenizer.errors().first().or_else(|| builder.errors().first()) {
                return Err(err.clone());
            }
        }
        if done {
            break;
        }
    }

    let (document, builder_errors) = builder.finish();
    if strict {
        if let Some(err) = builder_errors.first() {
            return Err(err.clone());
        }
    }

    // Tokenizer errors come first (they are in source order), then builder
    // errors in processing order: finish() reports unclosed tags innermost
    // first.
    let mut errors = tokenizer.take_errors();
    errors.extend(builder_errors);

    debug!(
        nodes = document.node_count(),
        errors = errors.len(),
        "parse complete"
    );

    if options.error_handling == ErrorHandling::Ignore {
        errors.clear();
    }
    Ok(ParseOutput { document, errors })
}

/// Parse HTML into a document.
pub fn parse(html: &str, options: &ParserOptions) -> ParseResult<Document> {
    parse_with_errors(html, options).map(|output| output.document)
}

/// Read a file and parse its contents.
pub fn parse_file(path: impl AsRef<Path>, options: &ParserOptions) -> ParseResult<Document> {
    parse_file_with_errors(path, options).map(|output| output.document)
}

/// Read a file and parse its contents, keeping the error list.
pub fn parse_file_with_errors(
    path: impl AsRef<Path>,
    options: &ParserOptions,
) -> ParseResult<ParseOutput> {
    let path = path.as_ref();
    let html = std::fs::read_to_string(path).map_err(|e| {
        ParseError::new(
            ErrorCode::FileReadError,
            format!("cannot read {}: {e}", path.display()),
            Location::default(),
        )
    })?;
    parse_with_errors(&html, options)
}

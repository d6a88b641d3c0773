//! # htmlkit CSS
//!
//! CSS Selectors Level 3/4 subset for htmlkit: a selector lexer, a
//! recursive-descent compiler producing a typed AST with specificity, and
//! a matcher over the htmlkit DOM.
//!
//! Selector text is normalized (lowercased outside strings, whitespace
//! collapsed) before compilation, and the string-based entry points cache
//! compiled selectors keyed on the normalized form.

pub mod lexer;
pub mod matcher;
pub mod nth;
pub mod parser;
pub mod selector;

use std::collections::HashMap;
use std::sync::Mutex;

use htmlkit_common::{ErrorHandling, ParseError, ParseResult};
use lazy_static::lazy_static;
use tracing::debug;

pub use lexer::{CssLexer, CssToken, CssTokenKind};
pub use matcher::{
    find_all, find_all_within, find_first, find_first_within, matches, matches_list,
};
pub use nth::NthExpr;
pub use parser::CssParser;
pub use selector::{
    AttrOperator, Combinator, PseudoClass, PseudoElement, RelativeSelector,
    RelativeSelectorList, Selector, SelectorList, Specificity,
};

/// A compiled selector list plus the errors collected while compiling.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub selectors: SelectorList,
    pub errors: Vec<ParseError>,
}

/// Compile a selector under the given error policy.
///
/// Strict: the first error aborts. Lenient: errors are returned alongside
/// whatever compiled. Ignore: errors are discarded.
pub fn compile_with(selector: &str, policy: ErrorHandling) -> ParseResult<CompileOutput> {
    let normalized = normalize_selector(selector);
    let mut parser = CssParser::new(&normalized);
    let selectors = parser.parse_selector_list();
    let mut errors = parser.take_errors();
    debug!(selector = %normalized, count = selectors.len(), errors = errors.len(), "compiled selector");
    match policy {
        ErrorHandling::Strict => {
            if let Some(err) = errors.first() {
                return Err(err.clone());
            }
        }
        ErrorHandling::Lenient => {}
        ErrorHandling::Ignore => errors.clear(),
    }
    Ok(CompileOutput { selectors, errors })
}

/// Compile a selector leniently, keeping only the result.
pub fn compile(selector: &str) -> ParseResult<SelectorList> {
    compile_with(selector, ErrorHandling::Lenient).map(|output| output.selectors)
}

lazy_static! {
    static ref SELECTOR_CACHE: Mutex<HashMap<String, SelectorList>> = Mutex::new(HashMap::new());
}

const SELECTOR_CACHE_CAP: usize = 512;

/// Compile through the global cache, keyed on the normalized selector.
pub fn compile_cached(selector: &str) -> ParseResult<SelectorList> {
    let key = normalize_selector(selector);
    {
        let cache = SELECTOR_CACHE
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(hit) = cache.get(&key) {
            return Ok(hit.clone());
        }
    }
    let compiled = compile(&key)?;
    let mut cache = SELECTOR_CACHE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if cache.len() >= SELECTOR_CACHE_CAP {
        cache.clear();
    }
    cache.insert(key, compiled.clone());
    Ok(compiled)
}

/// Whether the selector compiles cleanly to a non-empty list.
pub fn is_valid_selector(selector: &str) -> bool {
    match compile_with(selector, ErrorHandling::Lenient) {
        Ok(output) => !output.selectors.is_empty() && output.errors.is_empty(),
        Err(_) => false,
    }
}

/// Normalize selector text: lowercase outside quoted strings and collapse
/// whitespace runs to a single space. Used both as the cache key and as
/// the text actually compiled, so equivalent selectors share one AST.
pub fn normalize_selector(selector: &str) -> String {
    let mut out = String::with_capacity(selector.len());
    let mut in_string = false;
    let mut quote = '\0';
    let mut last_was_space = false;
    let mut chars = selector.chars();
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == quote {
                in_string = false;
            }
            last_was_space = false;
        } else if c == '"' || c == '\'' {
            in_string = true;
            quote = c;
            out.push(c);
            last_was_space = false;
        } else if c.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            for lower in c.to_lowercase() {
                out.push(lower);
            }
            last_was_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_lowercases() {
        assert_eq!(normalize_selector("  DIV   >  P  "), "div > p");
        assert_eq!(normalize_selector("Ul\tLi"), "ul li");
    }

    #[test]
    fn normalize_preserves_strings() {
        assert_eq!(
            normalize_selector("[data-x=\"Hello  World\"]"),
            "[data-x=\"Hello  World\"]"
        );
        assert_eq!(normalize_selector("[a='B C']"), "[a='B C']");
    }

    #[test]
    fn compile_folds_tag_case() {
        let list = compile("DIV > SPAN").unwrap();
        assert_eq!(list.to_string(), "div > span");
    }

    #[test]
    fn strict_compile_fails_on_error() {
        assert!(compile_with("div >", ErrorHandling::Strict).is_err());
        assert!(compile_with("div > p", ErrorHandling::Strict).is_ok());
    }

    #[test]
    fn ignore_compile_discards_errors() {
        let output = compile_with("div:blink", ErrorHandling::Ignore).unwrap();
        assert!(output.errors.is_empty());
        assert_eq!(output.selectors.len(), 1);
    }

    #[test]
    fn validity_check() {
        assert!(is_valid_selector("div.note > p:first-child"));
        assert!(is_valid_selector("a[href^=\"http\"], b"));
        assert!(!is_valid_selector(""));
        assert!(!is_valid_selector("div >"));
        assert!(!is_valid_selector("div, p,"));
        assert!(!is_valid_selector(":nth-child(x)"));
    }

    #[test]
    fn cache_returns_equivalent_results() {
        let direct = compile("div  >  p").unwrap();
        let cached = compile_cached("DIV > P").unwrap();
        let again = compile_cached("div > p").unwrap();
        assert_eq!(direct, cached);
        assert_eq!(cached, again);
    }

    #[test]
    fn specificity_of_compiled_selectors() {
        let list = compile("div.note#x:first-child::before").unwrap();
        assert_eq!(
            list.selectors[0].specificity(),
            Specificity::new(1, 2, 2)
        );
        let list = compile(":where(#a, .b)").unwrap();
        assert_eq!(list.selectors[0].specificity(), Specificity::new(0, 0, 0));
        let list = compile(":is(#a, .b)").unwrap();
        assert_eq!(list.selectors[0].specificity(), Specificity::new(1, 0, 0));
    }
}

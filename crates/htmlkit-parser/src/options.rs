//! Parser configuration.

use std::collections::HashSet;

use htmlkit_common::ErrorHandling;

/// The built-in set of void elements (no content, no end tag).
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose content is tokenized as a single raw text run.
pub const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript",
];

/// Elements tokenized like raw text but with character-reference decoding.
pub const RCDATA_ELEMENTS: &[&str] = &["textarea", "title"];

/// Whether comments become DOM nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentMode {
    #[default]
    Preserve,
    Remove,
    /// Processed but not added to the tree. Currently identical to `Remove`.
    ProcessOnly,
}

/// How text runs are treated before insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhitespaceMode {
    #[default]
    Preserve,
    /// Collapse runs of whitespace to a single space.
    Normalize,
    /// Trim leading and trailing whitespace per text run.
    Trim,
    /// Drop text runs that are entirely whitespace.
    Remove,
}

/// Entity handling. `Decode` expands only `&nbsp;`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextProcessingMode {
    #[default]
    Raw,
    Decode,
}

/// Whether `<br>` stays an element or becomes configurable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrHandling {
    #[default]
    Keep,
    InsertCustom,
}

/// Options controlling tokenization and tree construction.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub error_handling: ErrorHandling,
    pub comment_mode: CommentMode,
    pub whitespace_mode: WhitespaceMode,
    pub text_processing_mode: TextProcessingMode,
    pub br_handling: BrHandling,
    /// Payload inserted for `<br>` when `br_handling` is `InsertCustom`.
    pub br_text: String,
    /// Keep the source casing of tag and attribute names.
    pub preserve_case: bool,
    pub max_tokens: usize,
    pub max_depth: usize,
    pub max_attributes: usize,
    pub max_attribute_name_length: usize,
    pub max_attribute_value_length: usize,
    pub max_text_length: usize,
    /// Override for the void-element set.
    pub void_elements: HashSet<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            error_handling: ErrorHandling::Lenient,
            comment_mode: CommentMode::Preserve,
            whitespace_mode: WhitespaceMode::Preserve,
            text_processing_mode: TextProcessingMode::Raw,
            br_handling: BrHandling::Keep,
            br_text: "\n".to_string(),
            preserve_case: false,
            max_tokens: 1_000_000,
            max_depth: 1_000,
            max_attributes: 100,
            max_attribute_name_length: 256,
            max_attribute_value_length: 8_192,
            max_text_length: 1_048_576,
            void_elements: VOID_ELEMENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ParserOptions {
    /// Strict error handling with tighter resource caps.
    pub fn strict() -> Self {
        Self {
            error_handling: ErrorHandling::Strict,
            max_tokens: 100_000,
            max_depth: 100,
            ..Self::default()
        }
    }

    pub fn lenient() -> Self {
        Self::default()
    }

    /// Comments stripped from the tree.
    pub fn sanitized() -> Self {
        Self {
            comment_mode: CommentMode::Remove,
            ..Self::default()
        }
    }

    /// Larger caps, comments and whitespace-only text dropped.
    pub fn performance() -> Self {
        Self {
            comment_mode: CommentMode::Remove,
            whitespace_mode: WhitespaceMode::Remove,
            max_tokens: 10_000_000,
            ..Self::default()
        }
    }

    /// Whether `name` is a void element under the configured set.
    /// Comparison is ASCII-case-insensitive.
    pub fn is_void(&self, name: &str) -> bool {
        self.void_elements
            .iter()
            .any(|v| v.eq_ignore_ascii_case(name))
    }
}

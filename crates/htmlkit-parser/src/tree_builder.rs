//! HTML tree builder.
//!
//! Consumes the token stream and produces a [`Document`], maintaining an
//! open-element stack with implicit-close and void-element semantics.

use htmlkit_common::{ErrorCode, Location, ParseError};
use htmlkit_dom::{Document, NodeId};
use tracing::trace;

use crate::options::{CommentMode, ParserOptions, WhitespaceMode};
use crate::tokenizer::{Token, TokenKind};

/// Scope boundaries for implicit-close searches. An implicit close only
/// fires when the target element is found before one of these on the stack.
const DEFAULT_SCOPE: &[&str] = &[
    "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template",
];
const LIST_ITEM_SCOPE: &[&str] = &[
    "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template", "ol", "ul",
];
const TABLE_SCOPE: &[&str] = &["html", "table", "template"];

/// One open element: tag name as stored, node id, byte offset of its open
/// tag (for error reporting).
struct OpenElement {
    name: String,
    id: NodeId,
    offset: usize,
}

/// Builds a [`Document`] from tokens.
pub struct TreeBuilder<'o> {
    document: Document,
    options: &'o ParserOptions,
    stack: Vec<OpenElement>,
    errors: Vec<ParseError>,
    /// Number of swallowed open tags below the depth limit cut.
    skip_depth: usize,
    depth_reported: bool,
}

impl<'o> TreeBuilder<'o> {
    pub fn new(source: String, options: &'o ParserOptions) -> Self {
        Self {
            document: Document::new(source),
            options,
            stack: Vec::with_capacity(32),
            errors: Vec::new(),
            skip_depth: 0,
            depth_reported: false,
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Process one token.
    pub fn process_token(&mut self, token: Token) {
        trace!(token = ?token.kind, depth = self.stack.len(), "process token");
        match token.kind {
            TokenKind::OpenTag { name, attrs } => {
                self.process_open_tag(name, attrs, token.offset, false)
            }
            TokenKind::SelfClosingTag { name, attrs } => {
                self.process_open_tag(name, attrs, token.offset, true)
            }
            TokenKind::CloseTag { name } => self.process_close_tag(&name, token.offset),
            TokenKind::Text(text) => self.process_text(text),
            TokenKind::Comment(text) => self.process_comment(text),
            TokenKind::Doctype(name) => self.document.set_doctype(name),
            TokenKind::ForceQuirks => {
                self.record(
                    ErrorCode::InvalidNesting,
                    "force quirks mode detected",
                    token.offset,
                );
            }
            TokenKind::Done => {}
        }
    }

    /// Close everything still open and hand back the document.
    pub fn finish(mut self) -> (Document, Vec<ParseError>) {
        while let Some(open) = self.stack.pop() {
            let message = format!("unclosed tag: {}", open.name);
            self.record(ErrorCode::UnclosedTag, message, open.offset);
        }
        (self.document, self.errors)
    }

    // ==================== Token handling ====================

    fn process_open_tag(
        &mut self,
        name: String,
        attrs: Vec<htmlkit_dom::Attribute>,
        offset: usize,
        self_closing: bool,
    ) {
        if self.skip_depth > 0 {
            // Inside a subtree swallowed by the depth limit.
            if !self_closing {
                self.skip_depth += 1;
            }
            return;
        }

        self.apply_implicit_close(&name, offset);

        if self.stack.len() >= self.options.max_depth {
            if !self.depth_reported {
                self.depth_reported = true;
                self.record(ErrorCode::TooDeep, "maximum nesting depth exceeded", offset);
            }
            if !self_closing {
                self.skip_depth = 1;
            }
            return;
        }

        let id = self.document.create_element(name.clone(), attrs);
        let parent = self.current_parent();
        self.document.append_child(parent, id);

        if !self_closing {
            self.stack.push(OpenElement { name, id, offset });
        }
    }

    fn process_close_tag(&mut self, name: &str, offset: usize) {
        if self.skip_depth > 0 {
            if !self.options.is_void(name) {
                self.skip_depth -= 1;
            }
            return;
        }

        if self.options.is_void(name) {
            let message = format!("void element should not have a closing tag: {name}");
            self.record(ErrorCode::VoidElementClose, message, offset);
            return;
        }

        if !self
            .stack
            .iter()
            .any(|open| open.name.eq_ignore_ascii_case(name))
        {
            let message = format!("no matching opening tag for: {name}");
            self.record(ErrorCode::MismatchedTag, message, offset);
            return;
        }

        while let Some(open) = self.stack.pop() {
            if open.name.eq_ignore_ascii_case(name) {
                break;
            }
            let message = format!("auto-closing unclosed tag: {}", open.name);
            self.record(ErrorCode::MismatchedTag, message, offset);
        }
    }

    fn process_text(&mut self, text: String) {
        if self.skip_depth > 0 {
            return;
        }
        let text = match self.options.whitespace_mode {
            WhitespaceMode::Preserve => text,
            WhitespaceMode::Remove => {
                if text.bytes().all(|b| b.is_ascii_whitespace()) {
                    return;
                }
                text
            }
            WhitespaceMode::Normalize => collapse_whitespace(&text),
            WhitespaceMode::Trim => {
                let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
                if trimmed.is_empty() {
                    return;
                }
                trimmed.to_string()
            }
        };
        if text.is_empty() {
            return;
        }
        let parent = self.current_parent();
        // Adjacent text runs under one parent coalesce into one node.
        if let Some(last) = self.document.last_child(parent) {
            if self.document.node(last).as_text().is_some() {
                self.document.extend_text(last, &text);
                return;
            }
        }
        let id = self.document.create_text(text);
        self.document.append_child(parent, id);
    }

    fn process_comment(&mut self, text: String) {
        if self.skip_depth > 0 {
            return;
        }
        match self.options.comment_mode {
            CommentMode::Preserve => {
                let id = self.document.create_comment(text);
                let parent = self.current_parent();
                self.document.append_child(parent, id);
            }
            CommentMode::Remove | CommentMode::ProcessOnly => {}
        }
    }

    // ==================== Stack helpers ====================

    fn current_parent(&self) -> NodeId {
        self.stack
            .last()
            .map(|open| open.id)
            .unwrap_or(Document::ROOT)
    }

    /// The implicit-close rules: a new `p` closes an open `p`, a new `li`
    /// closes an open `li`, a new `tr` closes an open `tr`. Closing an
    /// unterminated paragraph is reported as an unclosed tag; list items
    /// and table rows close silently (ending them with the next item is
    /// the normal authoring style).
    fn apply_implicit_close(&mut self, name: &str, offset: usize) {
        let (target, boundaries, noisy): (&str, &[&str], bool) =
            match name.to_ascii_lowercase().as_str() {
                "p" => ("p", DEFAULT_SCOPE, true),
                "li" => ("li", LIST_ITEM_SCOPE, false),
                "tr" => ("tr", TABLE_SCOPE, false),
                _ => return,
            };
        if !self.has_in_scope(target, boundaries) {
            return;
        }
        while let Some(open) = self.stack.pop() {
            let matched = open.name.eq_ignore_ascii_case(target);
            if noisy {
                let message = format!("unclosed tag: {}", open.name);
                self.record(ErrorCode::UnclosedTag, message, offset);
            }
            if matched {
                break;
            }
        }
    }

    fn has_in_scope(&self, target: &str, boundaries: &[&str]) -> bool {
        for open in self.stack.iter().rev() {
            if open.name.eq_ignore_ascii_case(target) {
                return true;
            }
            if boundaries
                .iter()
                .any(|b| open.name.eq_ignore_ascii_case(b))
            {
                return false;
            }
        }
        false
    }

    fn record(&mut self, code: ErrorCode, message: impl Into<String>, offset: usize) {
        let location = Location::from_offset(self.document.source(), offset);
        self.errors.push(ParseError::new(code, message, location));
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

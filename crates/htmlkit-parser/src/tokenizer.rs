//! HTML tokenizer.
//!
//! A fault-tolerant HTML5 tokenizer driven by an explicit state machine.
//! Each call to [`Tokenizer::next_token`] advances the machine until one
//! token is produced; after the input is exhausted every further call
//! returns [`TokenKind::Done`]. Recoverable errors accumulate in an error
//! list and never stop tokenization; strict-mode abortion is the caller's
//! decision.

use htmlkit_common::{ErrorCode, Location, ParseError};
use htmlkit_dom::Attribute;
use tracing::trace;

use crate::options::{
    BrHandling, ParserOptions, TextProcessingMode, RAW_TEXT_ELEMENTS, RCDATA_ELEMENTS,
};

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    OpenTag { name: String, attrs: Vec<Attribute> },
    CloseTag { name: String },
    SelfClosingTag { name: String, attrs: Vec<Attribute> },
    Text(String),
    Comment(String),
    Doctype(String),
    ForceQuirks,
    Done,
}

/// A token plus the byte offset where it began in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

impl Token {
    pub fn is_done(&self) -> bool {
        matches!(self.kind, TokenKind::Done)
    }

    /// Tag name for tag tokens, `None` otherwise.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::OpenTag { name, .. }
            | TokenKind::CloseTag { name }
            | TokenKind::SelfClosingTag { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Tokenization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    TagOpen,
    TagName,
    EndTagOpen,
    EndTagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    SelfClosingStartTag,
    MarkupDeclarationOpen,
    BogusComment,
    CommentStart,
    Comment,
    CommentEndDash,
    CommentEnd,
    Doctype,
    DoctypeName,
    AfterDoctypeName,
    CdataSection,
    ScriptData,
    Rawtext,
    Rcdata,
}

/// HTML tokenizer over a source string.
pub struct Tokenizer<'s> {
    source: &'s str,
    options: &'s ParserOptions,
    pos: usize,
    line: usize,
    column: usize,
    state: State,
    errors: Vec<ParseError>,

    // Current tag under construction.
    token_start: usize,
    tag_name: String,
    attrs: Vec<Attribute>,
    attr_name: String,
    attr_value: String,
    is_end_tag: bool,
    attr_limit_hit: bool,
    attr_name_truncated: bool,
    attr_value_truncated: bool,

    // Text accumulation.
    text_buf: String,
    text_start: usize,
    text_truncated: bool,

    // Comment / doctype / CDATA scratch.
    comment_buf: String,
    doctype_name: String,
    bogus_emit: bool,

    // Raw-text context: lowercase name of the element that entered it.
    raw_end_tag: String,

    token_count: usize,
    done: bool,
    iterator_finished: bool,
    limit_reported: bool,
}

impl<'s> Tokenizer<'s> {
    pub fn new(source: &'s str, options: &'s ParserOptions) -> Self {
        Self {
            source,
            options,
            pos: 0,
            line: 1,
            column: 1,
            state: State::Data,
            errors: Vec::new(),
            token_start: 0,
            tag_name: String::new(),
            attrs: Vec::new(),
            attr_name: String::new(),
            attr_value: String::new(),
            is_end_tag: false,
            attr_limit_hit: false,
            attr_name_truncated: false,
            attr_value_truncated: false,
            text_buf: String::new(),
            text_start: 0,
            text_truncated: false,
            comment_buf: String::new(),
            doctype_name: String::new(),
            bogus_emit: false,
            raw_end_tag: String::new(),
            token_count: 0,
            done: false,
            iterator_finished: false,
            limit_reported: false,
        }
    }

    /// Current byte position in the source.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    /// Produce the next token, advancing the state machine.
    pub fn next_token(&mut self) -> Token {
        if self.done {
            return Token {
                kind: TokenKind::Done,
                offset: self.source.len(),
            };
        }
        if self.token_count >= self.options.max_tokens {
            if !self.limit_reported {
                self.limit_reported = true;
                self.error(ErrorCode::TooManyElements, "token limit exceeded");
            }
            self.done = true;
            return Token {
                kind: TokenKind::Done,
                offset: self.pos,
            };
        }
        loop {
            let produced = match self.state {
                State::Data => self.state_data(),
                State::TagOpen => self.state_tag_open(),
                State::TagName => self.state_tag_name(),
                State::EndTagOpen => self.state_end_tag_open(),
                State::EndTagName => self.state_end_tag_name(),
                State::BeforeAttributeName => self.state_before_attribute_name(),
                State::AttributeName => self.state_attribute_name(),
                State::AfterAttributeName => self.state_after_attribute_name(),
                State::BeforeAttributeValue => self.state_before_attribute_value(),
                State::AttributeValueDoubleQuoted => self.state_attribute_value_quoted('"'),
                State::AttributeValueSingleQuoted => self.state_attribute_value_quoted('\''),
                State::AttributeValueUnquoted => self.state_attribute_value_unquoted(),
                State::SelfClosingStartTag => self.state_self_closing_start_tag(),
                State::MarkupDeclarationOpen => self.state_markup_declaration_open(),
                State::BogusComment => self.state_bogus_comment(),
                State::CommentStart => self.state_comment_start(),
                State::Comment => self.state_comment(),
                State::CommentEndDash => self.state_comment_end_dash(),
                State::CommentEnd => self.state_comment_end(),
                State::Doctype => self.state_doctype(),
                State::DoctypeName => self.state_doctype_name(),
                State::AfterDoctypeName => self.state_after_doctype_name(),
                State::CdataSection => self.state_cdata_section(),
                State::ScriptData | State::Rawtext => self.state_raw_content(false),
                State::Rcdata => self.state_raw_content(true),
            };
            if let Some(token) = produced {
                if !token.is_done() {
                    self.token_count += 1;
                }
                trace!(token = ?token.kind, offset = token.offset, "emit token");
                return token;
            }
        }
    }

    /// Collect every token up to and including `Done`.
    pub fn tokenize_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is_done();
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    // ==================== Character helpers ====================

    fn current_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn consume(&mut self) -> Option<char> {
        let c = self.current_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            if self.consume().is_none() {
                break;
            }
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.source[self.pos..].starts_with(s)
    }

    fn starts_with_ci(&self, s: &str) -> bool {
        let rest = self.source.as_bytes().get(self.pos..self.pos + s.len());
        matches!(rest, Some(bytes) if bytes.eq_ignore_ascii_case(s.as_bytes()))
    }

    fn fold_case(&self, c: char) -> char {
        if self.options.preserve_case {
            c
        } else {
            c.to_ascii_lowercase()
        }
    }

    fn decode_entities(&self) -> bool {
        self.options.text_processing_mode == TextProcessingMode::Decode
    }

    fn location(&self) -> Location {
        Location::new(self.pos, self.line, self.column)
    }

    fn error(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.errors.push(ParseError::new(code, message, self.location()));
    }

    // ==================== Token assembly ====================

    fn push_text(&mut self, c: char, offset: usize) {
        if self.text_buf.is_empty() {
            self.text_start = offset;
        }
        if self.text_buf.len() + c.len_utf8() > self.options.max_text_length {
            if !self.text_truncated {
                self.text_truncated = true;
                self.error(ErrorCode::MaxTextLength, "text run exceeds maximum length");
            }
            return;
        }
        self.text_buf.push(c);
    }

    fn flush_text(&mut self) -> Token {
        let text = std::mem::take(&mut self.text_buf);
        self.text_truncated = false;
        Token {
            kind: TokenKind::Text(text),
            offset: self.text_start,
        }
    }

    fn begin_tag(&mut self, is_end: bool) {
        self.tag_name.clear();
        self.attrs.clear();
        self.attr_name.clear();
        self.attr_value.clear();
        self.is_end_tag = is_end;
        self.attr_limit_hit = false;
    }

    fn begin_attr(&mut self) {
        self.attr_name.clear();
        self.attr_value.clear();
        self.attr_name_truncated = false;
        self.attr_value_truncated = false;
    }

    fn push_attr_name(&mut self, c: char) {
        if self.attr_name.len() + c.len_utf8() > self.options.max_attribute_name_length {
            if !self.attr_name_truncated {
                self.attr_name_truncated = true;
                self.error(
                    ErrorCode::MaxAttributeLength,
                    "attribute name exceeds maximum length",
                );
            }
            return;
        }
        let folded = self.fold_case(c);
        self.attr_name.push(folded);
    }

    fn push_attr_value(&mut self, c: char) {
        if self.attr_value.len() + c.len_utf8() > self.options.max_attribute_value_length {
            if !self.attr_value_truncated {
                self.attr_value_truncated = true;
                self.error(
                    ErrorCode::MaxAttributeLength,
                    "attribute value exceeds maximum length",
                );
            }
            return;
        }
        self.attr_value.push(c);
    }

    fn finalize_attr(&mut self, has_value: bool) {
        if self.attr_name.is_empty() {
            return;
        }
        if self.attrs.len() >= self.options.max_attributes {
            if !self.attr_limit_hit {
                self.attr_limit_hit = true;
                self.error(ErrorCode::TooManyElements, "too many attributes on element");
            }
            self.begin_attr();
            return;
        }
        let name = std::mem::take(&mut self.attr_name);
        let value = std::mem::take(&mut self.attr_value);
        self.attrs.push(Attribute {
            name,
            value,
            has_value,
        });
    }

    /// Discard a half-built tag at EOF. A tag token is only ever emitted
    /// once its `>` has been consumed.
    fn abandon_tag(&mut self) {
        self.error(ErrorCode::UnexpectedEof, "unexpected end of input in tag");
        self.begin_tag(false);
        self.state = State::Data;
    }

    fn emit_tag(&mut self, self_closing: bool) -> Option<Token> {
        let name = std::mem::take(&mut self.tag_name);
        let attrs = std::mem::take(&mut self.attrs);
        let offset = self.token_start;
        if self.is_end_tag {
            self.is_end_tag = false;
            self.state = State::Data;
            return Some(Token {
                kind: TokenKind::CloseTag { name },
                offset,
            });
        }

        let lower = name.to_ascii_lowercase();
        let is_void = self.options.is_void(&lower);
        if self_closing || is_void {
            self.state = State::Data;
            if lower == "br" && self.options.br_handling == BrHandling::InsertCustom {
                return Some(Token {
                    kind: TokenKind::Text(self.options.br_text.clone()),
                    offset,
                });
            }
            return Some(Token {
                kind: TokenKind::SelfClosingTag { name, attrs },
                offset,
            });
        }

        self.state = if lower == "script" {
            State::ScriptData
        } else if RAW_TEXT_ELEMENTS.contains(&lower.as_str()) {
            State::Rawtext
        } else if RCDATA_ELEMENTS.contains(&lower.as_str()) {
            State::Rcdata
        } else {
            State::Data
        };
        if self.state != State::Data {
            self.raw_end_tag = lower;
        }
        Some(Token {
            kind: TokenKind::OpenTag { name, attrs },
            offset,
        })
    }

    fn emit_comment(&mut self) -> Token {
        let text = std::mem::take(&mut self.comment_buf);
        self.state = State::Data;
        Token {
            kind: TokenKind::Comment(text),
            offset: self.token_start,
        }
    }

    fn emit_doctype(&mut self) -> Token {
        let name = std::mem::take(&mut self.doctype_name);
        self.state = State::Data;
        Token {
            kind: TokenKind::Doctype(name),
            offset: self.token_start,
        }
    }

    // ==================== States ====================

    fn state_data(&mut self) -> Option<Token> {
        match self.current_char() {
            None => {
                if !self.text_buf.is_empty() {
                    return Some(self.flush_text());
                }
                self.done = true;
                Some(Token {
                    kind: TokenKind::Done,
                    offset: self.source.len(),
                })
            }
            Some('<') => {
                if !self.text_buf.is_empty() {
                    // Emit the pending run first; the `<` is re-examined on
                    // the next call.
                    return Some(self.flush_text());
                }
                self.token_start = self.pos;
                self.consume();
                self.state = State::TagOpen;
                None
            }
            Some('\0') => {
                self.error(ErrorCode::InvalidToken, "null character in text");
                self.consume();
                None
            }
            Some('&') if self.decode_entities() && self.starts_with("&nbsp;") => {
                let start = self.pos;
                self.advance_n(6);
                self.push_text(' ', start);
                None
            }
            Some(c) => {
                let start = self.pos;
                self.consume();
                self.push_text(c, start);
                None
            }
        }
    }

    fn state_tag_open(&mut self) -> Option<Token> {
        match self.current_char() {
            Some('/') => {
                self.consume();
                self.state = State::EndTagOpen;
            }
            Some('!') => {
                self.consume();
                self.state = State::MarkupDeclarationOpen;
            }
            Some('?') => {
                // Processing instructions are consumed silently to `>`.
                self.consume();
                self.comment_buf.clear();
                self.bogus_emit = false;
                self.state = State::BogusComment;
            }
            Some(c) if c.is_ascii_alphabetic() => {
                self.begin_tag(false);
                self.state = State::TagName;
            }
            _ => {
                // Not a tag after all; the `<` is plain text.
                self.push_text('<', self.token_start);
                self.state = State::Data;
            }
        }
        None
    }

    fn state_tag_name(&mut self) -> Option<Token> {
        match self.consume() {
            Some(c) if c.is_ascii_whitespace() => {
                self.state = State::BeforeAttributeName;
                None
            }
            Some('/') => {
                self.state = State::SelfClosingStartTag;
                None
            }
            Some('>') => self.emit_tag(false),
            Some(c) => {
                let folded = self.fold_case(c);
                self.tag_name.push(folded);
                None
            }
            None => {
                self.abandon_tag();
                None
            }
        }
    }

    fn state_end_tag_open(&mut self) -> Option<Token> {
        match self.current_char() {
            Some(c) if c.is_ascii_alphabetic() => {
                self.begin_tag(true);
                self.state = State::EndTagName;
            }
            Some('>') => {
                self.consume();
                self.error(ErrorCode::InvalidToken, "missing end tag name");
                self.state = State::Data;
            }
            None => {
                self.push_text('<', self.token_start);
                self.push_text('/', self.token_start);
                self.state = State::Data;
            }
            Some(_) => {
                self.error(ErrorCode::InvalidToken, "invalid character in end tag");
                self.comment_buf.clear();
                self.bogus_emit = false;
                self.state = State::BogusComment;
            }
        }
        None
    }

    fn state_end_tag_name(&mut self) -> Option<Token> {
        match self.consume() {
            Some(c) if c.is_ascii_whitespace() => {
                // Anything after the name is scanned like attributes and
                // discarded when the close tag is emitted.
                self.state = State::BeforeAttributeName;
                None
            }
            Some('>') => self.emit_tag(false),
            Some(c) => {
                let folded = self.fold_case(c);
                self.tag_name.push(folded);
                None
            }
            None => {
                self.abandon_tag();
                None
            }
        }
    }

    fn state_before_attribute_name(&mut self) -> Option<Token> {
        match self.current_char() {
            Some(c) if c.is_ascii_whitespace() => {
                self.consume();
                None
            }
            Some('/') => {
                self.consume();
                self.state = State::SelfClosingStartTag;
                None
            }
            Some('>') => {
                self.consume();
                self.emit_tag(false)
            }
            Some('=') => {
                self.consume();
                self.error(
                    ErrorCode::InvalidToken,
                    "unexpected '=' before attribute name",
                );
                self.begin_attr();
                self.attr_name.push('=');
                self.state = State::AttributeName;
                None
            }
            Some(c) => {
                self.consume();
                self.begin_attr();
                self.push_attr_name(c);
                self.state = State::AttributeName;
                None
            }
            None => {
                self.abandon_tag();
                None
            }
        }
    }

    fn state_attribute_name(&mut self) -> Option<Token> {
        match self.current_char() {
            Some(c) if c.is_ascii_whitespace() => {
                self.consume();
                self.state = State::AfterAttributeName;
                None
            }
            Some('=') => {
                self.consume();
                self.state = State::BeforeAttributeValue;
                None
            }
            Some('/') => {
                self.consume();
                self.finalize_attr(false);
                self.state = State::SelfClosingStartTag;
                None
            }
            Some('>') => {
                self.consume();
                self.finalize_attr(false);
                self.emit_tag(false)
            }
            Some(c) => {
                self.consume();
                self.push_attr_name(c);
                None
            }
            None => {
                self.abandon_tag();
                None
            }
        }
    }

    fn state_after_attribute_name(&mut self) -> Option<Token> {
        match self.current_char() {
            Some(c) if c.is_ascii_whitespace() => {
                self.consume();
                None
            }
            Some('=') => {
                self.consume();
                self.state = State::BeforeAttributeValue;
                None
            }
            Some('/') => {
                self.consume();
                self.finalize_attr(false);
                self.state = State::SelfClosingStartTag;
                None
            }
            Some('>') => {
                self.consume();
                self.finalize_attr(false);
                self.emit_tag(false)
            }
            Some(c) => {
                // Previous attribute was a boolean one.
                self.finalize_attr(false);
                self.consume();
                self.begin_attr();
                self.push_attr_name(c);
                self.state = State::AttributeName;
                None
            }
            None => {
                self.abandon_tag();
                None
            }
        }
    }

    fn state_before_attribute_value(&mut self) -> Option<Token> {
        match self.current_char() {
            Some(c) if c.is_ascii_whitespace() => {
                self.consume();
                None
            }
            Some('"') => {
                self.consume();
                self.state = State::AttributeValueDoubleQuoted;
                None
            }
            Some('\'') => {
                self.consume();
                self.state = State::AttributeValueSingleQuoted;
                None
            }
            Some('>') => {
                self.consume();
                self.error(ErrorCode::InvalidToken, "missing attribute value");
                self.finalize_attr(true);
                self.emit_tag(false)
            }
            Some(_) => {
                self.state = State::AttributeValueUnquoted;
                None
            }
            None => {
                self.abandon_tag();
                None
            }
        }
    }

    fn state_attribute_value_quoted(&mut self, quote: char) -> Option<Token> {
        match self.consume() {
            Some(c) if c == quote => {
                self.finalize_attr(true);
                self.state = State::BeforeAttributeName;
                None
            }
            Some(c) => {
                self.push_attr_value(c);
                None
            }
            None => {
                self.abandon_tag();
                None
            }
        }
    }

    fn state_attribute_value_unquoted(&mut self) -> Option<Token> {
        match self.current_char() {
            Some(c) if c.is_ascii_whitespace() => {
                self.consume();
                self.finalize_attr(true);
                self.state = State::BeforeAttributeName;
                None
            }
            Some('>') => {
                self.consume();
                self.finalize_attr(true);
                self.emit_tag(false)
            }
            Some('<') => {
                self.error(
                    ErrorCode::InvalidToken,
                    "unexpected '<' in unquoted attribute value",
                );
                self.consume();
                self.push_attr_value('<');
                None
            }
            Some(c) => {
                self.consume();
                self.push_attr_value(c);
                None
            }
            None => {
                self.abandon_tag();
                None
            }
        }
    }

    fn state_self_closing_start_tag(&mut self) -> Option<Token> {
        match self.current_char() {
            Some('>') => {
                self.consume();
                self.emit_tag(true)
            }
            Some(_) => {
                self.error(ErrorCode::InvalidToken, "unexpected character after '/'");
                self.state = State::BeforeAttributeName;
                None
            }
            None => {
                self.abandon_tag();
                None
            }
        }
    }

    fn state_markup_declaration_open(&mut self) -> Option<Token> {
        if self.starts_with("--") {
            self.advance_n(2);
            self.comment_buf.clear();
            self.state = State::CommentStart;
        } else if self.starts_with_ci("DOCTYPE") {
            self.advance_n(7);
            self.doctype_name.clear();
            self.state = State::Doctype;
        } else if self.starts_with("[CDATA[") {
            self.advance_n(7);
            self.comment_buf.clear();
            self.state = State::CdataSection;
        } else {
            self.error(ErrorCode::InvalidToken, "incorrectly opened comment");
            self.comment_buf.clear();
            self.bogus_emit = true;
            self.state = State::BogusComment;
        }
        None
    }

    fn state_bogus_comment(&mut self) -> Option<Token> {
        match self.consume() {
            Some('>') => {
                if self.bogus_emit {
                    return Some(self.emit_comment());
                }
                self.state = State::Data;
                None
            }
            Some(c) => {
                if self.bogus_emit {
                    self.comment_buf.push(c);
                }
                None
            }
            None => {
                if self.bogus_emit {
                    return Some(self.emit_comment());
                }
                self.state = State::Data;
                None
            }
        }
    }

    fn state_comment_start(&mut self) -> Option<Token> {
        match self.current_char() {
            Some('-') => {
                self.consume();
                self.state = State::CommentEndDash;
                None
            }
            Some('>') => {
                self.consume();
                Some(self.emit_comment())
            }
            Some(_) => {
                self.state = State::Comment;
                None
            }
            None => {
                self.error(ErrorCode::UnexpectedEof, "unexpected end of input in comment");
                Some(self.emit_comment())
            }
        }
    }

    fn state_comment(&mut self) -> Option<Token> {
        match self.consume() {
            Some('-') => {
                self.state = State::CommentEndDash;
                None
            }
            Some(c) => {
                self.comment_buf.push(c);
                None
            }
            None => {
                self.error(ErrorCode::UnexpectedEof, "unexpected end of input in comment");
                Some(self.emit_comment())
            }
        }
    }

    fn state_comment_end_dash(&mut self) -> Option<Token> {
        match self.consume() {
            Some('-') => {
                self.state = State::CommentEnd;
                None
            }
            Some(c) => {
                self.comment_buf.push('-');
                self.comment_buf.push(c);
                self.state = State::Comment;
                None
            }
            None => {
                self.error(ErrorCode::UnexpectedEof, "unexpected end of input in comment");
                Some(self.emit_comment())
            }
        }
    }

    fn state_comment_end(&mut self) -> Option<Token> {
        match self.consume() {
            Some('>') => Some(self.emit_comment()),
            Some('-') => {
                // `--->`: extra dashes belong to the comment body.
                self.comment_buf.push('-');
                None
            }
            Some(c) => {
                self.comment_buf.push_str("--");
                self.comment_buf.push(c);
                self.state = State::Comment;
                None
            }
            None => {
                self.error(ErrorCode::UnexpectedEof, "unexpected end of input in comment");
                Some(self.emit_comment())
            }
        }
    }

    fn state_doctype(&mut self) -> Option<Token> {
        match self.current_char() {
            Some(c) if c.is_ascii_whitespace() => {
                self.consume();
                None
            }
            Some('>') => {
                self.consume();
                Some(self.emit_doctype())
            }
            Some(_) => {
                self.state = State::DoctypeName;
                None
            }
            None => {
                self.error(ErrorCode::UnexpectedEof, "unexpected end of input in doctype");
                Some(self.emit_doctype())
            }
        }
    }

    fn state_doctype_name(&mut self) -> Option<Token> {
        match self.consume() {
            Some(c) if c.is_ascii_whitespace() => {
                self.state = State::AfterDoctypeName;
                None
            }
            Some('>') => Some(self.emit_doctype()),
            Some(c) => {
                self.doctype_name.push(c.to_ascii_lowercase());
                None
            }
            None => {
                self.error(ErrorCode::UnexpectedEof, "unexpected end of input in doctype");
                Some(self.emit_doctype())
            }
        }
    }

    fn state_after_doctype_name(&mut self) -> Option<Token> {
        // Public/system identifiers are consumed and dropped.
        match self.consume() {
            Some('>') => Some(self.emit_doctype()),
            Some(_) => None,
            None => {
                self.error(ErrorCode::UnexpectedEof, "unexpected end of input in doctype");
                Some(self.emit_doctype())
            }
        }
    }

    fn state_cdata_section(&mut self) -> Option<Token> {
        if self.starts_with("]]>") {
            self.advance_n(3);
            let text = std::mem::take(&mut self.comment_buf);
            self.state = State::Data;
            return Some(Token {
                kind: TokenKind::Text(text),
                offset: self.token_start,
            });
        }
        match self.consume() {
            Some(c) => {
                self.comment_buf.push(c);
                None
            }
            None => {
                self.error(ErrorCode::UnexpectedEof, "unexpected end of input in CDATA");
                let text = std::mem::take(&mut self.comment_buf);
                self.state = State::Data;
                Some(Token {
                    kind: TokenKind::Text(text),
                    offset: self.token_start,
                })
            }
        }
    }

    fn state_raw_content(&mut self, decode: bool) -> Option<Token> {
        match self.current_char() {
            None => {
                if !self.text_buf.is_empty() {
                    return Some(self.flush_text());
                }
                self.state = State::Data;
                None
            }
            Some('<') if self.at_raw_end_tag() => {
                if !self.text_buf.is_empty() {
                    return Some(self.flush_text());
                }
                let offset = self.pos;
                self.advance_n(2 + self.raw_end_tag.len());
                // The terminator may be whitespace or `/`; scan to `>`.
                loop {
                    match self.consume() {
                        Some('>') | None => break,
                        Some(_) => {}
                    }
                }
                let name = self.raw_end_tag.clone();
                self.state = State::Data;
                Some(Token {
                    kind: TokenKind::CloseTag { name },
                    offset,
                })
            }
            Some('&') if decode && self.decode_entities() && self.starts_with("&nbsp;") => {
                let start = self.pos;
                self.advance_n(6);
                self.push_text(' ', start);
                None
            }
            Some(c) => {
                let start = self.pos;
                self.consume();
                self.push_text(c, start);
                None
            }
        }
    }

    /// Whether the input at the current `<` is `</name`, case-insensitive,
    /// followed by whitespace, `/`, or `>`, for the element that entered
    /// the raw-text context. Anything else (`</scriptx>`) is content.
    fn at_raw_end_tag(&self) -> bool {
        let bytes = self.source.as_bytes();
        let tag = self.raw_end_tag.as_bytes();
        if tag.is_empty() || !self.starts_with("</") {
            return false;
        }
        let name_start = self.pos + 2;
        let name_end = name_start + tag.len();
        if name_end > bytes.len() {
            return false;
        }
        if !bytes[name_start..name_end].eq_ignore_ascii_case(tag) {
            return false;
        }
        matches!(
            bytes.get(name_end),
            Some(b' ' | b'\t' | b'\n' | b'\r' | b'\x0c' | b'/' | b'>')
        )
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    /// Yields every token once, ending after `Done`.
    fn next(&mut self) -> Option<Token> {
        if self.iterator_finished {
            return None;
        }
        let token = self.next_token();
        if token.is_done() {
            self.iterator_finished = true;
        }
        Some(token)
    }
}

//! CSS selector lexer.
//!
//! Splits selector text into the token stream consumed by the compiler.
//! Whitespace is a significant token: between two compound selectors it is
//! the descendant combinator. `/* ... */` comments are stripped in a
//! preprocessing pass before tokenization.

use htmlkit_common::{ErrorCode, Location, ParseError};

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssTokenKind {
    Identifier(String),
    /// `#name`
    Hash(String),
    Dot,
    Star,
    LBracket,
    RBracket,
    /// `=`
    Equals,
    /// `*=`
    Contains,
    /// `^=`
    StartsWith,
    /// `$=`
    EndsWith,
    /// `~=`
    WordMatch,
    /// `|=`
    LangMatch,
    String(String),
    Number(String),
    Greater,
    Plus,
    Minus,
    Tilde,
    Comma,
    Whitespace,
    Colon,
    DoubleColon,
    LParen,
    RParen,
    Eof,
}

/// A lexed token plus its position in the (preprocessed) input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssToken {
    pub kind: CssTokenKind,
    pub position: usize,
}

/// Selector tokenizer with one-token lookahead.
pub struct CssLexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    peeked: Option<CssToken>,
    errors: Vec<ParseError>,
}

impl CssLexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: strip_comments(input).chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            peeked: None,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    pub fn location(&self) -> Location {
        Location::new(self.position, self.line, self.column)
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> CssToken {
        if let Some(token) = self.peeked.take() {
            return token;
        }
        self.read_token()
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self) -> &CssToken {
        if self.peeked.is_none() {
            let token = self.read_token();
            self.peeked = Some(token);
        }
        self.peeked.as_ref().unwrap_or_else(|| unreachable!("peeked token just stored"))
    }

    /// Consume raw input up to and including the `)` matching an already
    /// consumed `(`. Returns the argument text between them. Nested
    /// parentheses and quoted strings are respected.
    ///
    /// Must only be called with no pending lookahead past the `(`.
    pub fn consume_balanced(&mut self) -> String {
        debug_assert!(self.peeked.is_none());
        let mut depth = 1usize;
        let mut out = String::new();
        while let Some(c) = self.current() {
            match c {
                '(' => {
                    depth += 1;
                    out.push(c);
                    self.advance();
                }
                ')' => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return out;
                    }
                    out.push(c);
                }
                '"' | '\'' => {
                    out.push(c);
                    self.advance();
                    while let Some(inner) = self.current() {
                        out.push(inner);
                        self.advance();
                        if inner == '\\' {
                            if let Some(escaped) = self.current() {
                                out.push(escaped);
                                self.advance();
                            }
                        } else if inner == c {
                            break;
                        }
                    }
                }
                _ => {
                    out.push(c);
                    self.advance();
                }
            }
        }
        self.error(ErrorCode::InvalidSelector, "unbalanced parentheses");
        out
    }

    // ==================== Internals ====================

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn error(&mut self, code: ErrorCode, message: impl Into<String>) {
        let location = self.location();
        self.errors.push(ParseError::new(code, message, location));
    }

    fn read_token(&mut self) -> CssToken {
        loop {
            let position = self.position;
            let c = match self.current() {
                None => {
                    return CssToken {
                        kind: CssTokenKind::Eof,
                        position,
                    }
                }
                Some(c) => c,
            };

            if c.is_whitespace() {
                while matches!(self.current(), Some(w) if w.is_whitespace()) {
                    self.advance();
                }
                return CssToken {
                    kind: CssTokenKind::Whitespace,
                    position,
                };
            }

            let kind = match c {
                '.' => {
                    self.advance();
                    CssTokenKind::Dot
                }
                '#' => {
                    self.advance();
                    let name = self.read_identifier();
                    if name.is_empty() {
                        self.error(ErrorCode::InvalidSelector, "expected identifier after '#'");
                    }
                    CssTokenKind::Hash(name)
                }
                '*' => {
                    self.advance();
                    if self.current() == Some('=') {
                        self.advance();
                        CssTokenKind::Contains
                    } else {
                        CssTokenKind::Star
                    }
                }
                '[' => {
                    self.advance();
                    CssTokenKind::LBracket
                }
                ']' => {
                    self.advance();
                    CssTokenKind::RBracket
                }
                '(' => {
                    self.advance();
                    CssTokenKind::LParen
                }
                ')' => {
                    self.advance();
                    CssTokenKind::RParen
                }
                ',' => {
                    self.advance();
                    CssTokenKind::Comma
                }
                '=' => {
                    self.advance();
                    CssTokenKind::Equals
                }
                '^' => {
                    self.advance();
                    if self.current() == Some('=') {
                        self.advance();
                        CssTokenKind::StartsWith
                    } else {
                        self.error(ErrorCode::InvalidSelector, "expected '=' after '^'");
                        continue;
                    }
                }
                '$' => {
                    self.advance();
                    if self.current() == Some('=') {
                        self.advance();
                        CssTokenKind::EndsWith
                    } else {
                        self.error(ErrorCode::InvalidSelector, "expected '=' after '$'");
                        continue;
                    }
                }
                '|' => {
                    self.advance();
                    if self.current() == Some('=') {
                        self.advance();
                        CssTokenKind::LangMatch
                    } else {
                        self.error(ErrorCode::InvalidSelector, "expected '=' after '|'");
                        continue;
                    }
                }
                '~' => {
                    self.advance();
                    if self.current() == Some('=') {
                        self.advance();
                        CssTokenKind::WordMatch
                    } else {
                        CssTokenKind::Tilde
                    }
                }
                '>' => {
                    self.advance();
                    CssTokenKind::Greater
                }
                '+' => {
                    self.advance();
                    CssTokenKind::Plus
                }
                ':' => {
                    self.advance();
                    if self.current() == Some(':') {
                        self.advance();
                        CssTokenKind::DoubleColon
                    } else {
                        CssTokenKind::Colon
                    }
                }
                '"' | '\'' => {
                    self.advance();
                    CssTokenKind::String(self.read_string(c))
                }
                '-' => {
                    // A dash may begin an identifier (`-vendor`) or stand
                    // alone inside nth expressions.
                    if matches!(self.peek_char(1), Some(n) if is_identifier_char(n)) {
                        CssTokenKind::Identifier(self.read_identifier())
                    } else {
                        self.advance();
                        CssTokenKind::Minus
                    }
                }
                c if c.is_ascii_digit() => CssTokenKind::Number(self.read_number()),
                c if is_identifier_start(c) => CssTokenKind::Identifier(self.read_identifier()),
                other => {
                    self.advance();
                    self.error(
                        ErrorCode::InvalidSelector,
                        format!("unexpected character '{other}'"),
                    );
                    continue;
                }
            };
            return CssToken { kind, position };
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.current() {
            if is_identifier_char(c) {
                out.push(c);
                self.advance();
            } else {
                break;
            }
        }
        out
    }

    fn read_string(&mut self, quote: char) -> String {
        let mut out = String::new();
        loop {
            match self.current() {
                None => {
                    self.error(ErrorCode::InvalidSelector, "unterminated string");
                    return out;
                }
                Some(c) if c == quote => {
                    self.advance();
                    return out;
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        // Any other escaped character passes through.
                        Some(c) => out.push(c),
                        None => {
                            self.error(ErrorCode::InvalidSelector, "unterminated string");
                            return out;
                        }
                    }
                    self.advance();
                }
                Some(c) => {
                    out.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_number(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.current() {
            if c.is_ascii_digit() || (c == '.' && !out.contains('.')) {
                out.push(c);
                self.advance();
            } else {
                break;
            }
        }
        out
    }
}

/// Identifier characters: ASCII alphanumerics, `_`, `-`, and any non-ASCII
/// code point.
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

/// Replace `/* ... */` comments with a single space.
fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = '\0';
            for cc in chars.by_ref() {
                if prev == '*' && cc == '/' {
                    break;
                }
                prev = cc;
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<CssTokenKind> {
        let mut lexer = CssLexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            let eof = token.kind == CssTokenKind::Eof;
            out.push(token.kind);
            if eof {
                break;
            }
        }
        out
    }

    #[test]
    fn simple_selector_tokens() {
        assert_eq!(
            kinds("div.note#main"),
            vec![
                CssTokenKind::Identifier("div".into()),
                CssTokenKind::Dot,
                CssTokenKind::Identifier("note".into()),
                CssTokenKind::Hash("main".into()),
                CssTokenKind::Eof,
            ]
        );
    }

    #[test]
    fn whitespace_is_significant() {
        assert_eq!(
            kinds("div p"),
            vec![
                CssTokenKind::Identifier("div".into()),
                CssTokenKind::Whitespace,
                CssTokenKind::Identifier("p".into()),
                CssTokenKind::Eof,
            ]
        );
    }

    #[test]
    fn attribute_operators() {
        assert_eq!(
            kinds("[a=1][b*=x][c^=y][d$=z][e~=w][f|=v]"),
            vec![
                CssTokenKind::LBracket,
                CssTokenKind::Identifier("a".into()),
                CssTokenKind::Equals,
                CssTokenKind::Number("1".into()),
                CssTokenKind::RBracket,
                CssTokenKind::LBracket,
                CssTokenKind::Identifier("b".into()),
                CssTokenKind::Contains,
                CssTokenKind::Identifier("x".into()),
                CssTokenKind::RBracket,
                CssTokenKind::LBracket,
                CssTokenKind::Identifier("c".into()),
                CssTokenKind::StartsWith,
                CssTokenKind::Identifier("y".into()),
                CssTokenKind::RBracket,
                CssTokenKind::LBracket,
                CssTokenKind::Identifier("d".into()),
                CssTokenKind::EndsWith,
                CssTokenKind::Identifier("z".into()),
                CssTokenKind::RBracket,
                CssTokenKind::LBracket,
                CssTokenKind::Identifier("e".into()),
                CssTokenKind::WordMatch,
                CssTokenKind::Identifier("w".into()),
                CssTokenKind::RBracket,
                CssTokenKind::LBracket,
                CssTokenKind::Identifier("f".into()),
                CssTokenKind::LangMatch,
                CssTokenKind::Identifier("v".into()),
                CssTokenKind::RBracket,
                CssTokenKind::Eof,
            ]
        );
    }

    #[test]
    fn combinators_and_commas() {
        assert_eq!(
            kinds("a>b+c~d,e"),
            vec![
                CssTokenKind::Identifier("a".into()),
                CssTokenKind::Greater,
                CssTokenKind::Identifier("b".into()),
                CssTokenKind::Plus,
                CssTokenKind::Identifier("c".into()),
                CssTokenKind::Tilde,
                CssTokenKind::Identifier("d".into()),
                CssTokenKind::Comma,
                CssTokenKind::Identifier("e".into()),
                CssTokenKind::Eof,
            ]
        );
    }

    #[test]
    fn pseudo_tokens() {
        assert_eq!(
            kinds(":hover::before"),
            vec![
                CssTokenKind::Colon,
                CssTokenKind::Identifier("hover".into()),
                CssTokenKind::DoubleColon,
                CssTokenKind::Identifier("before".into()),
                CssTokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#"["a\"b\n\\c"]"#),
            vec![
                CssTokenKind::LBracket,
                CssTokenKind::String("a\"b\n\\c".into()),
                CssTokenKind::RBracket,
                CssTokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_records_error() {
        let mut lexer = CssLexer::new("'abc");
        let token = lexer.next_token();
        assert_eq!(token.kind, CssTokenKind::String("abc".into()));
        assert_eq!(lexer.errors()[0].code, ErrorCode::InvalidSelector);
    }

    #[test]
    fn comments_are_stripped() {
        assert_eq!(
            kinds("div/* note */.x"),
            vec![
                CssTokenKind::Identifier("div".into()),
                CssTokenKind::Whitespace,
                CssTokenKind::Dot,
                CssTokenKind::Identifier("x".into()),
                CssTokenKind::Eof,
            ]
        );
    }

    #[test]
    fn utf8_identifiers() {
        assert_eq!(
            kinds(".日本語"),
            vec![
                CssTokenKind::Dot,
                CssTokenKind::Identifier("日本語".into()),
                CssTokenKind::Eof,
            ]
        );
    }

    #[test]
    fn dash_identifier_vs_minus() {
        assert_eq!(
            kinds("-vendor"),
            vec![
                CssTokenKind::Identifier("-vendor".into()),
                CssTokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("- 1"),
            vec![
                CssTokenKind::Minus,
                CssTokenKind::Whitespace,
                CssTokenKind::Number("1".into()),
                CssTokenKind::Eof,
            ]
        );
    }

    #[test]
    fn balanced_argument_capture() {
        let mut lexer = CssLexer::new(":is(a, b(c), ')')rest");
        // Consume `:`, `is`, `(` first.
        assert_eq!(lexer.next_token().kind, CssTokenKind::Colon);
        assert!(matches!(lexer.next_token().kind, CssTokenKind::Identifier(_)));
        assert_eq!(lexer.next_token().kind, CssTokenKind::LParen);
        assert_eq!(lexer.consume_balanced(), "a, b(c), ')'");
        assert!(matches!(lexer.next_token().kind, CssTokenKind::Identifier(ref s) if s == "rest"));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lexer = CssLexer::new("a b");
        assert!(matches!(lexer.peek_token().kind, CssTokenKind::Identifier(_)));
        assert!(matches!(lexer.next_token().kind, CssTokenKind::Identifier(_)));
        assert_eq!(lexer.peek_token().kind, CssTokenKind::Whitespace);
    }
}

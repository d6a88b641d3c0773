//! Recursive-descent selector compiler.
//!
//! Consumes the lexer's token stream and builds the [`Selector`] AST.
//! Errors accumulate with source positions; recovery skips to the next
//! comma so the rest of a selector list still compiles.

use htmlkit_common::{ErrorCode, ParseError};

use crate::lexer::{CssLexer, CssToken, CssTokenKind};
use crate::nth::NthExpr;
use crate::selector::{
    AttrOperator, Combinator, PseudoClass, PseudoElement, RelativeSelector, RelativeSelectorList,
    Selector, SelectorList,
};

/// Selector parser over one input string.
pub struct CssParser {
    lexer: CssLexer,
    errors: Vec<ParseError>,
}

impl CssParser {
    pub fn new(selector: &str) -> Self {
        Self {
            lexer: CssLexer::new(selector),
            errors: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || !self.lexer.errors().is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<ParseError> {
        let mut all = self.lexer.take_errors();
        all.append(&mut self.errors);
        all
    }

    /// Parse a comma-separated selector list.
    pub fn parse_selector_list(&mut self) -> SelectorList {
        let mut selectors = Vec::new();
        self.skip_whitespace();
        if self.peek_kind() == CssTokenKind::Eof {
            self.error("empty selector");
            return SelectorList::default();
        }
        loop {
            match self.parse_selector() {
                Some(selector) => selectors.push(selector),
                None => self.recover_to_comma(),
            }
            self.skip_whitespace();
            match self.peek_kind() {
                CssTokenKind::Comma => {
                    self.lexer.next_token();
                    self.skip_whitespace();
                    if self.peek_kind() == CssTokenKind::Eof {
                        self.error("trailing comma in selector list");
                        break;
                    }
                }
                CssTokenKind::Eof => break,
                _ => {
                    let token = self.lexer.next_token();
                    self.error(format!("unexpected token {:?}", token.kind));
                    self.recover_to_comma();
                    if self.peek_kind() == CssTokenKind::Eof {
                        break;
                    }
                    self.lexer.next_token(); // consume the comma
                    self.skip_whitespace();
                }
            }
        }
        SelectorList { selectors }
    }

    /// Parse one selector: compounds joined by combinators.
    fn parse_selector(&mut self) -> Option<Selector> {
        let mut left = self.parse_compound()?;
        loop {
            let mut saw_whitespace = false;
            while self.peek_kind() == CssTokenKind::Whitespace {
                self.lexer.next_token();
                saw_whitespace = true;
            }
            let kind = match self.peek_kind() {
                CssTokenKind::Greater => {
                    self.lexer.next_token();
                    Combinator::Child
                }
                CssTokenKind::Plus => {
                    self.lexer.next_token();
                    Combinator::AdjacentSibling
                }
                CssTokenKind::Tilde => {
                    self.lexer.next_token();
                    Combinator::GeneralSibling
                }
                CssTokenKind::Comma | CssTokenKind::Eof => break,
                _ if saw_whitespace => Combinator::Descendant,
                _ => break,
            };
            self.skip_whitespace();
            let right = self.parse_compound()?;
            left = Selector::Combinator {
                kind,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Some(left)
    }

    /// Parse a compound: one or more simple selectors with no whitespace
    /// between them. A lone simple selector stays unwrapped.
    fn parse_compound(&mut self) -> Option<Selector> {
        let mut parts = Vec::new();
        loop {
            match self.peek_kind() {
                CssTokenKind::Identifier(_)
                | CssTokenKind::Star
                | CssTokenKind::Dot
                | CssTokenKind::Hash(_)
                | CssTokenKind::LBracket
                | CssTokenKind::Colon
                | CssTokenKind::DoubleColon => {
                    parts.push(self.parse_simple()?);
                }
                _ => break,
            }
        }
        match parts.len() {
            0 => {
                self.error("empty compound selector");
                None
            }
            1 => parts.pop(),
            _ => Some(Selector::Compound(parts)),
        }
    }

    fn parse_simple(&mut self) -> Option<Selector> {
        let token = self.lexer.next_token();
        match token.kind {
            CssTokenKind::Star => Some(Selector::Universal),
            CssTokenKind::Identifier(name) => Some(Selector::Type(name)),
            CssTokenKind::Hash(name) => {
                if name.is_empty() {
                    return None;
                }
                Some(Selector::Id(name))
            }
            CssTokenKind::Dot => match self.lexer.next_token().kind {
                CssTokenKind::Identifier(name) => Some(Selector::Class(name)),
                other => {
                    self.error(format!("expected class name after '.', found {other:?}"));
                    None
                }
            },
            CssTokenKind::LBracket => self.parse_attribute(),
            CssTokenKind::Colon => self.parse_pseudo_class(),
            CssTokenKind::DoubleColon => self.parse_pseudo_element(),
            other => {
                self.error(format!("unexpected token {other:?}"));
                None
            }
        }
    }

    /// Parse the inside of `[...]`; the opening bracket is consumed.
    fn parse_attribute(&mut self) -> Option<Selector> {
        self.skip_whitespace();
        let name = match self.lexer.next_token().kind {
            CssTokenKind::Identifier(name) => name,
            other => {
                self.error(format!("expected attribute name, found {other:?}"));
                self.recover_past(CssTokenKind::RBracket);
                return None;
            }
        };
        self.skip_whitespace();

        let op = match self.peek_kind() {
            CssTokenKind::RBracket => {
                self.lexer.next_token();
                return Some(Selector::Attribute {
                    name,
                    op: AttrOperator::Exists,
                    value: String::new(),
                });
            }
            CssTokenKind::Equals => AttrOperator::Equals,
            CssTokenKind::Contains => AttrOperator::Contains,
            CssTokenKind::StartsWith => AttrOperator::StartsWith,
            CssTokenKind::EndsWith => AttrOperator::EndsWith,
            CssTokenKind::WordMatch => AttrOperator::WordMatch,
            CssTokenKind::LangMatch => AttrOperator::LangMatch,
            other => {
                self.error(format!("malformed attribute selector near {other:?}"));
                self.recover_past(CssTokenKind::RBracket);
                return None;
            }
        };
        self.lexer.next_token();
        self.skip_whitespace();

        let value = match self.lexer.next_token().kind {
            CssTokenKind::String(value) => value,
            CssTokenKind::Identifier(value) => value,
            CssTokenKind::Number(value) => value,
            other => {
                self.error(format!("expected attribute value, found {other:?}"));
                self.recover_past(CssTokenKind::RBracket);
                return None;
            }
        };
        self.skip_whitespace();
        match self.lexer.next_token().kind {
            CssTokenKind::RBracket => Some(Selector::Attribute { name, op, value }),
            other => {
                self.error(format!("expected ']', found {other:?}"));
                None
            }
        }
    }

    /// Parse a pseudo-class; the `:` is consumed.
    fn parse_pseudo_class(&mut self) -> Option<Selector> {
        let name = match self.lexer.next_token().kind {
            CssTokenKind::Identifier(name) => name,
            other => {
                self.error(format!("expected pseudo-class name, found {other:?}"));
                return None;
            }
        };

        let argument = if self.peek_kind() == CssTokenKind::LParen {
            self.lexer.next_token();
            Some(self.lexer.consume_balanced())
        } else {
            None
        };

        let kind = match (name.as_str(), argument) {
            ("first-child", None) => PseudoClass::FirstChild,
            ("last-child", None) => PseudoClass::LastChild,
            ("only-child", None) => PseudoClass::OnlyChild,
            ("empty", None) => PseudoClass::Empty,
            ("root", None) => PseudoClass::Root,
            ("first-of-type", None) => PseudoClass::FirstOfType,
            ("last-of-type", None) => PseudoClass::LastOfType,
            ("only-of-type", None) => PseudoClass::OnlyOfType,
            ("disabled", None) => PseudoClass::Disabled,
            ("enabled", None) => PseudoClass::Enabled,
            ("checked", None) => PseudoClass::Checked,
            ("link", None) => PseudoClass::Link,
            ("hover", None) => PseudoClass::Hover,
            ("active", None) => PseudoClass::Active,
            ("focus", None) => PseudoClass::Focus,
            ("visited", None) => PseudoClass::Visited,
            ("nth-child", Some(arg)) => PseudoClass::NthChild(self.parse_nth(&arg)?),
            ("nth-last-child", Some(arg)) => PseudoClass::NthLastChild(self.parse_nth(&arg)?),
            ("nth-of-type", Some(arg)) => PseudoClass::NthOfType(self.parse_nth(&arg)?),
            ("nth-last-of-type", Some(arg)) => {
                PseudoClass::NthLastOfType(self.parse_nth(&arg)?)
            }
            ("not", Some(arg)) => PseudoClass::Not(self.parse_nested_list(&arg)?),
            ("is", Some(arg)) => PseudoClass::Is(self.parse_nested_list(&arg)?),
            ("where", Some(arg)) => PseudoClass::Where(self.parse_nested_list(&arg)?),
            ("has", Some(arg)) => PseudoClass::Has(self.parse_relative_list(&arg)?),
            (
                "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" | "not"
                | "is" | "where" | "has",
                None,
            ) => {
                self.error(format!(":{name} requires an argument"));
                return None;
            }
            (_, _) => {
                self.error(format!("unknown pseudo-class :{name}"));
                PseudoClass::Unknown(name.clone())
            }
        };
        Some(Selector::PseudoClass(kind))
    }

    /// Parse a pseudo-element; the `::` is consumed.
    fn parse_pseudo_element(&mut self) -> Option<Selector> {
        let name = match self.lexer.next_token().kind {
            CssTokenKind::Identifier(name) => name,
            other => {
                self.error(format!("expected pseudo-element name, found {other:?}"));
                return None;
            }
        };
        let kind = match name.as_str() {
            "before" => PseudoElement::Before,
            "after" => PseudoElement::After,
            "first-line" => PseudoElement::FirstLine,
            "first-letter" => PseudoElement::FirstLetter,
            _ => {
                self.error(format!("unknown pseudo-element ::{name}"));
                PseudoElement::Unknown(name.clone())
            }
        };
        Some(Selector::PseudoElement(kind))
    }

    fn parse_nth(&mut self, argument: &str) -> Option<NthExpr> {
        match NthExpr::parse(argument) {
            Some(expr) => Some(expr),
            None => {
                self.error(format!("invalid nth expression '{argument}'"));
                None
            }
        }
    }

    /// Compile a functional pseudo's argument as its own selector list,
    /// folding any nested errors into this parser's list.
    fn parse_nested_list(&mut self, argument: &str) -> Option<SelectorList> {
        let mut nested = CssParser::new(argument);
        let list = nested.parse_selector_list();
        self.errors.extend(nested.take_errors());
        if list.is_empty() {
            return None;
        }
        Some(list)
    }

    /// Parse a `:has()` argument: selectors that may begin with an explicit
    /// combinator anchoring them to the candidate element.
    fn parse_relative_list(&mut self, argument: &str) -> Option<RelativeSelectorList> {
        let mut nested = CssParser::new(argument);
        let mut selectors = Vec::new();
        loop {
            nested.skip_whitespace();
            let combinator = match nested.peek_kind() {
                CssTokenKind::Greater => {
                    nested.lexer.next_token();
                    Combinator::Child
                }
                CssTokenKind::Plus => {
                    nested.lexer.next_token();
                    Combinator::AdjacentSibling
                }
                CssTokenKind::Tilde => {
                    nested.lexer.next_token();
                    Combinator::GeneralSibling
                }
                _ => Combinator::Descendant,
            };
            nested.skip_whitespace();
            match nested.parse_selector() {
                Some(selector) => selectors.push(RelativeSelector {
                    combinator,
                    selector,
                }),
                None => nested.recover_to_comma(),
            }
            nested.skip_whitespace();
            match nested.peek_kind() {
                CssTokenKind::Comma => {
                    nested.lexer.next_token();
                }
                _ => break,
            }
        }
        self.errors.extend(nested.take_errors());
        if selectors.is_empty() {
            self.error("empty :has() argument");
            return None;
        }
        Some(RelativeSelectorList { selectors })
    }

    // ==================== Utilities ====================

    fn peek_kind(&mut self) -> CssTokenKind {
        self.lexer.peek_token().kind.clone()
    }

    fn skip_whitespace(&mut self) {
        while self.peek_kind() == CssTokenKind::Whitespace {
            self.lexer.next_token();
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        let location = self.lexer.location();
        self.errors
            .push(ParseError::new(ErrorCode::InvalidSelector, message, location));
    }

    /// Skip tokens until just after the next comma (or to EOF), so the
    /// remaining selectors in a list can still be parsed.
    fn recover_to_comma(&mut self) {
        loop {
            match self.peek_kind() {
                CssTokenKind::Eof => break,
                CssTokenKind::Comma => break,
                _ => {
                    self.lexer.next_token();
                }
            }
        }
    }

    /// Skip tokens through the given closing token.
    fn recover_past(&mut self, target: CssTokenKind) {
        loop {
            let token: CssToken = self.lexer.next_token();
            if token.kind == target || token.kind == CssTokenKind::Eof {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> SelectorList {
        let mut parser = CssParser::new(input);
        let list = parser.parse_selector_list();
        assert!(
            !parser.has_errors(),
            "unexpected errors for {input:?}: {:?}",
            parser.take_errors()
        );
        list
    }

    fn parse_err(input: &str) -> (SelectorList, Vec<ParseError>) {
        let mut parser = CssParser::new(input);
        let list = parser.parse_selector_list();
        let errors = parser.take_errors();
        assert!(!errors.is_empty(), "expected errors for {input:?}");
        (list, errors)
    }

    #[test]
    fn single_type_selector() {
        let list = parse_ok("div");
        assert_eq!(list.selectors, vec![Selector::Type("div".into())]);
    }

    #[test]
    fn compound_selector() {
        let list = parse_ok("div.note#main");
        match &list.selectors[0] {
            Selector::Compound(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], Selector::Type("div".into()));
                assert_eq!(parts[1], Selector::Class("note".into()));
                assert_eq!(parts[2], Selector::Id("main".into()));
            }
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn descendant_combinator_from_whitespace() {
        let list = parse_ok("div p");
        match &list.selectors[0] {
            Selector::Combinator { kind, left, right } => {
                assert_eq!(*kind, Combinator::Descendant);
                assert_eq!(**left, Selector::Type("div".into()));
                assert_eq!(**right, Selector::Type("p".into()));
            }
            other => panic!("expected combinator, got {other:?}"),
        }
    }

    #[test]
    fn explicit_combinators() {
        for (input, expected) in [
            ("a > b", Combinator::Child),
            ("a + b", Combinator::AdjacentSibling),
            ("a ~ b", Combinator::GeneralSibling),
            ("a>b", Combinator::Child),
        ] {
            let list = parse_ok(input);
            match &list.selectors[0] {
                Selector::Combinator { kind, .. } => assert_eq!(*kind, expected, "{input}"),
                other => panic!("expected combinator for {input}, got {other:?}"),
            }
        }
    }

    #[test]
    fn combinator_chain_is_left_associative() {
        let list = parse_ok("a b > c");
        match &list.selectors[0] {
            Selector::Combinator { kind, left, right } => {
                assert_eq!(*kind, Combinator::Child);
                assert_eq!(**right, Selector::Type("c".into()));
                match &**left {
                    Selector::Combinator { kind, .. } => {
                        assert_eq!(*kind, Combinator::Descendant)
                    }
                    other => panic!("expected nested combinator, got {other:?}"),
                }
            }
            other => panic!("expected combinator, got {other:?}"),
        }
    }

    #[test]
    fn selector_list_with_commas() {
        let list = parse_ok("div, p , .x");
        assert_eq!(list.len(), 3);
        assert_eq!(list.selectors[2], Selector::Class("x".into()));
    }

    #[test]
    fn trailing_comma_is_error() {
        let (list, errors) = parse_err("div, p,");
        assert_eq!(list.len(), 2);
        assert!(errors[0].message.contains("trailing comma"));
    }

    #[test]
    fn attribute_selectors() {
        let list = parse_ok("[href][rel=nofollow][href^=\"http\"]");
        match &list.selectors[0] {
            Selector::Compound(parts) => {
                assert_eq!(
                    parts[0],
                    Selector::Attribute {
                        name: "href".into(),
                        op: AttrOperator::Exists,
                        value: String::new()
                    }
                );
                assert_eq!(
                    parts[1],
                    Selector::Attribute {
                        name: "rel".into(),
                        op: AttrOperator::Equals,
                        value: "nofollow".into()
                    }
                );
                assert_eq!(
                    parts[2],
                    Selector::Attribute {
                        name: "href".into(),
                        op: AttrOperator::StartsWith,
                        value: "http".into()
                    }
                );
            }
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn attribute_with_spaces() {
        let list = parse_ok("[ lang |= en ]");
        assert_eq!(
            list.selectors[0],
            Selector::Attribute {
                name: "lang".into(),
                op: AttrOperator::LangMatch,
                value: "en".into()
            }
        );
    }

    #[test]
    fn malformed_attribute_is_recoverable() {
        let (_, errors) = parse_err("[=x], p");
        assert_eq!(errors[0].code, ErrorCode::InvalidSelector);
        let mut parser = CssParser::new("[=x], p");
        let list = parser.parse_selector_list();
        // The broken selector is dropped; p survives.
        assert_eq!(list.len(), 1);
        assert_eq!(list.selectors[0], Selector::Type("p".into()));
    }

    #[test]
    fn structural_pseudo_classes() {
        let list = parse_ok("li:first-child:last-of-type");
        match &list.selectors[0] {
            Selector::Compound(parts) => {
                assert_eq!(parts[1], Selector::PseudoClass(PseudoClass::FirstChild));
                assert_eq!(parts[2], Selector::PseudoClass(PseudoClass::LastOfType));
            }
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn nth_child_arguments() {
        let list = parse_ok("li:nth-child(2n+1)");
        match &list.selectors[0] {
            Selector::Compound(parts) => {
                assert_eq!(
                    parts[1],
                    Selector::PseudoClass(PseudoClass::NthChild(NthExpr { a: 2, b: 1 }))
                );
            }
            other => panic!("expected compound, got {other:?}"),
        }
        let list = parse_ok(":nth-last-of-type(odd)");
        assert_eq!(
            list.selectors[0],
            Selector::PseudoClass(PseudoClass::NthLastOfType(NthExpr { a: 2, b: 1 }))
        );
    }

    #[test]
    fn invalid_nth_is_error() {
        let (_, errors) = parse_err(":nth-child(2x+1)");
        assert!(errors[0].message.contains("nth"));
    }

    #[test]
    fn not_takes_selector_list() {
        let list = parse_ok("div:not(.a, #b)");
        match &list.selectors[0] {
            Selector::Compound(parts) => match &parts[1] {
                Selector::PseudoClass(PseudoClass::Not(inner)) => {
                    assert_eq!(inner.len(), 2);
                    assert_eq!(inner.selectors[0], Selector::Class("a".into()));
                    assert_eq!(inner.selectors[1], Selector::Id("b".into()));
                }
                other => panic!("expected :not, got {other:?}"),
            },
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn has_with_leading_combinator() {
        let list = parse_ok("div:has(> p.note)");
        match &list.selectors[0] {
            Selector::Compound(parts) => match &parts[1] {
                Selector::PseudoClass(PseudoClass::Has(inner)) => {
                    assert_eq!(inner.selectors.len(), 1);
                    assert_eq!(inner.selectors[0].combinator, Combinator::Child);
                }
                other => panic!("expected :has, got {other:?}"),
            },
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn has_defaults_to_descendant() {
        let list = parse_ok(":has(img)");
        match &list.selectors[0] {
            Selector::PseudoClass(PseudoClass::Has(inner)) => {
                assert_eq!(inner.selectors[0].combinator, Combinator::Descendant);
                assert_eq!(inner.selectors[0].selector, Selector::Type("img".into()));
            }
            other => panic!("expected :has, got {other:?}"),
        }
    }

    #[test]
    fn pseudo_elements_are_admitted() {
        let list = parse_ok("p::before");
        match &list.selectors[0] {
            Selector::Compound(parts) => {
                assert_eq!(parts[1], Selector::PseudoElement(PseudoElement::Before));
            }
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn unknown_pseudo_is_admitted_with_error() {
        let (list, errors) = parse_err("div:blink");
        assert_eq!(errors[0].code, ErrorCode::InvalidSelector);
        match &list.selectors[0] {
            Selector::Compound(parts) => {
                assert_eq!(
                    parts[1],
                    Selector::PseudoClass(PseudoClass::Unknown("blink".into()))
                );
            }
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn empty_selector_is_error() {
        let (list, _) = parse_err("");
        assert!(list.is_empty());
        let (list, _) = parse_err("   ");
        assert!(list.is_empty());
    }

    #[test]
    fn empty_compound_after_combinator_is_error() {
        let (_, errors) = parse_err("div >");
        assert!(errors
            .iter()
            .any(|e| e.message.contains("empty compound")));
    }

    #[test]
    fn universal_and_nested_functions() {
        let list = parse_ok("*:is(div p, span)");
        match &list.selectors[0] {
            Selector::Compound(parts) => {
                assert_eq!(parts[0], Selector::Universal);
                match &parts[1] {
                    Selector::PseudoClass(PseudoClass::Is(inner)) => {
                        assert_eq!(inner.len(), 2);
                        assert!(matches!(inner.selectors[0], Selector::Combinator { .. }));
                    }
                    other => panic!("expected :is, got {other:?}"),
                }
            }
            other => panic!("expected compound, got {other:?}"),
        }
    }

    #[test]
    fn display_roundtrip_through_parser() {
        for input in [
            "div > p.note",
            "ul li:nth-child(2n+1)",
            "a[href^=\"http\"]",
            "div:has(> p.note)",
            "p::before",
            "div, span.x",
        ] {
            let list = parse_ok(input);
            let printed = list.to_string();
            let reparsed = parse_ok(&printed);
            assert_eq!(list, reparsed, "{input} -> {printed}");
        }
    }
}

//! Selector AST and specificity.

use std::fmt;
use std::ops::Add;

use crate::nth::NthExpr;

/// Attribute matching operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOperator {
    /// `[attr]`
    Exists,
    /// `[attr=v]`
    Equals,
    /// `[attr*=v]`
    Contains,
    /// `[attr^=v]`
    StartsWith,
    /// `[attr$=v]`
    EndsWith,
    /// `[attr~=v]`
    WordMatch,
    /// `[attr|=v]`
    LangMatch,
}

/// Combinators between compound selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    AdjacentSibling,
    /// `a ~ b`
    GeneralSibling,
}

/// Pseudo-classes. Functional arguments are parsed eagerly: nth expressions
/// into [`NthExpr`], selector arguments into nested lists.
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    FirstChild,
    LastChild,
    OnlyChild,
    Empty,
    Root,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(NthExpr),
    NthLastChild(NthExpr),
    NthOfType(NthExpr),
    NthLastOfType(NthExpr),
    Not(SelectorList),
    Is(SelectorList),
    Where(SelectorList),
    Has(RelativeSelectorList),
    Disabled,
    Enabled,
    Checked,
    Link,
    // Document-state pseudos: admitted, never match.
    Hover,
    Active,
    Focus,
    Visited,
    /// Admitted by the parser so selectors round-trip; matches nothing.
    Unknown(String),
}

/// Pseudo-elements never match real elements; they are carried so selector
/// strings round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoElement {
    Before,
    After,
    FirstLine,
    FirstLetter,
    Unknown(String),
}

/// A compiled selector.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Universal,
    Type(String),
    Class(String),
    Id(String),
    Attribute {
        name: String,
        op: AttrOperator,
        value: String,
    },
    PseudoClass(PseudoClass),
    PseudoElement(PseudoElement),
    /// Simple selectors that must all match the same element.
    Compound(Vec<Selector>),
    /// `right` matches the candidate element; `left` is constrained against
    /// an ancestor/parent/sibling according to `kind`.
    Combinator {
        kind: Combinator,
        left: Box<Selector>,
        right: Box<Selector>,
    },
}

/// A comma-separated selector group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectorList {
    pub selectors: Vec<Selector>,
}

impl SelectorList {
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// The highest specificity among the group's selectors.
    pub fn max_specificity(&self) -> Specificity {
        self.selectors
            .iter()
            .map(Selector::specificity)
            .max()
            .unwrap_or_default()
    }
}

/// One branch of a `:has()` argument: an implicit-descendant or explicitly
/// combinated selector anchored at the candidate element.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeSelector {
    pub combinator: Combinator,
    pub selector: Selector,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelativeSelectorList {
    pub selectors: Vec<RelativeSelector>,
}

/// Specificity triple, ordered lexicographically with `ids` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Specificity {
    pub ids: u32,
    pub classes: u32,
    pub elements: u32,
}

impl Specificity {
    pub fn new(ids: u32, classes: u32, elements: u32) -> Self {
        Self {
            ids,
            classes,
            elements,
        }
    }
}

impl Add for Specificity {
    type Output = Specificity;

    fn add(self, rhs: Specificity) -> Specificity {
        Specificity {
            ids: self.ids + rhs.ids,
            classes: self.classes + rhs.classes,
            elements: self.elements + rhs.elements,
        }
    }
}

impl Selector {
    /// Compute this selector's specificity.
    ///
    /// `:is`/`:not`/`:has` contribute the maximum specificity of their
    /// argument list; `:where` contributes nothing. Pseudo-elements count
    /// as elements, other pseudo-classes as classes.
    pub fn specificity(&self) -> Specificity {
        match self {
            Selector::Universal => Specificity::default(),
            Selector::Type(_) => Specificity::new(0, 0, 1),
            Selector::PseudoElement(_) => Specificity::new(0, 0, 1),
            Selector::Class(_) | Selector::Attribute { .. } => Specificity::new(0, 1, 0),
            Selector::Id(_) => Specificity::new(1, 0, 0),
            Selector::PseudoClass(kind) => match kind {
                PseudoClass::Is(list) | PseudoClass::Not(list) => list.max_specificity(),
                PseudoClass::Where(_) => Specificity::default(),
                PseudoClass::Has(list) => list
                    .selectors
                    .iter()
                    .map(|r| r.selector.specificity())
                    .max()
                    .unwrap_or_default(),
                _ => Specificity::new(0, 1, 0),
            },
            Selector::Compound(parts) => parts
                .iter()
                .map(Selector::specificity)
                .fold(Specificity::default(), Add::add),
            Selector::Combinator { left, right, .. } => left.specificity() + right.specificity(),
        }
    }
}

// ==================== Display ====================

impl fmt::Display for AttrOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AttrOperator::Exists => "",
            AttrOperator::Equals => "=",
            AttrOperator::Contains => "*=",
            AttrOperator::StartsWith => "^=",
            AttrOperator::EndsWith => "$=",
            AttrOperator::WordMatch => "~=",
            AttrOperator::LangMatch => "|=",
        };
        f.write_str(text)
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Combinator::Descendant => " ",
            Combinator::Child => " > ",
            Combinator::AdjacentSibling => " + ",
            Combinator::GeneralSibling => " ~ ",
        };
        f.write_str(text)
    }
}

impl fmt::Display for PseudoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PseudoClass::FirstChild => write!(f, ":first-child"),
            PseudoClass::LastChild => write!(f, ":last-child"),
            PseudoClass::OnlyChild => write!(f, ":only-child"),
            PseudoClass::Empty => write!(f, ":empty"),
            PseudoClass::Root => write!(f, ":root"),
            PseudoClass::FirstOfType => write!(f, ":first-of-type"),
            PseudoClass::LastOfType => write!(f, ":last-of-type"),
            PseudoClass::OnlyOfType => write!(f, ":only-of-type"),
            PseudoClass::NthChild(expr) => write!(f, ":nth-child({expr})"),
            PseudoClass::NthLastChild(expr) => write!(f, ":nth-last-child({expr})"),
            PseudoClass::NthOfType(expr) => write!(f, ":nth-of-type({expr})"),
            PseudoClass::NthLastOfType(expr) => write!(f, ":nth-last-of-type({expr})"),
            PseudoClass::Not(list) => write!(f, ":not({list})"),
            PseudoClass::Is(list) => write!(f, ":is({list})"),
            PseudoClass::Where(list) => write!(f, ":where({list})"),
            PseudoClass::Has(list) => {
                write!(f, ":has(")?;
                for (i, rel) in list.selectors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match rel.combinator {
                        Combinator::Descendant => {}
                        Combinator::Child => write!(f, "> ")?,
                        Combinator::AdjacentSibling => write!(f, "+ ")?,
                        Combinator::GeneralSibling => write!(f, "~ ")?,
                    }
                    write!(f, "{}", rel.selector)?;
                }
                write!(f, ")")
            }
            PseudoClass::Disabled => write!(f, ":disabled"),
            PseudoClass::Enabled => write!(f, ":enabled"),
            PseudoClass::Checked => write!(f, ":checked"),
            PseudoClass::Link => write!(f, ":link"),
            PseudoClass::Hover => write!(f, ":hover"),
            PseudoClass::Active => write!(f, ":active"),
            PseudoClass::Focus => write!(f, ":focus"),
            PseudoClass::Visited => write!(f, ":visited"),
            PseudoClass::Unknown(name) => write!(f, ":{name}"),
        }
    }
}

impl fmt::Display for PseudoElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PseudoElement::Before => write!(f, "::before"),
            PseudoElement::After => write!(f, "::after"),
            PseudoElement::FirstLine => write!(f, "::first-line"),
            PseudoElement::FirstLetter => write!(f, "::first-letter"),
            PseudoElement::Unknown(name) => write!(f, "::{name}"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Universal => write!(f, "*"),
            Selector::Type(name) => write!(f, "{name}"),
            Selector::Class(name) => write!(f, ".{name}"),
            Selector::Id(name) => write!(f, "#{name}"),
            Selector::Attribute { name, op, value } => match op {
                AttrOperator::Exists => write!(f, "[{name}]"),
                _ => write!(f, "[{name}{op}\"{value}\"]"),
            },
            Selector::PseudoClass(kind) => write!(f, "{kind}"),
            Selector::PseudoElement(kind) => write!(f, "{kind}"),
            Selector::Compound(parts) => {
                for part in parts {
                    write!(f, "{part}")?;
                }
                Ok(())
            }
            Selector::Combinator { kind, left, right } => {
                write!(f, "{left}{kind}{right}")
            }
        }
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}

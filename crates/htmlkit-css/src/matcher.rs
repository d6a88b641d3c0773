//! Selector matching against the DOM.
//!
//! `matches` answers whether one element satisfies a selector;
//! `find_all`/`find_first` traverse a subtree depth-first in document
//! order. Pseudo-elements and document-state pseudo-classes never match.

use htmlkit_dom::{Document, ElementRef};
use smallvec::SmallVec;
use tracing::debug;

use crate::selector::{
    AttrOperator, Combinator, PseudoClass, RelativeSelector, Selector, SelectorList,
};

/// Form controls for `:disabled`/`:enabled`.
const FORM_CONTROLS: &[&str] = &[
    "button", "fieldset", "input", "optgroup", "option", "select", "textarea",
];

type Siblings<'a> = SmallVec<[ElementRef<'a>; 8]>;

/// Whether `element` matches `selector`.
pub fn matches(element: ElementRef<'_>, selector: &Selector) -> bool {
    match selector {
        Selector::Universal => true,
        Selector::Type(name) => element.tag_name() == name,
        Selector::Class(name) => element.has_class(name),
        Selector::Id(value) => element.attr("id") == Some(value.as_str()),
        Selector::Attribute { name, op, value } => matches_attribute(element, name, *op, value),
        Selector::PseudoClass(kind) => matches_pseudo_class(element, kind),
        Selector::PseudoElement(_) => false,
        Selector::Compound(parts) => parts.iter().all(|part| matches(element, part)),
        Selector::Combinator { kind, left, right } => {
            if !matches(element, right) {
                return false;
            }
            match kind {
                Combinator::Descendant => {
                    let mut current = element.parent();
                    while let Some(ancestor) = current {
                        if matches(ancestor, left) {
                            return true;
                        }
                        current = ancestor.parent();
                    }
                    false
                }
                Combinator::Child => element
                    .parent()
                    .is_some_and(|parent| matches(parent, left)),
                Combinator::AdjacentSibling => element
                    .prev_sibling_element()
                    .is_some_and(|prev| matches(prev, left)),
                Combinator::GeneralSibling => {
                    preceding_siblings(element).iter().any(|s| matches(*s, left))
                }
            }
        }
    }
}

/// Whether `element` matches any selector in the list.
pub fn matches_list(element: ElementRef<'_>, list: &SelectorList) -> bool {
    list.selectors.iter().any(|s| matches(element, s))
}

/// All elements in the document matching the list, in document order.
pub fn find_all<'a>(document: &'a Document, list: &SelectorList) -> Vec<ElementRef<'a>> {
    let results: Vec<ElementRef<'a>> = document
        .elements()
        .filter(|e| matches_list(*e, list))
        .collect();
    debug!(selector = %list, count = results.len(), "find_all");
    results
}

/// All descendants of `root` matching the list, in document order.
/// `root` itself is not a candidate.
pub fn find_all_within<'a>(root: ElementRef<'a>, list: &SelectorList) -> Vec<ElementRef<'a>> {
    root.descendants().filter(|e| matches_list(*e, list)).collect()
}

/// The first document-order match in the document.
pub fn find_first<'a>(document: &'a Document, list: &SelectorList) -> Option<ElementRef<'a>> {
    document.elements().find(|e| matches_list(*e, list))
}

/// The first document-order match among `root`'s descendants.
pub fn find_first_within<'a>(
    root: ElementRef<'a>,
    list: &SelectorList,
) -> Option<ElementRef<'a>> {
    root.descendants().find(|e| matches_list(*e, list))
}

// ==================== Attribute matching ====================

fn matches_attribute(element: ElementRef<'_>, name: &str, op: AttrOperator, value: &str) -> bool {
    let actual = match element.attr(name) {
        Some(actual) => actual,
        None => return false,
    };
    match op {
        AttrOperator::Exists => true,
        AttrOperator::Equals => actual == value,
        AttrOperator::Contains => !value.is_empty() && actual.contains(value),
        AttrOperator::StartsWith => !value.is_empty() && actual.starts_with(value),
        AttrOperator::EndsWith => !value.is_empty() && actual.ends_with(value),
        AttrOperator::WordMatch => actual.split_ascii_whitespace().any(|word| word == value),
        AttrOperator::LangMatch => {
            actual == value
                || (actual.len() > value.len()
                    && actual.starts_with(value)
                    && actual.as_bytes()[value.len()] == b'-')
        }
    }
}

// ==================== Pseudo-class matching ====================

fn matches_pseudo_class(element: ElementRef<'_>, kind: &PseudoClass) -> bool {
    match kind {
        PseudoClass::FirstChild => element.prev_sibling_element().is_none(),
        PseudoClass::LastChild => element.next_sibling_element().is_none(),
        PseudoClass::OnlyChild => {
            element.prev_sibling_element().is_none() && element.next_sibling_element().is_none()
        }
        PseudoClass::Empty => is_empty(element),
        PseudoClass::Root => element.is_root(),
        PseudoClass::FirstOfType => type_index(element) == 1,
        PseudoClass::LastOfType => type_index_from_end(element) == 1,
        PseudoClass::OnlyOfType => {
            type_index(element) == 1 && type_index_from_end(element) == 1
        }
        PseudoClass::NthChild(expr) => expr.matches(child_index(element)),
        PseudoClass::NthLastChild(expr) => expr.matches(child_index_from_end(element)),
        PseudoClass::NthOfType(expr) => expr.matches(type_index(element)),
        PseudoClass::NthLastOfType(expr) => expr.matches(type_index_from_end(element)),
        PseudoClass::Not(list) => !matches_list(element, list),
        PseudoClass::Is(list) | PseudoClass::Where(list) => matches_list(element, list),
        PseudoClass::Has(list) => list.selectors.iter().any(|rel| matches_has(element, rel)),
        PseudoClass::Disabled => is_form_control(element) && element.has_attr("disabled"),
        PseudoClass::Enabled => is_form_control(element) && !element.has_attr("disabled"),
        PseudoClass::Checked => {
            (element.tag_name() == "input" && element.has_attr("checked"))
                || (element.tag_name() == "option" && element.has_attr("selected"))
        }
        PseudoClass::Link => element.tag_name() == "a" && element.has_attr("href"),
        // No document state: these never match.
        PseudoClass::Hover
        | PseudoClass::Active
        | PseudoClass::Focus
        | PseudoClass::Visited
        | PseudoClass::Unknown(_) => false,
    }
}

/// `:has()` anchored at `element`: does any related element match?
fn matches_has(element: ElementRef<'_>, relative: &RelativeSelector) -> bool {
    let selector = &relative.selector;
    match relative.combinator {
        Combinator::Descendant => element.descendants().any(|d| matches(d, selector)),
        Combinator::Child => element.children().any(|c| matches(c, selector)),
        Combinator::AdjacentSibling => element
            .next_sibling_element()
            .is_some_and(|next| matches(next, selector)),
        Combinator::GeneralSibling => {
            following_siblings(element).iter().any(|s| matches(*s, selector))
        }
    }
}

/// No element children and no text content; comments are ignored.
fn is_empty(element: ElementRef<'_>) -> bool {
    let doc = element.document();
    element.child_nodes().iter().all(|&id| {
        let node = doc.node(id);
        match node.as_text() {
            Some(text) => text.is_empty(),
            None => node.as_comment().is_some(),
        }
    })
}

fn is_form_control(element: ElementRef<'_>) -> bool {
    FORM_CONTROLS.contains(&element.tag_name())
}

// ==================== Sibling arithmetic ====================

fn sibling_elements(element: ElementRef<'_>) -> Siblings<'_> {
    element.element_siblings().into_iter().collect()
}

fn preceding_siblings(element: ElementRef<'_>) -> Siblings<'_> {
    let mut out = Siblings::new();
    for sibling in sibling_elements(element) {
        if sibling == element {
            break;
        }
        out.push(sibling);
    }
    out
}

fn following_siblings(element: ElementRef<'_>) -> Siblings<'_> {
    let mut out = Siblings::new();
    let mut seen = false;
    for sibling in sibling_elements(element) {
        if seen {
            out.push(sibling);
        } else if sibling == element {
            seen = true;
        }
    }
    out
}

/// 1-based position among element siblings.
fn child_index(element: ElementRef<'_>) -> usize {
    let siblings = sibling_elements(element);
    siblings
        .iter()
        .position(|s| *s == element)
        .map(|p| p + 1)
        .unwrap_or(1)
}

fn child_index_from_end(element: ElementRef<'_>) -> usize {
    let siblings = sibling_elements(element);
    let pos = siblings.iter().position(|s| *s == element).unwrap_or(0);
    siblings.len() - pos
}

/// 1-based position among element siblings sharing this tag name.
fn type_index(element: ElementRef<'_>) -> usize {
    let tag = element.tag_name();
    let mut index = 0;
    for sibling in sibling_elements(element) {
        if sibling.tag_name() == tag {
            index += 1;
        }
        if sibling == element {
            return index;
        }
    }
    index.max(1)
}

fn type_index_from_end(element: ElementRef<'_>) -> usize {
    let tag = element.tag_name();
    let siblings = sibling_elements(element);
    let mut index = 0;
    for sibling in siblings.iter().rev() {
        if sibling.tag_name() == tag {
            index += 1;
        }
        if *sibling == element {
            return index;
        }
    }
    index.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;

    fn doc(html: &str) -> Document {
        let options = htmlkit_parser::ParserOptions::default();
        htmlkit_parser::parse(html, &options).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    fn select<'a>(document: &'a Document, selector: &str) -> Vec<ElementRef<'a>> {
        let list = compile(selector).unwrap_or_else(|e| panic!("compile failed: {e}"));
        find_all(document, &list)
    }

    fn texts(elements: &[ElementRef<'_>]) -> Vec<String> {
        elements.iter().map(|e| e.text_content()).collect()
    }

    #[test]
    fn type_and_universal() {
        let d = doc("<div><span>a</span><p>b</p></div>");
        assert_eq!(select(&d, "span").len(), 1);
        assert_eq!(select(&d, "*").len(), 3);
    }

    #[test]
    fn class_and_id() {
        let d = doc("<div class=\"x y\"><p id=\"main\">hi</p></div>");
        assert_eq!(select(&d, ".x").len(), 1);
        assert_eq!(select(&d, ".y").len(), 1);
        assert_eq!(select(&d, ".z").len(), 0);
        assert_eq!(select(&d, "#main").len(), 1);
        assert_eq!(select(&d, "p#main").len(), 1);
        assert_eq!(select(&d, "div#main").len(), 0);
    }

    #[test]
    fn attribute_operators() {
        let d = doc(concat!(
            "<a href=\"https://example.com/page\" rel=\"nofollow external\" lang=\"en-US\">x</a>",
            "<a name=\"plain\">y</a>",
        ));
        assert_eq!(select(&d, "[href]").len(), 1);
        assert_eq!(select(&d, "[href=\"https://example.com/page\"]").len(), 1);
        assert_eq!(select(&d, "[href*=\"example\"]").len(), 1);
        assert_eq!(select(&d, "[href^=\"https\"]").len(), 1);
        assert_eq!(select(&d, "[href$=\"page\"]").len(), 1);
        assert_eq!(select(&d, "[rel~=\"external\"]").len(), 1);
        assert_eq!(select(&d, "[rel~=\"ext\"]").len(), 0);
        assert_eq!(select(&d, "[lang|=\"en\"]").len(), 1);
        assert_eq!(select(&d, "[lang|=\"e\"]").len(), 0);
    }

    #[test]
    fn descendant_and_child() {
        let d = doc("<div><section><p>deep</p></section><p>direct</p></div>");
        assert_eq!(select(&d, "div p").len(), 2);
        let direct = select(&d, "div > p");
        assert_eq!(texts(&direct), vec!["direct"]);
        assert_eq!(select(&d, "section > p").len(), 1);
    }

    #[test]
    fn sibling_combinators() {
        let d = doc("<ul><li>1</li><li>2</li><li>3</li></ul>");
        assert_eq!(select(&d, "li + li").len(), 2);
        assert_eq!(select(&d, "li ~ li").len(), 2);
        let d = doc("<div><h1>t</h1><!-- c --><p>a</p><p>b</p></div>");
        // Comment nodes are skipped when finding the adjacent sibling.
        assert_eq!(texts(&select(&d, "h1 + p")), vec!["a"]);
        assert_eq!(select(&d, "h1 ~ p").len(), 2);
    }

    #[test]
    fn structural_pseudos() {
        let d = doc("<ul><li>1</li><li>2</li><li>3</li></ul>");
        assert_eq!(texts(&select(&d, "li:first-child")), vec!["1"]);
        assert_eq!(texts(&select(&d, "li:last-child")), vec!["3"]);
        assert_eq!(select(&d, "li:only-child").len(), 0);
        assert_eq!(select(&d, "ul:only-child").len(), 1);
    }

    #[test]
    fn empty_and_root() {
        let d = doc("<div><span></span><span><!-- c --></span><span>x</span></div>");
        assert_eq!(select(&d, "span:empty").len(), 2);
        assert_eq!(select(&d, "div:root").len(), 1);
        assert_eq!(select(&d, "span:root").len(), 0);
    }

    #[test]
    fn of_type_pseudos() {
        let d = doc("<div><h1>t</h1><p>a</p><p>b</p><h2>u</h2></div>");
        assert_eq!(texts(&select(&d, "p:first-of-type")), vec!["a"]);
        assert_eq!(texts(&select(&d, "p:last-of-type")), vec!["b"]);
        assert_eq!(texts(&select(&d, "h1:only-of-type")), vec!["t"]);
        assert_eq!(select(&d, "p:only-of-type").len(), 0);
    }

    #[test]
    fn nth_child_family() {
        let d = doc("<ul><li>1</li><li>2</li><li>3</li><li>4</li><li>5</li></ul>");
        assert_eq!(texts(&select(&d, "li:nth-child(2)")), vec!["2"]);
        assert_eq!(texts(&select(&d, "li:nth-child(odd)")), vec!["1", "3", "5"]);
        assert_eq!(texts(&select(&d, "li:nth-child(even)")), vec!["2", "4"]);
        assert_eq!(texts(&select(&d, "li:nth-child(2n+1)")), vec!["1", "3", "5"]);
        assert_eq!(texts(&select(&d, "li:nth-last-child(1)")), vec!["5"]);
        assert_eq!(texts(&select(&d, "li:nth-last-child(2n)")), vec!["2", "4"]);
        assert_eq!(texts(&select(&d, "li:nth-child(-n+2)")), vec!["1", "2"]);
    }

    #[test]
    fn nth_of_type_counts_per_tag() {
        let d = doc("<div><p>p1</p><span>s1</span><p>p2</p><span>s2</span><p>p3</p></div>");
        assert_eq!(texts(&select(&d, "p:nth-of-type(2)")), vec!["p2"]);
        assert_eq!(texts(&select(&d, "p:nth-of-type(odd)")), vec!["p1", "p3"]);
        assert_eq!(texts(&select(&d, "span:nth-last-of-type(1)")), vec!["s2"]);
    }

    #[test]
    fn nth_child_index_roundtrip() {
        let d = doc("<ul><li>1</li><li>2</li><li>3</li><li>4</li></ul>");
        let items = select(&d, "li");
        for (i, item) in items.iter().enumerate() {
            let list = compile(&format!(":nth-child({})", i + 1)).unwrap();
            assert!(matches_list(*item, &list));
        }
    }

    #[test]
    fn not_is_where() {
        let d = doc("<div><p class=\"a\">1</p><p class=\"b\">2</p><p>3</p></div>");
        assert_eq!(texts(&select(&d, "p:not(.a)")), vec!["2", "3"]);
        assert_eq!(texts(&select(&d, "p:not(.a, .b)")), vec!["3"]);
        assert_eq!(texts(&select(&d, "p:is(.a, .b)")), vec!["1", "2"]);
        assert_eq!(texts(&select(&d, "p:where(.a, .b)")), vec!["1", "2"]);
    }

    #[test]
    fn has_descendant_form() {
        let d = doc("<div><section><img></section></div><div><p>n</p></div>");
        let hits = select(&d, "div:has(img)");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tag_name(), "div");
    }

    #[test]
    fn has_child_form() {
        let d = doc("<div><p class=\"note\">x</p></div><div><span></span></div>");
        let hits = select(&d, "div:has(> p.note)");
        assert_eq!(hits.len(), 1);
        let d2 = doc("<div><section><p class=\"note\">x</p></section></div>");
        // The note is a grandchild, not a child.
        assert_eq!(select(&d2, "div:has(> p.note)").len(), 0);
        assert_eq!(select(&d2, "div:has(p.note)").len(), 1);
    }

    #[test]
    fn has_sibling_forms() {
        let d = doc("<ul><li class=\"a\">1</li><li class=\"b\">2</li><li class=\"c\">3</li></ul>");
        assert_eq!(texts(&select(&d, "li:has(+ .b)")), vec!["1"]);
        assert_eq!(texts(&select(&d, "li:has(~ .c)")), vec!["1", "2"]);
    }

    #[test]
    fn form_state_pseudos() {
        let d = doc(concat!(
            "<form>",
            "<input type=\"text\" disabled>",
            "<input type=\"checkbox\" checked>",
            "<select><option selected>a</option><option>b</option></select>",
            "<div disabled>not a control</div>",
            "</form>",
        ));
        assert_eq!(select(&d, ":disabled").len(), 1);
        // input[checkbox], select, both options are enabled controls.
        assert_eq!(select(&d, ":enabled").len(), 4);
        assert_eq!(select(&d, ":checked").len(), 2);
        assert_eq!(select(&d, "div:disabled").len(), 0);
    }

    #[test]
    fn link_pseudo() {
        let d = doc("<a href=\"/x\">with</a><a name=\"anchor\">without</a>");
        assert_eq!(texts(&select(&d, "a:link")), vec!["with"]);
    }

    #[test]
    fn state_pseudos_never_match() {
        let d = doc("<a href=\"/x\">x</a>");
        for selector in ["a:hover", "a:active", "a:focus", "a:visited"] {
            assert_eq!(select(&d, selector).len(), 0, "{selector}");
        }
    }

    #[test]
    fn pseudo_elements_never_match() {
        let d = doc("<p>x</p>");
        assert_eq!(select(&d, "p::before").len(), 0);
        assert_eq!(select(&d, "p::first-line").len(), 0);
    }

    #[test]
    fn selector_list_document_order_no_duplicates() {
        let d = doc("<div class=\"a\"><p class=\"a b\">x</p></div>");
        let hits = select(&d, ".a, .b, div, p");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].tag_name(), "div");
        assert_eq!(hits[1].tag_name(), "p");
    }

    #[test]
    fn find_first_agrees_with_find_all() {
        let d = doc("<div><p>1</p><p>2</p></div>");
        let list = compile("p").unwrap();
        let all = find_all(&d, &list);
        let first = find_first(&d, &list);
        assert_eq!(first, all.first().copied());
    }

    #[test]
    fn element_rooted_search_excludes_root() {
        let d = doc("<div class=\"x\"><div class=\"x\"><p>inner</p></div></div>");
        let list = compile(".x").unwrap();
        let outer = d.root_element().unwrap();
        let within = find_all_within(outer, &list);
        assert_eq!(within.len(), 1);
        assert_ne!(within[0], outer);
    }

    #[test]
    fn compound_matches_iff_all_parts_match() {
        let d = doc("<p class=\"a\">1</p><p class=\"b\">2</p>");
        let compound = compile("p.a").unwrap();
        let p_only = compile("p").unwrap();
        let a_only = compile(".a").unwrap();
        for element in d.elements() {
            let both = matches_list(element, &p_only) && matches_list(element, &a_only);
            assert_eq!(matches_list(element, &compound), both);
        }
    }
}

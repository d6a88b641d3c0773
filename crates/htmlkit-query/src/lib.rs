//! # htmlkit Query
//!
//! Fluent, immutable element-set queries over a parsed document.
//!
//! An [`ElementQuery`] is an ordered set of elements borrowed from one
//! [`Document`]. Every filter, navigation, and slicing operation returns a
//! new query; the original is never modified. Selector-taking methods are
//! lenient: a selector that fails to compile yields an empty result.

use std::collections::HashSet;

use htmlkit_common::ParseResult;
use htmlkit_css::{compile_cached, find_all, find_all_within, find_first, find_first_within};
use htmlkit_dom::{Document, ElementRef, NodeId};
use tracing::debug;

/// Run a selector against a whole document, producing a query.
pub fn query<'a>(document: &'a Document, selector: &str) -> ElementQuery<'a> {
    let elements = match compile_cached(selector) {
        Ok(list) => find_all(document, &list),
        Err(_) => Vec::new(),
    };
    debug!(selector, count = elements.len(), "query");
    ElementQuery { document, elements }
}

/// Like [`query`], but selector compilation errors are returned.
pub fn try_query<'a>(document: &'a Document, selector: &str) -> ParseResult<ElementQuery<'a>> {
    let list = compile_cached(selector)?;
    let elements = find_all(document, &list);
    Ok(ElementQuery { document, elements })
}

/// All matches in the document, in document order.
pub fn query_all<'a>(document: &'a Document, selector: &str) -> Vec<ElementRef<'a>> {
    query(document, selector).into_elements()
}

/// The earliest document-order match.
pub fn query_first<'a>(document: &'a Document, selector: &str) -> Option<ElementRef<'a>> {
    let list = compile_cached(selector).ok()?;
    find_first(document, &list)
}

/// All matching descendants of `root`, in document order.
pub fn query_all_within<'a>(root: ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
    match compile_cached(selector) {
        Ok(list) => find_all_within(root, &list),
        Err(_) => Vec::new(),
    }
}

/// The earliest matching descendant of `root`.
pub fn query_first_within<'a>(root: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let list = compile_cached(selector).ok()?;
    find_first_within(root, &list)
}

/// Whether `element` matches the selector.
pub fn matches(element: ElementRef<'_>, selector: &str) -> bool {
    match compile_cached(selector) {
        Ok(list) => htmlkit_css::matches_list(element, &list),
        Err(_) => false,
    }
}

/// Types that can root a CSS query.
pub trait Queryable {
    /// Run a selector and get a chainable query. Invalid selectors yield
    /// an empty query.
    fn css<'q>(&'q self, selector: &str) -> ElementQuery<'q>;
}

impl Queryable for Document {
    fn css<'q>(&'q self, selector: &str) -> ElementQuery<'q> {
        query(self, selector)
    }
}

impl<'a> Queryable for ElementRef<'a> {
    fn css<'q>(&'q self, selector: &str) -> ElementQuery<'q> {
        ElementQuery {
            document: self.document(),
            elements: query_all_within(*self, selector),
        }
    }
}

/// An ordered, immutable set of elements from one document.
#[derive(Debug, Clone)]
pub struct ElementQuery<'a> {
    document: &'a Document,
    elements: Vec<ElementRef<'a>>,
}

impl<'a> ElementQuery<'a> {
    /// Wrap an explicit element list.
    pub fn from_elements(document: &'a Document, elements: Vec<ElementRef<'a>>) -> Self {
        Self { document, elements }
    }

    fn derive(&self, elements: Vec<ElementRef<'a>>) -> Self {
        Self {
            document: self.document,
            elements,
        }
    }

    /// New query from candidate elements with duplicates removed, restored
    /// to document order.
    fn derive_set(&self, candidates: Vec<ElementRef<'a>>) -> Self {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut elements: Vec<ElementRef<'a>> = candidates
            .into_iter()
            .filter(|e| seen.insert(e.node_id()))
            .collect();
        elements.sort_by_key(ElementRef::node_id);
        self.derive(elements)
    }

    // ==================== Access ====================

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[ElementRef<'a>] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<ElementRef<'a>> {
        self.elements
    }

    pub fn get(&self, index: usize) -> Option<ElementRef<'a>> {
        self.elements.get(index).copied()
    }

    pub fn first_element(&self) -> Option<ElementRef<'a>> {
        self.elements.first().copied()
    }

    pub fn last_element(&self) -> Option<ElementRef<'a>> {
        self.elements.last().copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ElementRef<'a>> {
        self.elements.iter()
    }

    // ==================== Chained queries ====================

    /// Query the descendants of every element in this set.
    pub fn css(&self, selector: &str) -> ElementQuery<'a> {
        let mut out = Vec::new();
        for element in &self.elements {
            out.extend(query_all_within(*element, selector));
        }
        self.derive_set(out)
    }

    // ==================== Navigation ====================

    pub fn children(&self) -> ElementQuery<'a> {
        let mut out = Vec::new();
        for element in &self.elements {
            out.extend(element.children());
        }
        self.derive_set(out)
    }

    pub fn parent(&self) -> ElementQuery<'a> {
        let out: Vec<_> = self.elements.iter().filter_map(|e| e.parent()).collect();
        self.derive_set(out)
    }

    pub fn parents(&self) -> ElementQuery<'a> {
        let mut out = Vec::new();
        for element in &self.elements {
            out.extend(element.ancestors());
        }
        self.derive_set(out)
    }

    /// For each element, the nearest self-or-ancestor matching the
    /// selector.
    pub fn closest(&self, selector: &str) -> ElementQuery<'a> {
        let list = match compile_cached(selector) {
            Ok(list) => list,
            Err(_) => return self.derive(Vec::new()),
        };
        let mut out = Vec::new();
        for element in &self.elements {
            let mut current = Some(*element);
            while let Some(candidate) = current {
                if htmlkit_css::matches_list(candidate, &list) {
                    out.push(candidate);
                    break;
                }
                current = candidate.parent();
            }
        }
        self.derive_set(out)
    }

    pub fn next_sibling(&self) -> ElementQuery<'a> {
        let out: Vec<_> = self
            .elements
            .iter()
            .filter_map(|e| e.next_sibling_element())
            .collect();
        self.derive_set(out)
    }

    pub fn prev_sibling(&self) -> ElementQuery<'a> {
        let out: Vec<_> = self
            .elements
            .iter()
            .filter_map(|e| e.prev_sibling_element())
            .collect();
        self.derive_set(out)
    }

    pub fn siblings(&self) -> ElementQuery<'a> {
        let mut out = Vec::new();
        for element in &self.elements {
            out.extend(element.siblings());
        }
        self.derive_set(out)
    }

    // ==================== Filters ====================

    pub fn has_attribute(&self, name: &str) -> ElementQuery<'a> {
        self.filter(|e| e.has_attr(name))
    }

    pub fn has_attribute_value(&self, name: &str, value: &str) -> ElementQuery<'a> {
        self.filter(|e| e.attr(name) == Some(value))
    }

    pub fn has_class(&self, class_name: &str) -> ElementQuery<'a> {
        self.filter(|e| e.has_class(class_name))
    }

    pub fn has_tag(&self, tag_name: &str) -> ElementQuery<'a> {
        self.filter(|e| e.tag_name().eq_ignore_ascii_case(tag_name))
    }

    /// Elements whose full text equals `text`.
    pub fn has_text(&self, text: &str) -> ElementQuery<'a> {
        self.filter(|e| e.text_content() == text)
    }

    /// Elements whose full text contains `text`.
    pub fn containing_text(&self, text: &str) -> ElementQuery<'a> {
        self.filter(|e| e.text_content().contains(text))
    }

    pub fn matching_text(&self, predicate: impl Fn(&str) -> bool) -> ElementQuery<'a> {
        self.filter(|e| predicate(&e.text_content()))
    }

    pub fn filter(&self, predicate: impl Fn(&ElementRef<'a>) -> bool) -> ElementQuery<'a> {
        let out: Vec<_> = self
            .elements
            .iter()
            .filter(|e| predicate(e))
            .copied()
            .collect();
        self.derive(out)
    }

    /// Drop elements matching the selector.
    pub fn not_(&self, selector: &str) -> ElementQuery<'a> {
        let list = match compile_cached(selector) {
            Ok(list) => list,
            Err(_) => return self.clone(),
        };
        self.filter(|e| !htmlkit_css::matches_list(*e, &list))
    }

    /// Whether any element in the set matches the selector.
    pub fn is(&self, selector: &str) -> bool {
        match compile_cached(selector) {
            Ok(list) => self
                .elements
                .iter()
                .any(|e| htmlkit_css::matches_list(*e, &list)),
            Err(_) => false,
        }
    }

    pub fn contains_element(&self, element: ElementRef<'a>) -> bool {
        self.elements.contains(&element)
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.elements.iter().any(|e| e.text_content().contains(text))
    }

    // ==================== Slicing ====================

    pub fn slice(&self, start: usize, end: usize) -> ElementQuery<'a> {
        let end = end.min(self.elements.len());
        let start = start.min(end);
        self.derive(self.elements[start..end].to_vec())
    }

    pub fn first(&self, n: usize) -> ElementQuery<'a> {
        self.slice(0, n)
    }

    pub fn last(&self, n: usize) -> ElementQuery<'a> {
        let len = self.elements.len();
        self.slice(len.saturating_sub(n), len)
    }

    pub fn skip(&self, n: usize) -> ElementQuery<'a> {
        self.slice(n, self.elements.len())
    }

    pub fn limit(&self, n: usize) -> ElementQuery<'a> {
        self.first(n)
    }

    pub fn eq(&self, index: usize) -> ElementQuery<'a> {
        match self.get(index) {
            Some(element) => self.derive(vec![element]),
            None => self.derive(Vec::new()),
        }
    }

    pub fn gt(&self, index: usize) -> ElementQuery<'a> {
        self.skip(index + 1)
    }

    pub fn lt(&self, index: usize) -> ElementQuery<'a> {
        self.first(index)
    }

    pub fn even(&self) -> ElementQuery<'a> {
        let out: Vec<_> = self
            .elements
            .iter()
            .step_by(2)
            .copied()
            .collect();
        self.derive(out)
    }

    pub fn odd(&self) -> ElementQuery<'a> {
        let out: Vec<_> = self
            .elements
            .iter()
            .skip(1)
            .step_by(2)
            .copied()
            .collect();
        self.derive(out)
    }

    // ==================== Extraction ====================

    /// Values of the named attribute, skipping elements without it.
    pub fn extract_attributes(&self, name: &str) -> Vec<String> {
        self.elements
            .iter()
            .filter_map(|e| e.attr(name).map(str::to_string))
            .collect()
    }

    pub fn extract_texts(&self) -> Vec<String> {
        self.elements.iter().map(|e| e.text_content()).collect()
    }

    pub fn extract_own_texts(&self) -> Vec<String> {
        self.elements.iter().map(|e| e.own_text()).collect()
    }

    pub fn map<T>(&self, f: impl Fn(ElementRef<'a>) -> T) -> Vec<T> {
        self.elements.iter().map(|e| f(*e)).collect()
    }

    pub fn each(&self, mut f: impl FnMut(usize, ElementRef<'a>)) -> &Self {
        for (i, element) in self.elements.iter().enumerate() {
            f(i, *element);
        }
        self
    }
}

impl<'a> IntoIterator for ElementQuery<'a> {
    type Item = ElementRef<'a>;
    type IntoIter = std::vec::IntoIter<ElementRef<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a, 'q> IntoIterator for &'q ElementQuery<'a> {
    type Item = &'q ElementRef<'a>;
    type IntoIter = std::slice::Iter<'q, ElementRef<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

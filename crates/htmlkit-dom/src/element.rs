//! Element handles and traversal.

use crate::document::{collect_text, Document};
use crate::node::{Attribute, NodeId};

/// A copyable handle to an element node within a document.
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl PartialEq for ElementRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for ElementRef<'_> {}

impl<'a> ElementRef<'a> {
    pub(crate) fn new(doc: &'a Document, id: NodeId) -> Self {
        debug_assert!(doc.node(id).as_element().is_some());
        Self { doc, id }
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    fn data(&self) -> &'a crate::node::ElementData {
        self.doc
            .node(self.id)
            .as_element()
            .unwrap_or_else(|| unreachable!("ElementRef points at a non-element node"))
    }

    pub fn tag_name(&self) -> &'a str {
        &self.data().name
    }

    // ==================== Attributes ====================

    pub fn attrs(&self) -> &'a [Attribute] {
        &self.data().attrs
    }

    /// Attribute value by name, ASCII-case-insensitive.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.data().attr(name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.data().has_attr(name)
    }

    /// The `class` attribute split on ASCII whitespace.
    pub fn class_names(&self) -> impl Iterator<Item = &'a str> {
        self.attr("class")
            .unwrap_or("")
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.class_names().any(|c| c == name)
    }

    // ==================== Text ====================

    /// Concatenation of all descendant text nodes in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self.doc, self.id, &mut out);
        out
    }

    /// Concatenation of only the direct text children.
    pub fn own_text(&self) -> String {
        let mut out = String::new();
        for &child in self.doc.node(self.id).children() {
            if let Some(text) = self.doc.node(child).as_text() {
                out.push_str(text);
            }
        }
        out
    }

    // ==================== Tree navigation ====================

    /// Parent element; `None` when the parent is the document root.
    pub fn parent(&self) -> Option<ElementRef<'a>> {
        let parent = self.doc.node(self.id).parent()?;
        self.doc.element(parent)
    }

    /// Whether the parent of this element is the document itself.
    pub fn is_root(&self) -> bool {
        self.doc.node(self.id).parent() == Some(Document::ROOT)
    }

    /// Ids of all child nodes, in order.
    pub fn child_nodes(&self) -> &'a [NodeId] {
        self.doc.node(self.id).children()
    }

    /// Child elements in order.
    pub fn children(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let doc = self.doc;
        self.child_nodes().iter().filter_map(move |&id| doc.element(id))
    }

    /// All descendant elements in document order, excluding self.
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants::of(self.doc, self.id)
    }

    /// Element siblings of this element (children of the same parent that
    /// are elements), including self, in document order.
    pub fn element_siblings(&self) -> Vec<ElementRef<'a>> {
        let parent = match self.doc.node(self.id).parent() {
            Some(p) => p,
            None => return vec![*self],
        };
        self.doc
            .node(parent)
            .children()
            .iter()
            .filter_map(|&id| self.doc.element(id))
            .collect()
    }

    /// Element siblings excluding self, in document order.
    pub fn siblings(&self) -> Vec<ElementRef<'a>> {
        self.element_siblings()
            .into_iter()
            .filter(|e| e.id != self.id)
            .collect()
    }

    /// Nearest preceding element sibling, skipping text and comments.
    pub fn prev_sibling_element(&self) -> Option<ElementRef<'a>> {
        let siblings = self.element_siblings();
        let pos = siblings.iter().position(|e| e.id == self.id)?;
        if pos == 0 {
            None
        } else {
            Some(siblings[pos - 1])
        }
    }

    /// Nearest following element sibling, skipping text and comments.
    pub fn next_sibling_element(&self) -> Option<ElementRef<'a>> {
        let siblings = self.element_siblings();
        let pos = siblings.iter().position(|e| e.id == self.id)?;
        siblings.get(pos + 1).copied()
    }

    /// Ancestor elements from parent outward to the root element.
    pub fn ancestors(&self) -> Vec<ElementRef<'a>> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(e) = current {
            out.push(e);
            current = e.parent();
        }
        out
    }
}

/// Depth-first, document-order iterator over descendant elements.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Descendants<'a> {
    fn of(doc: &'a Document, root: NodeId) -> Self {
        let mut stack: Vec<NodeId> = doc.node(root).children().to_vec();
        stack.reverse();
        Self { doc, stack }
    }

    pub(crate) fn of_root(doc: &'a Document) -> Self {
        Self::of(doc, Document::ROOT)
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = ElementRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let node = self.doc.node(id);
            for &child in node.children().iter().rev() {
                self.stack.push(child);
            }
            if node.as_element().is_some() {
                return Some(ElementRef::new(self.doc, id));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Attribute;

    fn list_doc() -> Document {
        // <ul><li>1</li><!--c--><li>2</li>text<li>3</li></ul>
        let mut doc = Document::new(String::new());
        let ul = doc.create_element("ul", vec![]);
        doc.append_child(Document::ROOT, ul);
        for (i, text) in ["1", "2", "3"].iter().enumerate() {
            let li = doc.create_element("li", vec![]);
            doc.append_child(ul, li);
            let t = doc.create_text(*text);
            doc.append_child(li, t);
            if i == 0 {
                let c = doc.create_comment("c");
                doc.append_child(ul, c);
            } else if i == 1 {
                let t = doc.create_text("text");
                doc.append_child(ul, t);
            }
        }
        doc
    }

    #[test]
    fn sibling_navigation_skips_non_elements() {
        let doc = list_doc();
        let items: Vec<ElementRef> = doc.root_element().unwrap().children().collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].prev_sibling_element().is_none());
        assert_eq!(items[1].prev_sibling_element(), Some(items[0]));
        assert_eq!(items[1].next_sibling_element(), Some(items[2]));
        assert!(items[2].next_sibling_element().is_none());
    }

    #[test]
    fn siblings_exclude_self() {
        let doc = list_doc();
        let items: Vec<ElementRef> = doc.root_element().unwrap().children().collect();
        let sibs = items[1].siblings();
        assert_eq!(sibs, vec![items[0], items[2]]);
    }

    #[test]
    fn ancestors_walk_to_root() {
        let doc = list_doc();
        let ul = doc.root_element().unwrap();
        let li = ul.children().next().unwrap();
        assert_eq!(li.ancestors(), vec![ul]);
        assert!(ul.is_root());
        assert!(!li.is_root());
    }

    #[test]
    fn attribute_handle_accessors() {
        let mut doc = Document::new(String::new());
        let a = doc.create_element("a", vec![Attribute::new("href", "#")]);
        doc.append_child(Document::ROOT, a);
        let a = doc.root_element().unwrap();
        assert_eq!(a.tag_name(), "a");
        assert!(a.has_attr("HREF"));
        assert_eq!(a.attrs().len(), 1);
    }
}

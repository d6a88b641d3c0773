//! The document arena.

use crate::element::{Descendants, ElementRef};
use crate::node::{Attribute, ElementData, Node, NodeData, NodeId};

/// A parsed HTML document.
///
/// Owns the source text and every node. The tree builder populates it
/// through the `create_*`/`append_*` methods; afterwards it is read-only.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    source: String,
    doctype: Option<String>,
}

impl Document {
    /// Id of the document root node.
    pub const ROOT: NodeId = NodeId(0);

    pub fn new(source: String) -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            source,
            doctype: None,
        }
    }

    /// The original source text this document was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The doctype name, if a `<!DOCTYPE ...>` was seen.
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    pub fn set_doctype(&mut self, name: impl Into<String>) {
        self.doctype = Some(name.into());
    }

    /// Total number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    // ==================== Construction ====================

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn create_element(&mut self, name: impl Into<String>, attrs: Vec<Attribute>) -> NodeId {
        let mut data = ElementData::new(name);
        for attr in attrs {
            data.push_attr(attr);
        }
        self.push_node(Node::new(NodeData::Element(data)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(Node::new(NodeData::Text(text.into())))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(Node::new(NodeData::Comment(text.into())))
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Last child of `parent`, if any.
    pub fn last_child(&self, parent: NodeId) -> Option<NodeId> {
        self.node(parent).children.last().copied()
    }

    /// Append more text to an existing text node. Used to coalesce adjacent
    /// text runs within one parent.
    pub fn extend_text(&mut self, id: NodeId, more: &str) {
        if let NodeData::Text(text) = &mut self.nodes[id.index()].data {
            text.push_str(more);
        }
    }

    // ==================== Element access ====================

    /// View a node as an element, if it is one.
    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.node(id)
            .as_element()
            .map(|_| ElementRef::new(self, id))
    }

    /// The first element child of the root context.
    pub fn root_element(&self) -> Option<ElementRef<'_>> {
        self.node(Self::ROOT)
            .children()
            .iter()
            .find_map(|&id| self.element(id))
    }

    /// All elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        Descendants::of_root(self)
    }

    /// Text of the first `<title>` element, or empty.
    pub fn title(&self) -> String {
        self.elements()
            .find(|e| e.tag_name() == "title")
            .map(|e| e.text_content())
            .unwrap_or_default()
    }

    /// Concatenated text of the whole document.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, Self::ROOT, &mut out);
        out
    }
}

pub(crate) fn collect_text(doc: &Document, id: NodeId, out: &mut String) {
    let node = doc.node(id);
    if let Some(text) = node.as_text() {
        out.push_str(text);
    }
    for &child in node.children() {
        collect_text(doc, child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_has_only_root() {
        let doc = Document::new("x".to_string());
        assert_eq!(doc.node_count(), 1);
        assert!(doc.root_element().is_none());
        assert_eq!(doc.source(), "x");
        assert!(doc.doctype().is_none());
    }

    #[test]
    fn title_finds_first_title_element() {
        let mut doc = Document::new(String::new());
        let html = doc.create_element("html", vec![]);
        doc.append_child(Document::ROOT, html);
        let title = doc.create_element("title", vec![]);
        doc.append_child(html, title);
        let text = doc.create_text("Hello");
        doc.append_child(title, text);
        assert_eq!(doc.title(), "Hello");
    }

    #[test]
    fn extend_text_coalesces() {
        let mut doc = Document::new(String::new());
        let t = doc.create_text("a");
        doc.append_child(Document::ROOT, t);
        doc.extend_text(t, "b");
        assert_eq!(doc.node(t).as_text(), Some("ab"));
    }
}

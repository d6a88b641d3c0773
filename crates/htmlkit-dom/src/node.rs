//! Node storage: ids, attributes, and the tagged node payload.

/// Index of a node within its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Document,
    Element,
    Text,
    Comment,
}

/// A single HTML attribute.
///
/// `has_value` distinguishes `disabled` from `disabled=""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub has_value: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            has_value: true,
        }
    }

    /// A boolean attribute written without `=`, e.g. `<input disabled>`.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
            has_value: false,
        }
    }
}

/// Element payload: tag name plus ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    /// Look up an attribute value. Names compare ASCII-case-insensitively;
    /// the first occurrence wins.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Insert an attribute. A duplicate name overwrites the existing
    /// attribute's value in place rather than appending.
    pub fn push_attr(&mut self, attr: Attribute) {
        if let Some(existing) = self
            .attrs
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(&attr.name))
        {
            existing.value = attr.value;
            existing.has_value = attr.has_value;
        } else {
            self.attrs.push(attr);
        }
    }
}

/// Payload of a node, discriminated by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// One node in the arena. Every node except the document root has exactly
/// one parent; children are ordered in source order.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            data,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self.data {
            NodeData::Document => NodeType::Document,
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::Comment(_) => NodeType::Comment,
        }
    }

    /// `#document`, `#text`, `#comment`, or the element's tag name.
    pub fn node_name(&self) -> &str {
        match &self.data {
            NodeData::Document => "#document",
            NodeData::Element(data) => &data.name,
            NodeData::Text(_) => "#text",
            NodeData::Comment(_) => "#comment",
        }
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_comment(&self) -> Option<&str> {
        match &self.data {
            NodeData::Comment(text) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_names() {
        assert_eq!(Node::new(NodeData::Document).node_name(), "#document");
        assert_eq!(
            Node::new(NodeData::Text("x".into())).node_name(),
            "#text"
        );
        assert_eq!(
            Node::new(NodeData::Comment("x".into())).node_name(),
            "#comment"
        );
        assert_eq!(
            Node::new(NodeData::Element(ElementData::new("div"))).node_name(),
            "div"
        );
    }

    #[test]
    fn boolean_attribute_has_no_value() {
        let attr = Attribute::boolean("disabled");
        assert!(!attr.has_value);
        assert_eq!(attr.value, "");
        assert!(Attribute::new("disabled", "").has_value);
    }

    #[test]
    fn downcasts() {
        let node = Node::new(NodeData::Text("hello".into()));
        assert_eq!(node.as_text(), Some("hello"));
        assert!(node.as_element().is_none());
        assert!(node.as_comment().is_none());
        assert_eq!(node.node_type(), NodeType::Text);
    }
}

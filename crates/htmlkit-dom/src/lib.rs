//! # htmlkit DOM
//!
//! Arena-backed DOM tree produced by the htmlkit parser.
//!
//! A [`Document`] owns every node in a flat arena; parent/child/sibling
//! links are [`NodeId`] indices into it. Once built a document is logically
//! immutable and safe to share across threads for read-only access.
//! [`ElementRef`] is a cheap copyable handle pairing a document reference
//! with a node id; all element-level queries go through it.

mod document;
mod element;
mod node;

pub use document::Document;
pub use element::{Descendants, ElementRef};
pub use node::{Attribute, ElementData, Node, NodeData, NodeId, NodeType};

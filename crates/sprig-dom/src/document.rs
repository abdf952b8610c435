//! An in-memory retained document that sprig roots can render into.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Property
//! assignment follows DOM conventions: `className` becomes the `class`
//! attribute, `true` becomes a bare boolean attribute, `false` and `null`
//! remove the attribute, and callbacks are registered as event handlers
//! instead of being stored as attributes.

use sprig_core::{Callback, Host, HostError, Value, number_text};
use thiserror::Error;

use crate::events::{EventHandlerId, EventRegistry};
use crate::html;

/// Handle to a node of a [`Document`].
///
/// Clearing the root element recycles the whole arena, so handles taken
/// before a rerender do not survive it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub usize);

/// An element node.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

/// Errors raised by document operations.
#[derive(Debug, Error)]
pub enum DomError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("node {0:?} is a text node")]
    NotAnElement(NodeId),
}

impl DomError {
    fn in_operation(self, operation: &'static str) -> HostError {
        HostError::new(operation, self.to_string())
    }
}

/// A retained element tree with an event handler registry.
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
    events: EventRegistry,
    mutations: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document whose root element is a `<body>`.
    pub fn new() -> Self {
        Self::with_root_tag("body")
    }

    pub fn with_root_tag(tag: &str) -> Self {
        Self {
            nodes: vec![NodeData::Element(ElementData {
                tag: tag.to_string(),
                attributes: Vec::new(),
                children: Vec::new(),
            })],
            root: NodeId(0),
            events: EventRegistry::new(),
            mutations: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    pub fn element(&self, id: NodeId) -> Result<&ElementData, DomError> {
        match self.nodes.get(id.0) {
            Some(NodeData::Element(element)) => Ok(element),
            Some(NodeData::Text(_)) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::UnknownNode(id)),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match self.nodes.get_mut(id.0) {
            Some(NodeData::Element(element)) => Ok(element),
            Some(NodeData::Text(_)) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::UnknownNode(id)),
        }
    }

    /// Children of `id`; empty for text nodes and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id.0) {
            Some(NodeData::Element(element)) => &element.children,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .ok()?
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attached elements with the given tag, in document order.
    pub fn get_elements_by_tag_name(&self, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_by_tag(self.root, tag, &mut found);
        found
    }

    fn collect_by_tag(&self, id: NodeId, tag: &str, found: &mut Vec<NodeId>) {
        for child in self.children(id) {
            if let Ok(element) = self.element(*child) {
                if element.tag == tag {
                    found.push(*child);
                }
                self.collect_by_tag(*child, tag, found);
            }
        }
    }

    /// The first attached element with the given tag.
    pub fn query(&self, tag: &str) -> Option<NodeId> {
        self.get_elements_by_tag_name(tag).into_iter().next()
    }

    /// Concatenated text of `id` and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.nodes.get(id.0) {
            Some(NodeData::Text(text)) => text.clone(),
            Some(NodeData::Element(element)) => element
                .children
                .iter()
                .map(|child| self.text_content(*child))
                .collect(),
            None => String::new(),
        }
    }

    /// Serialized children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        html::write_children(self, id, &mut out);
        out
    }

    /// Serialized content of the root element.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root)
    }

    /// The handler registered for `event` on `node`, if any.
    pub fn handler(&self, node: NodeId, event: &str) -> Option<Callback> {
        let id = self.events.find(node, event)?;
        self.events.callback(id).cloned()
    }

    pub fn handler_count(&self) -> usize {
        self.events.len()
    }

    /// Number of mutating host operations applied so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    fn register_handler(&mut self, node: NodeId, event: &str, callback: Callback) -> EventHandlerId {
        self.events.register(node, event, callback)
    }

    fn detach_subtree(&mut self, id: NodeId) {
        self.events.remove_node(id);
        let children = self.children(id).to_vec();
        for child in children {
            self.detach_subtree(child);
        }
    }
}

/// DOM property names that map to a differently named attribute.
fn attribute_name(property: &str) -> &str {
    match property {
        "className" => "class",
        "htmlFor" => "for",
        other => other,
    }
}

fn set_attribute(element: &mut ElementData, name: &str, value: String) {
    match element.attributes.iter_mut().find(|(n, _)| n == name) {
        Some((_, slot)) => *slot = value,
        None => element.attributes.push((name.to_string(), value)),
    }
}

fn remove_attribute(element: &mut ElementData, name: &str) {
    element.attributes.retain(|(n, _)| n != name);
}

impl Host for Document {
    type Element = NodeId;

    fn root_element(&self) -> NodeId {
        self.root
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId, HostError> {
        if tag.is_empty() {
            return Err(HostError::new("create_element", "tag name is empty"));
        }
        self.mutations += 1;
        Ok(self.push_node(NodeData::Element(ElementData {
            tag: tag.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        })))
    }

    fn set_property(&mut self, element: &NodeId, key: &str, value: &Value) -> Result<(), HostError> {
        const OP: &str = "set_property";
        self.mutations += 1;

        if let Value::Callback(callback) = value {
            self.element(*element).map_err(|e| e.in_operation(OP))?;
            let id = self.register_handler(*element, key, callback.clone());
            tracing::trace!(node = ?element, event = key, handler = %id, "registered handler");
            return Ok(());
        }

        let name = attribute_name(key);
        let target = self.element_mut(*element).map_err(|e| e.in_operation(OP))?;
        match value {
            Value::Str(s) => set_attribute(target, name, s.clone()),
            Value::Number(n) => set_attribute(target, name, number_text(*n)),
            Value::Bool(true) => set_attribute(target, name, String::new()),
            Value::Bool(false) | Value::Null => remove_attribute(target, name),
            Value::Node(_) => {
                tracing::warn!(property = key, "descriptor values cannot be set as properties");
            }
            Value::Callback(_) => {}
        }
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        const OP: &str = "append_child";
        if self.node(*child).is_none() {
            return Err(DomError::UnknownNode(*child).in_operation(OP));
        }
        self.mutations += 1;
        self.element_mut(*parent)
            .map_err(|e| e.in_operation(OP))?
            .children
            .push(*child);
        Ok(())
    }

    fn append_text(&mut self, text: &str, into: &NodeId) -> Result<(), HostError> {
        const OP: &str = "append_text";
        self.element(*into).map_err(|e| e.in_operation(OP))?;
        self.mutations += 1;
        let id = self.push_node(NodeData::Text(text.to_string()));
        self.element_mut(*into)
            .map_err(|e| e.in_operation(OP))?
            .children
            .push(id);
        Ok(())
    }

    fn clear(&mut self, element: &NodeId) -> Result<(), HostError> {
        const OP: &str = "clear";
        self.element(*element).map_err(|e| e.in_operation(OP))?;
        self.mutations += 1;

        if *element == self.root {
            // Nothing outside the root is reachable, so the arena can be reset.
            self.nodes.truncate(1);
            self.events.clear();
            if let NodeData::Element(root) = &mut self.nodes[0] {
                root.children.clear();
            }
            return Ok(());
        }

        for child in self.children(*element).to_vec() {
            self.detach_subtree(child);
        }
        self.element_mut(*element)
            .map_err(|e| e.in_operation(OP))?
            .children
            .clear();
        Ok(())
    }
}

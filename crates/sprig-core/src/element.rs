//! Node descriptors and component types.
//!
//! A render pass consumes a tree of [`Node`]s. Descriptors are plain data:
//! building one never touches the host or the hook store.
//!
//! ```ignore
//! use sprig_core::element::*;
//!
//! let tree: Node = Descriptor::tag("div")
//!     .attr("className", "wrapper")
//!     .child(Descriptor::tag("h1").child("Hello!"))
//!     .child(vec![Node::from("a"), Node::from(1)])
//!     .into();
//! ```

use std::fmt;
use std::rc::Rc;

use crate::error::{Render, RenderError};
use crate::hooks::Cx;

/// A node in the descriptor tree.
#[derive(Clone, Debug)]
pub enum Node {
    /// Text, appended as-is.
    Text(String),
    /// A number, appended as its textual form.
    Number(f64),
    /// An ordered sequence rendered member by member into the same container.
    Fragment(Vec<Node>),
    /// A host tag, component or Suspense boundary.
    Element(Rc<Descriptor>),
}

impl Node {
    /// A node that renders nothing.
    pub fn empty() -> Self {
        Node::Fragment(Vec::new())
    }
}

/// Text appended for a number node.
///
/// Non-finite values print as `Infinity`, `-Infinity` and `NaN`, and
/// negative zero prints as `0`.
pub fn number_text(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<f64> for Node {
    fn from(n: f64) -> Self {
        Node::Number(n)
    }
}

impl From<i32> for Node {
    fn from(n: i32) -> Self {
        Node::Number(f64::from(n))
    }
}

impl From<u32> for Node {
    fn from(n: u32) -> Self {
        Node::Number(f64::from(n))
    }
}

/// Integers beyond 2^53 in magnitude are rounded to the nearest `f64`.
impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Number(n as f64)
    }
}

/// Values beyond 2^53 are rounded to the nearest `f64`.
impl From<usize> for Node {
    fn from(n: usize) -> Self {
        Node::Number(n as f64)
    }
}

impl From<Vec<Node>> for Node {
    fn from(nodes: Vec<Node>) -> Self {
        Node::Fragment(nodes)
    }
}

impl From<Descriptor> for Node {
    fn from(descriptor: Descriptor) -> Self {
        Node::Element(Rc::new(descriptor))
    }
}

/// What a descriptor renders as.
#[derive(Clone)]
pub enum Kind {
    /// A host element, created through the host interface.
    Tag(String),
    /// A user component, evaluated during the render pass.
    Component(Component),
    /// A boundary catching suspension from its children.
    Suspense,
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Tag(tag) => write!(f, "Tag({tag})"),
            Kind::Component(component) => write!(f, "Component({})", component.name()),
            Kind::Suspense => f.write_str("Suspense"),
        }
    }
}

impl From<&str> for Kind {
    fn from(tag: &str) -> Self {
        Kind::Tag(tag.to_string())
    }
}

impl From<String> for Kind {
    fn from(tag: String) -> Self {
        Kind::Tag(tag)
    }
}

impl From<Component> for Kind {
    fn from(component: Component) -> Self {
        Kind::Component(component)
    }
}

type RenderFn = dyn Fn(&Cx, &Props) -> Render<Node>;

/// A named component function.
///
/// Components receive the render context handle and their props, and return
/// the subtree to render next. Hooks are reached through the [`Cx`].
#[derive(Clone)]
pub struct Component {
    name: Rc<str>,
    render: Rc<RenderFn>,
}

impl Component {
    pub fn new<F>(name: &str, render: F) -> Self
    where
        F: Fn(&Cx, &Props) -> Render<Node> + 'static,
    {
        Self {
            name: Rc::from(name),
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, cx: &Cx, props: &Props) -> Render<Node> {
        (self.render)(cx, props)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

/// Shorthand for [`Component::new`].
pub fn component<F>(name: &str, render: F) -> Component
where
    F: Fn(&Cx, &Props) -> Render<Node> + 'static,
{
    Component::new(name, render)
}

/// Event handler stored as an attribute value.
///
/// Handlers receive the event payload and may fail, e.g. when the state
/// update they trigger aborts the rerender.
#[derive(Clone)]
pub struct Callback(pub Rc<dyn Fn(Value) -> Result<(), RenderError>>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<(), RenderError> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn invoke(&self, payload: Value) -> Result<(), RenderError> {
        (self.0)(payload)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(...)")
    }
}

/// An attribute value.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Str(String),
    Number(f64),
    Bool(bool),
    Callback(Callback),
    Node(Node),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Value::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Callback> for Value {
    fn from(cb: Callback) -> Self {
        Value::Callback(cb)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<Descriptor> for Value {
    fn from(descriptor: Descriptor) -> Self {
        Value::Node(descriptor.into())
    }
}

/// Attributes of a descriptor, in insertion order, plus its children.
#[derive(Clone, Debug, Default)]
pub struct Props {
    attributes: Vec<(String, Value)>,
    children: Vec<Node>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set an attribute, replacing any previous value for `key`.
    ///
    /// The `children` key is routed into the child list. A text or number
    /// `fallback` is stored as a node so Suspense boundaries can render it.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let mut value = value.into();
        if key == "children" {
            self.children = match value {
                Value::Node(Node::Fragment(nodes)) => nodes,
                Value::Node(node) => vec![node],
                Value::Str(text) => vec![Node::Text(text)],
                Value::Number(n) => vec![Node::Number(n)],
                _ => Vec::new(),
            };
            return;
        }
        if key == "fallback" {
            value = match value {
                Value::Str(text) => Value::Node(Node::Text(text)),
                Value::Number(n) => Value::Node(Node::Number(n)),
                other => other,
            };
        }
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_number)
    }

    pub fn callback(&self, key: &str) -> Option<&Callback> {
        self.get(key).and_then(Value::as_callback)
    }

    pub fn node(&self, key: &str) -> Option<&Node> {
        self.get(key).and_then(Value::as_node)
    }

    /// Every attribute except `children`, in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn set_children(&mut self, children: Vec<Node>) {
        self.children = children;
    }
}

impl<K, V> FromIterator<(K, V)> for Props
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Props::new();
        for (key, value) in iter {
            props.insert(key, value);
        }
        props
    }
}

/// One node to render: what it is, its attributes and its children.
#[derive(Clone, Debug)]
pub struct Descriptor {
    pub kind: Kind,
    pub props: Props,
}

impl Descriptor {
    pub fn new(kind: impl Into<Kind>) -> Self {
        Self {
            kind: kind.into(),
            props: Props::new(),
        }
    }

    pub fn tag(name: &str) -> Self {
        Self::new(name)
    }

    pub fn component(component: Component) -> Self {
        Self::new(component)
    }

    pub fn suspense() -> Self {
        Self::new(Kind::Suspense)
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key, value);
        self
    }

    /// Node rendered by a Suspense boundary while its children are suspended.
    pub fn fallback(self, fallback: impl Into<Node>) -> Self {
        self.attr("fallback", Value::Node(fallback.into()))
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.props.children.push(child.into());
        self
    }

    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.props
            .children
            .extend(children.into_iter().map(Into::into));
        self
    }
}

/// Build a descriptor node from a kind, attributes and a child list.
///
/// The child list always replaces any `children` attribute.
pub fn create_element<I>(kind: impl Into<Kind>, attributes: Props, children: I) -> Node
where
    I: IntoIterator<Item = Node>,
{
    let mut props = attributes;
    props.set_children(children.into_iter().collect());
    let descriptor = Descriptor {
        kind: kind.into(),
        props,
    };
    tracing::trace!(kind = ?descriptor.kind, children = descriptor.props.children.len(), "create_element");
    descriptor.into()
}

/// A Suspense boundary around `children`, rendering `fallback` while suspended.
pub fn suspense<I>(fallback: Option<Node>, children: I) -> Node
where
    I: IntoIterator<Item = Node>,
{
    let mut props = Props::new();
    if let Some(fallback) = fallback {
        props.insert("fallback", Value::Node(fallback));
    }
    create_element(Kind::Suspense, props, children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_list_replaces_children_attribute() {
        let props = Props::new()
            .with("id", "main")
            .with("children", Node::from("ignored"));
        let node = create_element("div", props, vec![Node::from("a"), Node::from(2)]);

        let Node::Element(descriptor) = node else {
            panic!("expected an element");
        };
        assert!(matches!(descriptor.kind, Kind::Tag(ref t) if t == "div"));
        assert_eq!(descriptor.props.children().len(), 2);
        assert!(matches!(descriptor.props.children()[0], Node::Text(ref t) if t == "a"));
        assert_eq!(descriptor.props.str("id"), Some("main"));
        assert!(descriptor.props.get("children").is_none());
    }

    #[test]
    fn attributes_keep_insertion_order_and_overwrite_in_place() {
        let props = Props::new()
            .with("b", 1)
            .with("a", "x")
            .with("b", 2);

        let keys: Vec<_> = props.attributes().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(props.number("b"), Some(2.0));
    }

    #[test]
    fn suspense_carries_fallback() {
        let node = suspense(Some(Node::from("Loading…")), [Node::from("body")]);
        let Node::Element(descriptor) = node else {
            panic!("expected an element");
        };
        assert!(matches!(descriptor.kind, Kind::Suspense));
        assert!(matches!(descriptor.props.node("fallback"), Some(Node::Text(t)) if t == "Loading…"));
    }

    #[test]
    fn primitive_fallback_is_stored_as_node() {
        let props = Props::new().with("fallback", "Loading…");
        assert!(matches!(props.node("fallback"), Some(Node::Text(t)) if t == "Loading…"));

        let props = Props::new().with("fallback", 0);
        assert!(matches!(props.node("fallback"), Some(Node::Number(n)) if *n == 0.0));
    }

    #[test]
    fn number_text_matches_script_formatting() {
        assert_eq!(number_text(2.5), "2.5");
        assert_eq!(number_text(3.0), "3");
        assert_eq!(number_text(-0.0), "0");
        assert_eq!(number_text(f64::INFINITY), "Infinity");
        assert_eq!(number_text(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_text(f64::NAN), "NaN");
    }

    #[test]
    fn builder_produces_nested_tree() {
        let node: Node = Descriptor::tag("ul")
            .children(["a", "b"].map(|item| Descriptor::tag("li").child(item)))
            .into();
        let Node::Element(descriptor) = node else {
            panic!("expected an element");
        };
        assert_eq!(descriptor.props.children().len(), 2);
    }

    #[test]
    fn callback_invokes_with_payload() {
        let cb = Callback::new(|payload| {
            assert_eq!(payload.as_str(), Some("typed"));
            Ok(())
        });
        assert!(cb.invoke(Value::from("typed")).is_ok());
    }
}

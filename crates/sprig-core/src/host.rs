//! The capability interface a render target implements.

use crate::element::Value;
use crate::error::HostError;

/// Output operations the reconciler needs from a render target.
///
/// The reconciler never looks inside [`Host::Element`]; it only hands
/// elements back to these methods. Any error aborts the current render pass.
pub trait Host {
    /// Handle to an element owned by the host.
    type Element: Clone;

    /// The element a root renders into.
    fn root_element(&self) -> Self::Element;

    fn create_element(&mut self, tag: &str) -> Result<Self::Element, HostError>;

    fn set_property(
        &mut self,
        element: &Self::Element,
        key: &str,
        value: &Value,
    ) -> Result<(), HostError>;

    /// Append `child` as the last child of `parent`.
    fn append_child(&mut self, parent: &Self::Element, child: &Self::Element)
    -> Result<(), HostError>;

    /// Append a text node as the last child of `into`.
    fn append_text(&mut self, text: &str, into: &Self::Element) -> Result<(), HostError>;

    /// Remove every child of `element`.
    fn clear(&mut self, element: &Self::Element) -> Result<(), HostError>;
}

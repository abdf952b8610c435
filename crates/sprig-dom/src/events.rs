//! Event handling infrastructure for documents.
//!
//! This module provides the registry that maps element nodes to the
//! [`Callback`]s set on them as properties (`onclick`, `onchange`, ...).

use std::collections::HashMap;

use sprig_core::Callback;

use crate::document::NodeId;

/// Unique identifier for a registered event handler.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EventHandlerId(pub usize);

impl std::fmt::Display for EventHandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Registered {
    node: NodeId,
    event: String,
    callback: Callback,
}

/// Registry that maps event handler IDs to callbacks.
#[derive(Default)]
pub struct EventRegistry {
    handlers: HashMap<EventHandlerId, Registered>,
    next_id: usize,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event` on `node` and return its ID.
    ///
    /// A node holds one handler per event; registering again replaces it.
    pub fn register(&mut self, node: NodeId, event: &str, callback: Callback) -> EventHandlerId {
        if let Some(existing) = self.find(node, event) {
            self.handlers.remove(&existing);
        }
        let id = EventHandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.insert(
            id,
            Registered {
                node,
                event: event.to_string(),
                callback,
            },
        );
        id
    }

    /// Find the handler registered for `event` on `node`.
    pub fn find(&self, node: NodeId, event: &str) -> Option<EventHandlerId> {
        self.handlers
            .iter()
            .find(|(_, r)| r.node == node && r.event == event)
            .map(|(id, _)| *id)
    }

    pub fn callback(&self, id: EventHandlerId) -> Option<&Callback> {
        self.handlers.get(&id).map(|r| &r.callback)
    }

    /// Drop every handler attached to `node`.
    pub fn remove_node(&mut self, node: NodeId) {
        self.handlers.retain(|_, r| r.node != node);
    }

    /// Clear all registered handlers and reset ID generation.
    pub fn clear(&mut self) {
        self.handlers.clear();
        self.next_id = 0;
    }

    /// Get the number of registered handlers (for debugging).
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn noop() -> Callback {
        Callback::new(|_| Ok(()))
    }

    #[test]
    fn test_register_and_dispatch() {
        let mut registry = EventRegistry::new();
        let called = Rc::new(Cell::new(false));
        let called_clone = called.clone();

        let id = registry.register(
            NodeId(1),
            "onclick",
            Callback::new(move |_| {
                called_clone.set(true);
                Ok(())
            }),
        );

        assert!(!called.get());
        let callback = registry.callback(id).unwrap();
        assert!(callback.invoke(sprig_core::Value::Null).is_ok());
        assert!(called.get());
    }

    #[test]
    fn test_register_replaces_same_event() {
        let mut registry = EventRegistry::new();
        let first = registry.register(NodeId(1), "onclick", noop());
        let second = registry.register(NodeId(1), "onclick", noop());
        registry.register(NodeId(1), "onchange", noop());

        assert_ne!(first, second);
        assert!(registry.callback(first).is_none());
        assert_eq!(registry.find(NodeId(1), "onclick"), Some(second));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_node_and_clear() {
        let mut registry = EventRegistry::new();
        registry.register(NodeId(1), "onclick", noop());
        registry.register(NodeId(2), "onclick", noop());

        registry.remove_node(NodeId(1));
        assert_eq!(registry.len(), 1);
        assert!(registry.find(NodeId(1), "onclick").is_none());

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.register(NodeId(3), "onclick", noop()), EventHandlerId(0));
    }
}

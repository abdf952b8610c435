//! Error types and the tagged render outcome.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::promise::{PromiseId, Thenable};

/// Failure reported by a [`Host`](crate::host::Host) implementation.
#[derive(Debug, Clone, Error)]
#[error("host operation `{operation}` failed: {message}")]
pub struct HostError {
    pub operation: &'static str,
    pub message: String,
}

impl HostError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Fatal errors that abort a render pass.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// A hook was used while no render pass was running.
    #[error("`{hook}` called outside of an active render context")]
    NoActiveContext { hook: &'static str },

    /// A component suspended and no Suspense boundary caught it.
    #[error("promise {promise} suspended rendering with no enclosing Suspense boundary")]
    UnhandledSuspension { promise: PromiseId },

    /// A promise consumed with `use_promise` was rejected.
    #[error("promise {promise} rejected: {reason}")]
    Rejected { promise: PromiseId, reason: String },

    /// A hook slot holds a value of a different type than the one requested.
    #[error("hook slot {index} holds `{found}` but `{expected}` was requested")]
    HookTypeMismatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// A cached settlement does not hold the promise's value type.
    #[error("promise {promise} resolved to a value that is not `{expected}`")]
    PromiseTypeMismatch {
        promise: PromiseId,
        expected: &'static str,
    },

    /// A state setter was called while a render pass was running.
    #[error("state update requested while a render pass is in progress")]
    ReentrantUpdate,

    /// The host was borrowed elsewhere, e.g. through `Root::host`, when a
    /// pass needed it.
    #[error("host is borrowed elsewhere; render pass skipped")]
    HostBusy,

    /// Deferred rerenders kept scheduling more passes.
    #[error("root kept requesting rerenders after {passes} passes")]
    RenderLoop { passes: usize },

    /// A component body failed.
    #[error("component `{name}` failed: {message}")]
    Component { name: String, message: String },

    #[error(transparent)]
    Host(#[from] HostError),
}

impl RenderError {
    /// Convenience constructor for failures raised inside component bodies.
    pub fn component(name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Component {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

/// Suspension signal carrying the awaitable a component is waiting on.
#[derive(Clone)]
pub struct Suspended {
    awaitable: Rc<dyn Thenable>,
}

impl Suspended {
    pub fn new(awaitable: Rc<dyn Thenable>) -> Self {
        Self { awaitable }
    }

    pub fn promise(&self) -> PromiseId {
        self.awaitable.id()
    }

    pub fn awaitable(&self) -> &Rc<dyn Thenable> {
        &self.awaitable
    }
}

impl fmt::Debug for Suspended {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspended")
            .field("promise", &self.awaitable.id())
            .finish()
    }
}

/// Why evaluation of a subtree stopped early.
///
/// Only [`Interrupt::Suspend`] is ever caught, and only by a Suspense
/// boundary. Every other failure aborts the pass.
#[derive(Debug, Clone)]
pub enum Interrupt {
    Suspend(Suspended),
    Error(RenderError),
}

impl From<RenderError> for Interrupt {
    fn from(err: RenderError) -> Self {
        Interrupt::Error(err)
    }
}

impl From<HostError> for Interrupt {
    fn from(err: HostError) -> Self {
        Interrupt::Error(RenderError::Host(err))
    }
}

impl From<Suspended> for Interrupt {
    fn from(signal: Suspended) -> Self {
        Interrupt::Suspend(signal)
    }
}

impl Interrupt {
    /// Collapse into a fatal error once the signal has left every boundary.
    pub fn into_fatal(self) -> RenderError {
        match self {
            Interrupt::Suspend(signal) => RenderError::UnhandledSuspension {
                promise: signal.promise(),
            },
            Interrupt::Error(err) => err,
        }
    }
}

/// Outcome of evaluating a hook or a component.
pub type Render<T> = Result<T, Interrupt>;

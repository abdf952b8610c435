//! Core types for sprig: descriptors, hooks, promises and the reconciler.

pub mod config;
pub mod element;
pub mod error;
pub mod hooks;
pub mod host;
pub mod promise;
pub mod reconciler;

pub use config::RootConfig;
pub use element::{
    Callback, Component, Descriptor, Kind, Node, Props, Value, component, create_element,
    number_text, suspense,
};
pub use error::{HostError, Interrupt, Render, RenderError, Suspended};
pub use hooks::{Cx, HookMeta, RerenderHandle, SetState};
pub use host::Host;
pub use promise::{Promise, PromiseId, Resolver, Settlement, Thenable};
pub use reconciler::{Root, create_container, create_container_with};

pub mod prelude {
    //! Common imports for writing components.
    pub use crate::element::{
        Callback, Component, Descriptor, Node, Props, Value, component, create_element, suspense,
    };
    pub use crate::error::{Render, RenderError};
    pub use crate::hooks::{Cx, SetState};
    pub use crate::promise::{Promise, Resolver};
    pub use crate::reconciler::{Root, create_container};
}

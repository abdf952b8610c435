//! Sprig - a minimal hook-and-suspense UI rendering engine.
//!
//! Components are plain functions of a render context and their props.
//! They describe output as a tree of descriptors, keep state in positional
//! hook slots, and read async data with `use_promise`, which suspends the
//! nearest `Suspense` boundary until the data arrives.
//!
//! # Quick Start
//!
//! ```ignore
//! use sprig::prelude::*;
//!
//! let counter = component("Counter", |cx, _| {
//!     let (count, set_count) = cx.use_state(0)?;
//!     Ok(Descriptor::tag("button")
//!         .attr("onClick", Callback::new(move |_| set_count.set(count + 1)))
//!         .child(count)
//!         .into())
//! });
//!
//! let root = sprig::create_root();
//! root.render(Descriptor::component(counter))?;
//! println!("{}", root.host().to_html());
//! ```
//!
//! ## Rules of Hooks
//!
//! Hooks must be called in the **same order** on every render:
//!
//! - Call hooks at the top level of a component
//! - Don't call hooks inside conditionals or loops
//! - Don't call hooks in event handlers
//!
//! See [`sprig_core::hooks`] for details.

mod runtime;

pub use runtime::{create_root, create_root_with, init_tracing, spawn_promise};

pub mod prelude {
    //! Common imports for sprig applications.
    pub use crate::runtime::{create_root, spawn_promise};
    pub use sprig_core::prelude::*;
    pub use sprig_dom::{Document, NodeId, dispatch};
}

// Re-export core types at crate root
pub use sprig_core::{
    Callback, Component, Cx, Descriptor, Node, Promise, Props, Render, RenderError, Resolver,
    Root, RootConfig, Value, component, create_element, suspense,
};
pub use sprig_dom::{Document, NodeId, dispatch};

pub use sprig_core as core;
pub use sprig_dom as dom;

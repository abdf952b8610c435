//! The render loop: walks a descriptor tree into host mutations.
//!
//! Every pass is a full, synchronous, depth-first walk from the host's root
//! element. There is no diffing: a rerender clears the root element and
//! rebuilds all output.
//!
//! Node kinds are handled in this order:
//!
//! 1. text and numbers are appended as text
//! 2. fragments render each member, in order, into the same container
//! 3. Suspense boundaries render their children, or their fallback when a
//!    child suspends
//! 4. components are evaluated and their result is rendered
//! 5. host tags become host elements

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::config::RootConfig;
use crate::element::{Component, Kind, Node, Props, number_text};
use crate::error::{Interrupt, Render, RenderError, Suspended};
use crate::hooks::{Cx, RerenderHandle};
use crate::host::Host;

/// A mounted render target.
///
/// Cloning a `Root` yields another handle to the same root.
pub struct Root<H: Host> {
    inner: Rc<RootInner<H>>,
}

struct RootInner<H: Host> {
    host: RefCell<H>,
    cx: Cx,
    tree: RefCell<Option<Node>>,
    config: RootConfig,
    passes: Cell<usize>,
    needs_render: Cell<bool>,
    last_error: RefCell<Option<RenderError>>,
}

/// Create a root rendering into `host`.
pub fn create_container<H: Host + 'static>(host: H) -> Root<H> {
    create_container_with(host, RootConfig::default())
}

/// Create a root with explicit configuration.
pub fn create_container_with<H: Host + 'static>(host: H, config: RootConfig) -> Root<H> {
    Root {
        inner: Rc::new(RootInner {
            host: RefCell::new(host),
            cx: Cx::new(),
            tree: RefCell::new(None),
            config,
            passes: Cell::new(0),
            needs_render: Cell::new(false),
            last_error: RefCell::new(None),
        }),
    }
}

impl<H: Host> Clone for Root<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H: Host> fmt::Debug for Root<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("label", &self.inner.config.label)
            .field("passes", &self.inner.passes.get())
            .field("mounted", &self.inner.tree.borrow().is_some())
            .finish()
    }
}

impl<H: Host + 'static> Root<H> {
    /// Mount `node`, or replace the mounted tree and rebuild all output.
    pub fn render(&self, node: impl Into<Node>) -> Result<(), RenderError> {
        let was_mounted = self.inner.tree.replace(Some(node.into())).is_some();
        self.run(was_mounted)
    }

    /// Re-render the mounted tree from scratch.
    ///
    /// Called during a pass (from a promise continuation), the request is
    /// deferred until the running pass has finished.
    pub fn rerender(&self) -> Result<(), RenderError> {
        if self.inner.tree.borrow().is_none() {
            tracing::debug!(root = %self.inner.config.label, "rerender before mount ignored");
            return Ok(());
        }
        self.run(true)
    }

    /// Handle that re-renders this root. Holds the root weakly.
    pub fn rerender_handle(&self) -> RerenderHandle {
        let root = Rc::downgrade(&self.inner);
        RerenderHandle::new(move || match root.upgrade() {
            Some(inner) => Root { inner }.rerender(),
            None => {
                tracing::debug!("rerender requested after root was dropped");
                Ok(())
            }
        })
    }

    fn run(&self, clear: bool) -> Result<(), RenderError> {
        if self.inner.cx.is_rendering() {
            tracing::debug!(root = %self.inner.config.label, "rerender requested mid-pass, deferring");
            self.inner.needs_render.set(true);
            return Ok(());
        }

        let result = self.run_passes(clear);
        if let Err(err) = &result {
            self.inner.last_error.replace(Some(err.clone()));
        }
        result
    }

    fn run_passes(&self, mut clear: bool) -> Result<(), RenderError> {
        let mut deferred = 0;
        loop {
            self.inner.needs_render.set(false);
            self.pass(clear)?;
            if !self.inner.needs_render.get() {
                return Ok(());
            }
            deferred += 1;
            if deferred > self.inner.config.max_deferred_passes {
                self.inner.needs_render.set(false);
                return Err(RenderError::RenderLoop { passes: deferred });
            }
            clear = true;
        }
    }

    fn pass(&self, clear: bool) -> Result<(), RenderError> {
        let Some(tree) = self.inner.tree.borrow().clone() else {
            return Ok(());
        };

        let mut host = self
            .inner
            .host
            .try_borrow_mut()
            .map_err(|_| RenderError::HostBusy)?;

        let pass = self.inner.passes.get() + 1;
        self.inner.passes.set(pass);
        let span = tracing::debug_span!("render_pass", root = %self.inner.config.label, pass);
        let _enter = span.enter();
        let root_element = host.root_element();

        let mut guard = PassGuard::begin(&self.inner.cx);
        let mut walker = Walker {
            host: &mut *host,
            cx: &self.inner.cx,
            root_rerender: self.rerender_handle(),
            suspended: false,
        };

        let outcome = walker.mount(&tree, &root_element, clear);
        guard.complete = outcome.is_ok() && !walker.suspended;
        tracing::debug!(suspended = walker.suspended, ok = outcome.is_ok(), "render pass finished");
        outcome.map_err(Interrupt::into_fatal)
    }
}

impl<H: Host> Root<H> {
    /// Borrow the host, e.g. to inspect rendered output.
    ///
    /// Panics if called while a render pass of this root is running.
    pub fn host(&self) -> Ref<'_, H> {
        self.inner.host.borrow()
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.inner.host.borrow())
    }

    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.inner.host.borrow_mut())
    }

    /// The render context shared by every component of this root.
    pub fn context(&self) -> &Cx {
        &self.inner.cx
    }

    pub fn config(&self) -> &RootConfig {
        &self.inner.config
    }

    /// Number of render passes run so far.
    pub fn render_count(&self) -> usize {
        self.inner.passes.get()
    }

    /// The error of the most recent failed render, if any.
    pub fn last_error(&self) -> Option<RenderError> {
        self.inner.last_error.borrow().clone()
    }

    pub fn take_error(&self) -> Option<RenderError> {
        self.inner.last_error.take()
    }
}

/// Ends the hook pass even when a component panics.
struct PassGuard<'a> {
    cx: &'a Cx,
    complete: bool,
}

impl<'a> PassGuard<'a> {
    fn begin(cx: &'a Cx) -> Self {
        cx.begin_pass();
        Self {
            cx,
            complete: false,
        }
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.cx.end_pass(self.complete);
    }
}

/// Restores the previous rerender binding when a component returns.
struct RerenderBinding<'a> {
    cx: &'a Cx,
    previous: Option<RerenderHandle>,
}

impl<'a> RerenderBinding<'a> {
    fn bind(cx: &'a Cx, handle: RerenderHandle) -> Self {
        let previous = cx.bind_rerender(Some(handle));
        Self { cx, previous }
    }
}

impl Drop for RerenderBinding<'_> {
    fn drop(&mut self) {
        self.cx.bind_rerender(self.previous.take());
    }
}

struct Walker<'a, H: Host> {
    host: &'a mut H,
    cx: &'a Cx,
    root_rerender: RerenderHandle,
    /// Set once any boundary in this pass caught a suspension.
    suspended: bool,
}

impl<H: Host> Walker<'_, H> {
    fn mount(&mut self, tree: &Node, root: &H::Element, clear: bool) -> Render<()> {
        if clear {
            self.host.clear(root)?;
        }
        self.render(tree, root)
    }

    fn render(&mut self, node: &Node, container: &H::Element) -> Render<()> {
        match node {
            Node::Text(text) => self.host.append_text(text, container)?,
            Node::Number(n) => self.host.append_text(&number_text(*n), container)?,
            Node::Fragment(members) => self.render_all(members, container)?,
            Node::Element(descriptor) => match &descriptor.kind {
                Kind::Suspense => self.render_suspense(&descriptor.props, container)?,
                Kind::Component(component) => {
                    self.render_component(component, &descriptor.props, container)?
                }
                Kind::Tag(tag) => self.render_host(tag, &descriptor.props, container)?,
            },
        }
        Ok(())
    }

    fn render_all(&mut self, nodes: &[Node], container: &H::Element) -> Render<()> {
        for node in nodes {
            self.render(node, container)?;
        }
        Ok(())
    }

    fn render_suspense(&mut self, props: &Props, container: &H::Element) -> Render<()> {
        match self.render_all(props.children(), container) {
            Err(Interrupt::Suspend(signal)) => {
                tracing::debug!(promise = %signal.promise(), "suspended, rendering fallback");
                self.suspended = true;
                self.subscribe(&signal);
                match props.node("fallback") {
                    Some(fallback) => self.render(fallback, container),
                    None => Ok(()),
                }
            }
            outcome => outcome,
        }
    }

    /// Cache the settlement and re-render the root once the awaitable settles.
    fn subscribe(&self, signal: &Suspended) {
        let promise = signal.promise();
        if !self.cx.subscribe(promise) {
            return;
        }

        let cx = self.cx.downgrade();
        let rerender = self.root_rerender.clone();
        signal.awaitable().on_settle(Box::new(move |settlement| {
            let Some(cx) = cx.upgrade() else {
                return;
            };
            cx.store_settlement(promise, settlement);
            if let Err(err) = rerender.call() {
                tracing::error!(%promise, %err, "rerender after promise settled failed");
            }
        }));
    }

    fn render_component(
        &mut self,
        component: &Component,
        props: &Props,
        container: &H::Element,
    ) -> Render<()> {
        let child = {
            let _binding = RerenderBinding::bind(self.cx, self.root_rerender.clone());
            tracing::trace!(component = component.name(), "evaluating component");
            component.call(self.cx, props)?
        };
        self.render(&child, container)
    }

    fn render_host(&mut self, tag: &str, props: &Props, container: &H::Element) -> Render<()> {
        let element = self.host.create_element(tag)?;
        for (key, value) in props.attributes() {
            self.host.set_property(&element, key, value)?;
        }
        self.render_all(props.children(), &element)?;
        self.host.append_child(container, &element)?;
        Ok(())
    }
}

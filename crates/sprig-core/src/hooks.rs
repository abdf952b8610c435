//! React-style hooks backed by positional slots.
//!
//! Every root owns one render context: an append-only list of hook slots, a
//! cursor that is reset to 0 at the start of each render pass, the resolution
//! cache for promises, and the rerender handle active for the component
//! currently evaluating. Components reach it through the [`Cx`] handle they
//! are called with.
//!
//! # Quick Start
//!
//! ```ignore
//! use sprig_core::prelude::*;
//!
//! let counter = component("Counter", |cx, _props| {
//!     let (count, set_count) = cx.use_state(0)?;
//!     Ok(Descriptor::tag("button")
//!         .attr("onclick", Callback::new(move |_| set_count.set(count + 1)))
//!         .child("Count: ")
//!         .child(count)
//!         .into())
//! });
//! ```
//!
//! # Rules of Hooks
//!
//! Hooks are identified by their position in the call sequence, not by any
//! name or key. They must be called in the **exact same order** on every
//! render. Calling a hook conditionally shifts every later slot by one:
//!
//! ```ignore
//! let label = if show_label { cx.use_state("label")?.0 } else { "" }; // WRONG
//! let (count, _) = cx.use_state(0)?; // reads the label's slot when shown
//! ```
//!
//! This is not guarded. A changed hook count is logged with `tracing::warn!`
//! and state stays misaligned; a slot read as a different Rust type fails the
//! pass with [`RenderError::HookTypeMismatch`].
//!
//! # Errors
//!
//! Hooks used after the render pass that handed out the [`Cx`] has finished
//! fail with [`RenderError::NoActiveContext`]:
//!
//! ```text
//! `use_state` called outside of an active render context
//! ```

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::error::{Interrupt, Render, RenderError, Suspended};
use crate::promise::{Promise, PromiseId, ResolutionCache, Settlement, Thenable};

// ============================================================================
// Hook Store
// ============================================================================

/// Metadata about a hook slot for debugging purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookMeta {
    /// The hook function name (e.g., "use_state")
    pub hook_type: &'static str,
    /// The type of value stored (from std::any::type_name)
    pub value_type: &'static str,
}

struct HookEntry {
    value: Box<dyn Any>,
    meta: HookMeta,
}

enum Claim<T> {
    Occupied(usize, T),
    Vacant(usize),
}

/// Slot storage for one root.
///
/// Slots are appended in the order hooks are first reached and are never
/// removed for the lifetime of the root.
struct HookStore {
    /// Stored hook values, indexed by call order
    hooks: Vec<HookEntry>,
    /// Current hook index during rendering (reset to 0 each pass)
    cursor: usize,
    /// Whether a render pass is running
    is_rendering: bool,
    /// Hook count of the last pass that ran to completion
    expected_count: Option<usize>,
    /// Number of finished passes
    render_count: usize,
}

impl HookStore {
    fn new() -> Self {
        Self {
            hooks: Vec::new(),
            cursor: 0,
            is_rendering: false,
            expected_count: None,
            render_count: 0,
        }
    }

    fn begin_pass(&mut self) {
        self.cursor = 0;
        self.is_rendering = true;
    }

    fn end_pass(&mut self, complete: bool) {
        if complete {
            if let Some(expected) = self.expected_count
                && expected != self.cursor
            {
                tracing::warn!(
                    previous = expected,
                    current = self.cursor,
                    pass = self.render_count,
                    "hook count changed between renders; hook state is now misaligned"
                );
            }
            self.expected_count = Some(self.cursor);
        }
        self.is_rendering = false;
        self.render_count += 1;
    }

    fn ensure_rendering(&self, hook: &'static str) -> Result<(), RenderError> {
        if self.is_rendering {
            Ok(())
        } else {
            Err(RenderError::NoActiveContext { hook })
        }
    }

    /// Advance the cursor and look at the slot it pointed to.
    fn claim<T: Clone + 'static>(&mut self, hook: &'static str) -> Result<Claim<T>, RenderError> {
        self.ensure_rendering(hook)?;

        let index = self.cursor;
        self.cursor += 1;

        match self.hooks.get(index) {
            Some(entry) => match entry.value.downcast_ref::<T>() {
                Some(value) => Ok(Claim::Occupied(index, value.clone())),
                None => Err(RenderError::HookTypeMismatch {
                    index,
                    expected: type_name::<T>(),
                    found: entry.meta.value_type,
                }),
            },
            None => Ok(Claim::Vacant(index)),
        }
    }

    fn fill<T: 'static>(&mut self, index: usize, hook_type: &'static str, value: T) {
        let entry = HookEntry {
            value: Box::new(value),
            meta: HookMeta {
                hook_type,
                value_type: type_name::<T>(),
            },
        };
        if index < self.hooks.len() {
            self.hooks[index] = entry;
        } else {
            self.hooks.push(entry);
        }
    }

    fn write<T: 'static>(&mut self, index: usize, value: T) {
        match self.hooks.get_mut(index) {
            Some(entry) => entry.value = Box::new(value),
            None => tracing::warn!(index, "state update for a slot that was never claimed"),
        }
    }
}

// ============================================================================
// Rerender Handle
// ============================================================================

/// Requests a full synchronous re-render of a root.
#[derive(Clone)]
pub struct RerenderHandle(Rc<dyn Fn() -> Result<(), RenderError>>);

impl RerenderHandle {
    pub fn new<F: Fn() -> Result<(), RenderError> + 'static>(f: F) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self) -> Result<(), RenderError> {
        (self.0)()
    }
}

impl fmt::Debug for RerenderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RerenderHandle(...)")
    }
}

// ============================================================================
// Render Context
// ============================================================================

struct RenderContext {
    hooks: RefCell<HookStore>,
    cache: RefCell<ResolutionCache>,
    active_rerender: RefCell<Option<RerenderHandle>>,
}

/// Handle to a root's render context, passed to every component.
#[derive(Clone)]
pub struct Cx {
    context: Rc<RenderContext>,
}

/// Non-owning [`Cx`], held by promise continuations.
#[derive(Clone)]
pub(crate) struct WeakCx(Weak<RenderContext>);

impl WeakCx {
    pub(crate) fn upgrade(&self) -> Option<Cx> {
        self.0.upgrade().map(|context| Cx { context })
    }
}

impl Cx {
    pub(crate) fn new() -> Self {
        Self {
            context: Rc::new(RenderContext {
                hooks: RefCell::new(HookStore::new()),
                cache: RefCell::new(ResolutionCache::default()),
                active_rerender: RefCell::new(None),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakCx {
        WeakCx(Rc::downgrade(&self.context))
    }

    pub(crate) fn begin_pass(&self) {
        self.context.hooks.borrow_mut().begin_pass();
    }

    /// `complete` is false when the pass failed or any boundary suspended.
    pub(crate) fn end_pass(&self, complete: bool) {
        self.context.hooks.borrow_mut().end_pass(complete);
    }

    /// Install `handle` as the active rerender handle, returning the previous one.
    pub(crate) fn bind_rerender(&self, handle: Option<RerenderHandle>) -> Option<RerenderHandle> {
        self.context.active_rerender.replace(handle)
    }

    pub(crate) fn subscribe(&self, promise: PromiseId) -> bool {
        self.context.cache.borrow_mut().subscribe(promise)
    }

    pub(crate) fn store_settlement(&self, promise: PromiseId, settlement: Settlement) {
        self.context.cache.borrow_mut().insert(promise, settlement);
    }

    /// Whether a render pass is currently running.
    pub fn is_rendering(&self) -> bool {
        self.context.hooks.borrow().is_rendering
    }

    /// Number of settled promises this root has cached.
    pub fn resolved_count(&self) -> usize {
        self.context.cache.borrow().len()
    }

    /// Number of render passes this context has seen.
    pub fn render_count(&self) -> usize {
        self.context.hooks.borrow().render_count
    }

    /// Describe every claimed hook slot, in slot order.
    pub fn hooks_debug_info(&self) -> Vec<HookMeta> {
        self.context
            .hooks
            .borrow()
            .hooks
            .iter()
            .map(|entry| entry.meta.clone())
            .collect()
    }

    // ========================================================================
    // Hooks
    // ========================================================================

    /// Create or retrieve a state value with a setter.
    ///
    /// `initial` is only stored the first time this slot is reached.
    ///
    /// ```ignore
    /// let (count, set_count) = cx.use_state(0)?;
    /// ```
    pub fn use_state<T: Clone + 'static>(&self, initial: T) -> Render<(T, SetState<T>)> {
        self.use_state_with(move || initial)
    }

    /// Like [`use_state`](Self::use_state), but computes the initial value
    /// lazily. The initializer runs only when the slot is first claimed.
    ///
    /// ```ignore
    /// let (dog, _) = cx.use_state_with(|| spawn_promise(fetch_dog()))?;
    /// ```
    pub fn use_state_with<T, F>(&self, init: F) -> Render<(T, SetState<T>)>
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        const HOOK: &str = "use_state";

        let claim = self.context.hooks.borrow_mut().claim::<T>(HOOK)?;
        let rerender = self
            .context
            .active_rerender
            .borrow()
            .clone()
            .ok_or(RenderError::NoActiveContext { hook: HOOK })?;

        let (index, value) = match claim {
            Claim::Occupied(index, value) => (index, value),
            Claim::Vacant(index) => {
                let value = init();
                self.context
                    .hooks
                    .borrow_mut()
                    .fill(index, HOOK, value.clone());
                (index, value)
            }
        };
        tracing::trace!(index, value_type = type_name::<T>(), "use_state");

        let setter = SetState {
            index,
            context: Rc::downgrade(&self.context),
            rerender,
            _marker: PhantomData,
        };
        Ok((value, setter))
    }

    /// Read the value of a promise, suspending until it has settled.
    ///
    /// Returns [`Interrupt::Suspend`] while the promise has no cached
    /// settlement; the nearest Suspense boundary renders its fallback and
    /// re-renders the root once the promise settles. A rejected promise
    /// fails the pass with [`RenderError::Rejected`].
    ///
    /// ```ignore
    /// let url = cx.use_promise(&dog_url)?;
    /// ```
    pub fn use_promise<T: Clone + 'static>(&self, promise: &Promise<T>) -> Render<T> {
        self.context
            .hooks
            .borrow()
            .ensure_rendering("use_promise")?;

        let id = promise.id();
        match self.context.cache.borrow().get(id) {
            Some(Settlement::Resolved(value)) => value.downcast_ref::<T>().cloned().ok_or(
                Interrupt::Error(RenderError::PromiseTypeMismatch {
                    promise: id,
                    expected: type_name::<T>(),
                }),
            ),
            Some(Settlement::Rejected(reason)) => Err(Interrupt::Error(RenderError::Rejected {
                promise: id,
                reason: reason.clone(),
            })),
            None => {
                tracing::trace!(promise = %id, "use_promise suspended");
                let awaitable: Rc<dyn Thenable> = Rc::new(promise.clone());
                Err(Interrupt::Suspend(Suspended::new(awaitable)))
            }
        }
    }
}

impl fmt::Debug for Cx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.context.hooks.borrow();
        f.debug_struct("Cx")
            .field("slots", &hooks.hooks.len())
            .field("cursor", &hooks.cursor)
            .field("is_rendering", &hooks.is_rendering)
            .finish()
    }
}

/// Setter returned by [`Cx::use_state`].
///
/// Bound to the slot it was claimed for and to the rerender handle that was
/// active at claim time. Setting always triggers a full re-render, even when
/// the value is unchanged.
pub struct SetState<T> {
    index: usize,
    context: Weak<RenderContext>,
    rerender: RerenderHandle,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            context: Weak::clone(&self.context),
            rerender: self.rerender.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState").field("slot", &self.index).finish()
    }
}

impl<T: 'static> SetState<T> {
    /// The slot this setter writes to.
    pub fn slot(&self) -> usize {
        self.index
    }

    /// Store `value` in the slot and re-render.
    pub fn set(&self, value: T) -> Result<(), RenderError> {
        let Some(context) = self.context.upgrade() else {
            tracing::debug!(slot = self.index, "state update after root was dropped");
            return Ok(());
        };
        {
            let mut hooks = context.hooks.borrow_mut();
            if hooks.is_rendering {
                return Err(RenderError::ReentrantUpdate);
            }
            hooks.write(self.index, value);
        }
        tracing::trace!(slot = self.index, "set_state");
        self.rerender.call()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counting_handle() -> (RerenderHandle, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let handle = RerenderHandle::new(move || {
            calls_clone.set(calls_clone.get() + 1);
            Ok(())
        });
        (handle, calls)
    }

    fn begin(cx: &Cx, handle: &RerenderHandle) {
        cx.begin_pass();
        cx.bind_rerender(Some(handle.clone()));
    }

    fn end(cx: &Cx) {
        cx.bind_rerender(None);
        cx.end_pass(true);
    }

    #[test]
    fn use_state_persists_across_renders() {
        let cx = Cx::new();
        let (handle, calls) = counting_handle();

        begin(&cx, &handle);
        let (value, set_value) = cx.use_state(42).unwrap();
        assert_eq!(value, 42);
        end(&cx);

        set_value.set(100).unwrap();
        assert_eq!(calls.get(), 1);

        begin(&cx, &handle);
        let (value, _) = cx.use_state(0).unwrap(); // initial ignored
        assert_eq!(value, 100);
        end(&cx);
    }

    #[test]
    fn last_write_wins() {
        let cx = Cx::new();
        let (handle, calls) = counting_handle();

        begin(&cx, &handle);
        let (_, set_value) = cx.use_state(String::new()).unwrap();
        end(&cx);

        for next in ["a", "b", "c"] {
            set_value.set(next.to_string()).unwrap();
        }
        assert_eq!(calls.get(), 3);

        begin(&cx, &handle);
        let (value, _) = cx.use_state(String::new()).unwrap();
        assert_eq!(value, "c");
        end(&cx);
    }

    #[test]
    fn initializer_runs_once() {
        let cx = Cx::new();
        let (handle, _) = counting_handle();
        let inits = Rc::new(Cell::new(0));

        for _ in 0..3 {
            begin(&cx, &handle);
            let inits_clone = Rc::clone(&inits);
            let (value, _) = cx
                .use_state_with(move || {
                    inits_clone.set(inits_clone.get() + 1);
                    vec![1, 2, 3]
                })
                .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
            end(&cx);
        }
        assert_eq!(inits.get(), 1);
    }

    #[test]
    fn hook_outside_render_fails() {
        let cx = Cx::new();
        let err = cx.use_state(0).unwrap_err().into_fatal();
        assert!(matches!(err, RenderError::NoActiveContext { hook: "use_state" }));
        assert!(err.to_string().contains("outside of an active render context"));
    }

    #[test]
    fn setter_during_render_is_rejected() {
        let cx = Cx::new();
        let (handle, calls) = counting_handle();

        begin(&cx, &handle);
        let (_, set_value) = cx.use_state(1).unwrap();
        let err = set_value.set(2).unwrap_err();
        assert!(matches!(err, RenderError::ReentrantUpdate));
        end(&cx);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn setter_keeps_handle_active_at_claim_time() {
        let cx = Cx::new();
        let (first, first_calls) = counting_handle();
        let (second, second_calls) = counting_handle();

        begin(&cx, &first);
        let (_, set_value) = cx.use_state(0).unwrap();
        cx.bind_rerender(Some(second.clone()));
        let _ = cx.use_state(0).unwrap();
        end(&cx);

        set_value.set(5).unwrap();
        assert_eq!(first_calls.get(), 1);
        assert_eq!(second_calls.get(), 0);
    }

    #[test]
    fn skipping_a_hook_shifts_slots() {
        let cx = Cx::new();
        let (handle, _) = counting_handle();

        begin(&cx, &handle);
        let (name, _) = cx.use_state("name").unwrap();
        let (title, _) = cx.use_state("title").unwrap();
        assert_eq!((name, title), ("name", "title"));
        end(&cx);

        // Second pass skips the first hook: `title` now reads the name slot.
        begin(&cx, &handle);
        let (title, _) = cx.use_state("title").unwrap();
        assert_eq!(title, "name");
        end(&cx);
    }

    #[test]
    fn slot_type_mismatch_fails() {
        let cx = Cx::new();
        let (handle, _) = counting_handle();

        begin(&cx, &handle);
        let _ = cx.use_state(0_i32).unwrap();
        end(&cx);

        begin(&cx, &handle);
        let err = cx.use_state(String::new()).unwrap_err().into_fatal();
        assert!(matches!(err, RenderError::HookTypeMismatch { index: 0, .. }));
        end(&cx);
    }

    #[test]
    fn use_promise_suspends_until_cached() {
        let cx = Cx::new();
        let (handle, _) = counting_handle();
        let (promise, resolver) = Promise::<String>::new();

        begin(&cx, &handle);
        match cx.use_promise(&promise) {
            Err(Interrupt::Suspend(signal)) => assert_eq!(signal.promise(), promise.id()),
            other => panic!("expected suspension, got {other:?}"),
        }
        end(&cx);

        // Resolution alone does not fill the cache; the boundary's
        // continuation does.
        resolver.resolve("X".to_string());
        begin(&cx, &handle);
        assert!(matches!(cx.use_promise(&promise), Err(Interrupt::Suspend(_))));
        end(&cx);

        cx.store_settlement(promise.id(), Settlement::Resolved(Rc::new("X".to_string())));
        begin(&cx, &handle);
        assert_eq!(cx.use_promise(&promise).unwrap(), "X");
        end(&cx);
        assert_eq!(cx.resolved_count(), 1);
    }

    #[test]
    fn rejected_promise_fails() {
        let cx = Cx::new();
        let (handle, _) = counting_handle();
        let promise = Promise::<u32>::rejected("timeout");
        cx.store_settlement(promise.id(), Settlement::Rejected("timeout".into()));

        begin(&cx, &handle);
        let err = cx.use_promise(&promise).unwrap_err().into_fatal();
        assert!(matches!(err, RenderError::Rejected { ref reason, .. } if reason == "timeout"));
        end(&cx);
    }

    #[test]
    fn debug_info_lists_slots() {
        let cx = Cx::new();
        let (handle, _) = counting_handle();

        begin(&cx, &handle);
        let _ = cx.use_state(0_u8).unwrap();
        let _ = cx.use_state(String::new()).unwrap();
        end(&cx);

        let info = cx.hooks_debug_info();
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].hook_type, "use_state");
        assert_eq!(info[0].value_type, "u8");
        assert_eq!(info[1].value_type, "alloc::string::String");
    }
}

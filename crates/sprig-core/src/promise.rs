//! Awaitable values consumed by [`Cx::use_promise`](crate::hooks::Cx::use_promise).
//!
//! A [`Promise`] is a single-threaded, identity-keyed handle to a value that
//! settles at most once. Whoever holds the matching [`Resolver`] settles it,
//! typically from an async task driven by the host's executor.
//!
//! ```ignore
//! let (promise, resolver) = Promise::new();
//! // hand `promise` to a component, keep `resolver` in the fetch task
//! resolver.resolve(String::from("https://images.example/dog.jpg"));
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Poll, Waker};

use futures_util::future::poll_fn;

/// Identity of an awaitable. Two clones of one promise share an id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PromiseId(pub usize);

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static NEXT_PROMISE_ID: AtomicUsize = AtomicUsize::new(0);

fn next_promise_id() -> PromiseId {
    PromiseId(NEXT_PROMISE_ID.fetch_add(1, Ordering::SeqCst))
}

/// Type-erased result of a settled awaitable.
#[derive(Clone)]
pub enum Settlement {
    Resolved(Rc<dyn Any>),
    Rejected(String),
}

impl fmt::Debug for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Settlement::Resolved(_) => f.write_str("Resolved(..)"),
            Settlement::Rejected(reason) => f.debug_tuple("Rejected").field(reason).finish(),
        }
    }
}

/// Callback run once an awaitable settles.
pub type Continuation = Box<dyn FnOnce(Settlement)>;

/// The side of an awaitable that the reconciler sees.
pub trait Thenable {
    fn id(&self) -> PromiseId;

    /// Register a continuation. It runs exactly once: immediately if the
    /// awaitable already settled, otherwise when it does.
    fn on_settle(&self, continuation: Continuation);
}

enum State<T> {
    Pending,
    Resolved(T),
    Rejected(String),
}

struct PromiseInner<T> {
    id: PromiseId,
    state: RefCell<State<T>>,
    continuations: RefCell<Vec<Continuation>>,
    wakers: RefCell<Vec<Waker>>,
}

/// A value that will be available later.
pub struct Promise<T> {
    inner: Rc<PromiseInner<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.state.borrow() {
            State::Pending => "pending",
            State::Resolved(_) => "resolved",
            State::Rejected(_) => "rejected",
        };
        f.debug_struct("Promise")
            .field("id", &self.inner.id)
            .field("state", &state)
            .finish()
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Create a pending promise and the resolver that settles it.
    pub fn new() -> (Self, Resolver<T>) {
        let promise = Self::with_state(State::Pending);
        let resolver = Resolver {
            promise: promise.clone(),
        };
        (promise, resolver)
    }

    /// Create a promise that is already resolved.
    pub fn resolved(value: T) -> Self {
        Self::with_state(State::Resolved(value))
    }

    /// Create a promise that is already rejected.
    pub fn rejected(reason: impl fmt::Display) -> Self {
        Self::with_state(State::Rejected(reason.to_string()))
    }

    fn with_state(state: State<T>) -> Self {
        Self {
            inner: Rc::new(PromiseInner {
                id: next_promise_id(),
                state: RefCell::new(state),
                continuations: RefCell::new(Vec::new()),
                wakers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> PromiseId {
        self.inner.id
    }

    pub fn is_pending(&self) -> bool {
        matches!(&*self.inner.state.borrow(), State::Pending)
    }

    /// The resolved value, if any.
    pub fn value(&self) -> Option<T> {
        match &*self.inner.state.borrow() {
            State::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Wait for the promise to settle.
    pub fn settled(&self) -> impl Future<Output = Result<T, String>> + 'static {
        let promise = self.clone();
        poll_fn(move |cx| match &*promise.inner.state.borrow() {
            State::Pending => {
                let mut wakers = promise.inner.wakers.borrow_mut();
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
            State::Resolved(value) => Poll::Ready(Ok(value.clone())),
            State::Rejected(reason) => Poll::Ready(Err(reason.clone())),
        })
    }

    fn settlement(&self) -> Option<Settlement> {
        match &*self.inner.state.borrow() {
            State::Pending => None,
            State::Resolved(value) => Some(Settlement::Resolved(Rc::new(value.clone()))),
            State::Rejected(reason) => Some(Settlement::Rejected(reason.clone())),
        }
    }

    fn settle(&self, state: State<T>) {
        {
            let mut current = self.inner.state.borrow_mut();
            if !matches!(*current, State::Pending) {
                return;
            }
            *current = state;
        }
        tracing::trace!(promise = %self.inner.id, "promise settled");

        for waker in self.inner.wakers.borrow_mut().drain(..) {
            waker.wake();
        }

        let Some(settlement) = self.settlement() else {
            return;
        };
        // Continuations may rerender, which can register new ones.
        let continuations = std::mem::take(&mut *self.inner.continuations.borrow_mut());
        for continuation in continuations {
            continuation(settlement.clone());
        }
    }
}

impl<T: Clone + 'static> Thenable for Promise<T> {
    fn id(&self) -> PromiseId {
        self.inner.id
    }

    fn on_settle(&self, continuation: Continuation) {
        match self.settlement() {
            Some(settlement) => continuation(settlement),
            None => self.inner.continuations.borrow_mut().push(continuation),
        }
    }
}

/// Settles its [`Promise`]. Consumed on use, so a promise settles once.
pub struct Resolver<T> {
    promise: Promise<T>,
}

impl<T: Clone + 'static> Resolver<T> {
    pub fn promise(&self) -> Promise<T> {
        self.promise.clone()
    }

    pub fn resolve(self, value: T) {
        self.promise.settle(State::Resolved(value));
    }

    pub fn reject(self, reason: impl fmt::Display) {
        self.promise.settle(State::Rejected(reason.to_string()));
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("promise", &self.promise.inner.id)
            .finish()
    }
}

/// Settled values keyed by awaitable identity, for the lifetime of a root.
#[derive(Default)]
pub(crate) struct ResolutionCache {
    entries: HashMap<PromiseId, Settlement>,
    subscribed: HashSet<PromiseId>,
}

impl ResolutionCache {
    pub(crate) fn get(&self, id: PromiseId) -> Option<&Settlement> {
        self.entries.get(&id)
    }

    pub(crate) fn insert(&mut self, id: PromiseId, settlement: Settlement) {
        self.entries.insert(id, settlement);
    }

    /// Returns `true` the first time a continuation is registered for `id`.
    pub(crate) fn subscribe(&mut self, id: PromiseId) -> bool {
        self.subscribed.insert(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn continuation_runs_once_on_resolve() {
        let (promise, resolver) = Promise::<i32>::new();
        let calls = Rc::new(Cell::new(0));

        let calls_clone = Rc::clone(&calls);
        promise.on_settle(Box::new(move |settlement| {
            if let Settlement::Resolved(value) = settlement {
                assert_eq!(value.downcast_ref::<i32>(), Some(&7));
            }
            calls_clone.set(calls_clone.get() + 1);
        }));

        assert!(promise.is_pending());
        resolver.resolve(7);
        assert_eq!(calls.get(), 1);
        assert_eq!(promise.value(), Some(7));
    }

    #[test]
    fn continuation_on_settled_promise_runs_immediately() {
        let promise = Promise::resolved("ready");
        let called = Rc::new(Cell::new(false));

        let called_clone = Rc::clone(&called);
        promise.on_settle(Box::new(move |_| called_clone.set(true)));

        assert!(called.get());
    }

    #[test]
    fn rejection_is_delivered() {
        let (promise, resolver) = Promise::<String>::new();
        let reason = Rc::new(RefCell::new(None));

        let reason_clone = Rc::clone(&reason);
        promise.on_settle(Box::new(move |settlement| {
            if let Settlement::Rejected(r) = settlement {
                *reason_clone.borrow_mut() = Some(r);
            }
        }));

        resolver.reject("network down");
        assert_eq!(reason.borrow().as_deref(), Some("network down"));
        assert_eq!(promise.value(), None);
    }

    #[test]
    fn clones_share_identity() {
        let (promise, _resolver) = Promise::<u8>::new();
        let other = Promise::<u8>::resolved(1);
        assert_eq!(promise.clone().id(), promise.id());
        assert_ne!(promise.id(), other.id());
    }

    #[test]
    fn cache_subscribes_once_per_promise() {
        let mut cache = ResolutionCache::default();
        let id = PromiseId(42);
        assert!(cache.subscribe(id));
        assert!(!cache.subscribe(id));
        assert!(cache.get(id).is_none());

        cache.insert(id, Settlement::Rejected("boom".into()));
        assert!(matches!(cache.get(id), Some(Settlement::Rejected(_))));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn repeated_polls_keep_one_waker() {
        let (promise, resolver) = Promise::<u8>::new();
        let mut settled = Box::pin(promise.settled());
        let waker = futures_util::task::noop_waker();
        let mut cx = std::task::Context::from_waker(&waker);

        for _ in 0..3 {
            assert!(settled.as_mut().poll(&mut cx).is_pending());
        }
        assert_eq!(promise.inner.wakers.borrow().len(), 1);

        resolver.resolve(4);
        assert_eq!(settled.as_mut().poll(&mut cx), Poll::Ready(Ok(4)));
        assert!(promise.inner.wakers.borrow().is_empty());
    }
}

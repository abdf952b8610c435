//! Runtime glue: tracing setup, document roots and async promise settlement.

use std::fmt;
use std::future::Future;

use sprig_core::{Promise, Root, RootConfig, create_container, create_container_with};
use sprig_dom::Document;

/// Install the default `tracing` subscriber.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// Create a root rendering into a fresh [`Document`].
pub fn create_root() -> Root<Document> {
    create_container(Document::new())
}

pub fn create_root_with(config: RootConfig) -> Root<Document> {
    create_container_with(Document::new(), config)
}

/// Drive `future` on the current `LocalSet` and settle a promise with its output.
///
/// `Ok` resolves the promise, `Err` rejects it with the error's display
/// text. Must be called from within a [`tokio::task::LocalSet`]; roots and
/// promises are single-threaded, so the task never leaves this thread.
pub fn spawn_promise<T, E, F>(future: F) -> Promise<T>
where
    T: Clone + 'static,
    E: fmt::Display + 'static,
    F: Future<Output = Result<T, E>> + 'static,
{
    let (promise, resolver) = Promise::new();
    let id = promise.id();
    tokio::task::spawn_local(async move {
        match future.await {
            Ok(value) => {
                tracing::debug!(promise = %id, "background task resolved");
                resolver.resolve(value);
            }
            Err(err) => {
                tracing::warn!(promise = %id, %err, "background task failed");
                resolver.reject(err);
            }
        }
    });
    promise
}

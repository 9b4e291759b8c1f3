//! Spawning in-flight lifecycles
//!
//! An async payload's success or error action is dispatched when its work
//! settles, and work only makes progress while something polls it. Without a
//! [`Spawner`], that is whoever holds the [`Dispatched::Pending`] returned by
//! `dispatch`. With one attached to the store, the middleware hands every
//! lifecycle to the spawner as soon as it begins, so it runs to completion
//! even when the result is dropped, e.g. an async sub-action dispatched from
//! inside executable work.
//!
//! # Example
//!
//! ```
//! use async_payload_core::prelude::*;
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let harness = TestHarness::new((), noop_reducer).with_spawner(Spawner::tokio_local());
//!
//! tokio::task::LocalSet::new()
//!     .run_until(async {
//!         // Result dropped on purpose; the lifecycle still completes
//!         let _ = harness.dispatch(Action::new("load").with_pending(async { Ok(json!(1)) }));
//!         while harness.history().len() < 2 {
//!             tokio::task::yield_now().await;
//!         }
//!     })
//!     .await;
//!
//! assert_eq!(harness.kinds(), vec!["load/start", "load/success"]);
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};

use crate::dispatch::{Dispatched, PendingDispatch};
use crate::error::PayloadError;

/// A detached unit of work.
pub type Task = LocalBoxFuture<'static, ()>;

/// Runs detached tasks on the current thread.
///
/// Cloning is cheap; clones share the same spawn function.
pub struct Spawner {
    f: Rc<dyn Fn(Task)>,
}

impl Spawner {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Task) + 'static,
    {
        Self { f: Rc::new(f) }
    }

    /// Spawn onto the current tokio `LocalSet`.
    ///
    /// # Panics
    ///
    /// Spawning panics when it happens outside of a `tokio::task::LocalSet`.
    pub fn tokio_local() -> Self {
        Self::new(|task| {
            tokio::task::spawn_local(task);
        })
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        (self.f)(task.boxed_local())
    }

    /// Start driving `lifecycle` now and return a handle to its outcome.
    ///
    /// The lifecycle runs to completion whether or not the handle is awaited.
    /// If the spawned task is dropped before finishing (its `LocalSet` went
    /// away), the handle resolves to an error.
    pub fn detach<S: 'static>(&self, lifecycle: PendingDispatch<S>) -> PendingDispatch<S> {
        let (tx, rx) = oneshot::channel();
        self.spawn(async move {
            let outcome = Dispatched::Pending(lifecycle).settle().await;
            // Nobody has to be listening
            let _ = tx.send(outcome);
        });

        async move {
            match rx.await {
                Ok(outcome) => outcome,
                Err(canceled) => Err(PayloadError::new(canceled)),
            }
        }
        .boxed_local()
    }
}

impl Clone for Spawner {
    fn clone(&self) -> Self {
        Self {
            f: Rc::clone(&self.f),
        }
    }
}

impl fmt::Debug for Spawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spawner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_json::json;

    /// Collects spawned tasks so the test decides when they run.
    fn queue() -> (Spawner, Rc<RefCell<Vec<Task>>>) {
        let tasks = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&tasks);
        let spawner = Spawner::new(move |task| sink.borrow_mut().push(task));
        (spawner, tasks)
    }

    #[tokio::test]
    async fn test_detach_runs_without_handle() {
        let (spawner, tasks) = queue();
        let ran = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran);

        let handle = spawner.detach::<()>(
            async move {
                *flag.borrow_mut() = true;
                Ok(Dispatched::Value(json!(1)))
            }
            .boxed_local(),
        );
        drop(handle);

        let task = tasks.borrow_mut().pop().unwrap();
        task.await;
        assert!(*ran.borrow());
    }

    #[tokio::test]
    async fn test_detach_handle_receives_outcome() {
        let (spawner, tasks) = queue();

        let handle =
            spawner.detach::<()>(async { Ok(Dispatched::Value(json!("done"))) }.boxed_local());

        let task = tasks.borrow_mut().pop().unwrap();
        task.await;
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.into_value(), Some(json!("done")));
    }

    #[tokio::test]
    async fn test_dropped_task_cancels_handle() {
        let (spawner, tasks) = queue();

        let handle =
            spawner.detach::<()>(async { Ok(Dispatched::Value(json!(1))) }.boxed_local());
        tasks.borrow_mut().clear();

        let err = handle.await.unwrap_err();
        assert!(err.downcast_ref::<oneshot::Canceled>().is_some());
    }
}

//! Test utilities for async-payload stores
//!
//! - [`ActionHistory`]: shared record of every action that reached a point in the chain
//! - [`RecorderMiddleware`]: appends to an [`ActionHistory`], then forwards
//! - [`TestHarness`]: a store wired as `[AsyncPayloadMiddleware, recorder]`
//! - Assertion macros for verifying dispatched actions
//!
//! # Example
//!
//! ```
//! use async_payload_core::testing::{noop_reducer, TestHarness};
//! use async_payload_core::{assert_dispatched, Action};
//!
//! let mut harness = TestHarness::new((), noop_reducer);
//! let _ = harness.dispatch(Action::new("OMG"));
//!
//! let dispatched = harness.drain_history();
//! assert_dispatched!(dispatched, "OMG");
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::action::{Action, ActionRecord};
use crate::async_payload::AsyncPayloadMiddleware;
use crate::dispatch::{Dispatched, Dispatcher};
use crate::options::MiddlewareOptions;
use crate::store::{ComposedMiddleware, Middleware, Reducer, Store, StoreHandle};
use crate::tasks::Spawner;

/// A reducer that never changes state.
pub fn noop_reducer<S>(_state: &mut S, _action: &Action<S>) -> bool {
    false
}

/// Shared, ordered record of dispatched actions.
///
/// Clones share the same underlying list.
#[derive(Debug, Clone, Default)]
pub struct ActionHistory {
    entries: Rc<RefCell<Vec<ActionRecord>>>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A middleware that appends to this history.
    pub fn recorder(&self) -> RecorderMiddleware {
        RecorderMiddleware {
            history: self.clone(),
        }
    }

    pub fn push(&self, record: ActionRecord) {
        self.entries.borrow_mut().push(record);
    }

    pub fn records(&self) -> Vec<ActionRecord> {
        self.entries.borrow().clone()
    }

    /// Action types, in dispatch order.
    pub fn kinds(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|record| record.kind.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Remove and return every recorded action.
    pub fn drain(&self) -> Vec<ActionRecord> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

}

/// Records every action it sees, then forwards it unchanged.
#[derive(Debug, Clone)]
pub struct RecorderMiddleware {
    history: ActionHistory,
}

impl<S: 'static> Middleware<S> for RecorderMiddleware {
    fn wrap(&self, _store: StoreHandle<S>, next: Dispatcher<S>) -> Dispatcher<S> {
        let history = self.history.clone();
        Dispatcher::new(move |action: Action<S>| {
            tracing::trace!(action = %action.kind, "Recording action");
            history.push(action.record());
            next.dispatch(action)
        })
    }
}

/// Store wired with the async payload middleware in front of a recorder.
///
/// The recorder sits below the middleware, so the history shows exactly what
/// the reducer receives: start actions, side-effect actions dispatched by
/// executable payloads, and success/error actions.
///
/// # Example
///
/// ```
/// use async_payload_core::testing::{noop_reducer, TestHarness};
/// use async_payload_core::Action;
///
/// let mut harness = TestHarness::new((), noop_reducer);
///
/// let _ = harness.dispatch(Action::new("Foo"));
/// let _ = harness.dispatch(Action::new("Bar").with_payload(42));
///
/// let records = harness.drain_history();
/// assert_eq!(records.len(), 2);
/// assert!(harness.history().is_empty());
/// ```
pub struct TestHarness<S> {
    store: Store<S>,
    history: ActionHistory,
}

impl<S: 'static> TestHarness<S> {
    /// Create a harness with default middleware options.
    pub fn new(state: S, reducer: Reducer<S>) -> Self {
        Self::with_options(state, reducer, MiddlewareOptions::default())
    }

    pub fn with_options(state: S, reducer: Reducer<S>, options: MiddlewareOptions) -> Self {
        let history = ActionHistory::new();
        let middleware = ComposedMiddleware::new()
            .with(AsyncPayloadMiddleware::new(options))
            .with(history.recorder());

        Self {
            store: Store::with_middleware(state, reducer, middleware),
            history,
        }
    }

    /// Run lifecycles on `spawner` as soon as they begin.
    pub fn with_spawner(self, spawner: Spawner) -> Self {
        self.store.set_spawner(spawner);
        self
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn dispatch(&self, action: Action<S>) -> Dispatched<S> {
        self.store.dispatch(action)
    }

    /// Everything recorded so far.
    pub fn history(&self) -> Vec<ActionRecord> {
        self.history.records()
    }

    /// Recorded action types, in dispatch order.
    pub fn kinds(&self) -> Vec<String> {
        self.history.kinds()
    }

    /// Remove and return everything recorded so far.
    pub fn drain_history(&mut self) -> Vec<ActionRecord> {
        self.history.drain()
    }
}

/// Assert that an action of the given type was dispatched.
///
/// # Example
///
/// ```ignore
/// let dispatched = harness.drain_history();
/// assert_dispatched!(dispatched, "fetchUser/start");
/// ```
#[macro_export]
macro_rules! assert_dispatched {
    ($records:expr, $kind:expr) => {
        assert!(
            $records.iter().any(|r| r.kind == $kind),
            "Expected action `{}` to be dispatched, but got: {:?}",
            $kind,
            $records.iter().map(|r| r.kind.as_str()).collect::<Vec<_>>()
        );
    };
}

/// Assert that NO action of the given type was dispatched.
///
/// # Example
///
/// ```ignore
/// let dispatched = harness.drain_history();
/// assert_not_dispatched!(dispatched, "fetchUser/success");
/// ```
#[macro_export]
macro_rules! assert_not_dispatched {
    ($records:expr, $kind:expr) => {
        assert!(
            !$records.iter().any(|r| r.kind == $kind),
            "Expected action `{}` NOT to be dispatched, but it was: {:?}",
            $kind,
            $records.iter().map(|r| r.kind.as_str()).collect::<Vec<_>>()
        );
    };
}

/// Count how many dispatched actions have the given type.
///
/// # Example
///
/// ```ignore
/// let dispatched = harness.drain_history();
/// assert_eq!(count_dispatched!(dispatched, "Tick"), 3);
/// ```
#[macro_export]
macro_rules! count_dispatched {
    ($records:expr, $kind:expr) => {
        $records.iter().filter(|r| r.kind == $kind).count()
    };
}

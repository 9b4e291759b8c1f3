//! Dispatch functions and their results

use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::action::{Action, ActionRecord};
use crate::error::PayloadError;

/// An in-flight async lifecycle.
pub type PendingDispatch<S> = LocalBoxFuture<'static, Result<Dispatched<S>, PayloadError>>;

/// A dispatch function: one position in a middleware chain, or the chain's root.
pub struct Dispatcher<S> {
    f: Rc<dyn Fn(Action<S>) -> Dispatched<S>>,
}

impl<S> Dispatcher<S> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Action<S>) -> Dispatched<S> + 'static,
    {
        Self { f: Rc::new(f) }
    }

    pub fn dispatch(&self, action: Action<S>) -> Dispatched<S> {
        (self.f)(action)
    }
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            f: Rc::clone(&self.f),
        }
    }
}

impl<S> fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

/// Result of dispatching an action.
///
/// Plain actions come back synchronously as [`Dispatched::Action`]. Actions
/// with async payloads come back as [`Dispatched::Pending`]; the success or
/// error half of their lifecycle runs when that future is driven, either by
/// awaiting [`settle`](Dispatched::settle) or by handing it to the runtime
/// with [`spawn_local`](Dispatched::spawn_local). When the store has a
/// [`Spawner`](crate::Spawner), the lifecycle is already running and the
/// future only reports its outcome.
#[must_use = "an async lifecycle stops after its start action unless this is settled or the store has a spawner"]
pub enum Dispatched<S> {
    /// The action that reached the end of the chain
    Action(Action<S>),
    /// A raw value, resolved without a derived action
    Value(Value),
    /// The lifecycle is still running
    Pending(PendingDispatch<S>),
}

impl<S: 'static> Dispatched<S> {
    /// Drive the lifecycle until it yields an action or a value.
    pub async fn settle(self) -> Result<Self, PayloadError> {
        let mut current = self;
        loop {
            match current {
                Self::Pending(future) => current = future.await?,
                settled => return Ok(settled),
            }
        }
    }

    /// Run the lifecycle on the current `LocalSet`, detached from the caller.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a `tokio::task::LocalSet`.
    pub fn spawn_local(self) -> JoinHandle<Result<Self, PayloadError>> {
        tokio::task::spawn_local(self.settle())
    }
}

impl<S> Dispatched<S> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn into_action(self) -> Option<Action<S>> {
        match self {
            Self::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Snapshot of the dispatched action, if there is one.
    pub fn into_record(self) -> Option<ActionRecord> {
        self.into_action().map(|action| action.record())
    }
}

impl<S> fmt::Debug for Dispatched<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

//! Action payloads and their classification
//!
//! A payload is classified when it is dispatched, never ahead of time:
//!
//! - [`Payload::Plain`]: an ordinary value, passed through untouched
//! - [`Payload::Pending`]: a value that is still being computed
//! - [`Payload::Executable`]: work to run now with the store's `dispatch` and `getState`

use std::fmt;
use std::future::Future;

use futures::future::{self, FutureExt, LocalBoxFuture};
use serde_json::Value;

use crate::dispatch::Dispatcher;
use crate::error::PayloadError;
use crate::store::StateReader;

/// A value that settles later, on the current thread.
pub type AsyncValue = LocalBoxFuture<'static, Result<Value, PayloadError>>;

/// Work carried by an executable payload.
///
/// Invoked once with the store's root dispatcher and a state reader. Returning
/// `Err` is the synchronous failure path.
pub type Work<S> = Box<dyn FnOnce(Dispatcher<S>, StateReader<S>) -> Result<Completion, PayloadError>>;

/// What executable work hands back when it returns without failing.
pub enum Completion {
    /// Finished synchronously with a value
    Ready(Value),
    /// Still running
    Pending(AsyncValue),
}

impl Completion {
    pub fn ready(value: impl Into<Value>) -> Self {
        Self::Ready(value.into())
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, PayloadError>> + 'static,
    {
        Self::Pending(future.boxed_local())
    }

    /// Coerce into an async value, wrapping a ready value in an already-resolved future.
    pub fn into_async(self) -> AsyncValue {
        match self {
            Self::Ready(value) => future::ready(Ok(value)).boxed_local(),
            Self::Pending(future) => future,
        }
    }
}

impl From<Value> for Completion {
    fn from(value: Value) -> Self {
        Self::Ready(value)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// The payload of an action.
pub enum Payload<S> {
    Plain(Value),
    Pending(AsyncValue),
    Executable(Work<S>),
}

/// Shape of a [`Payload`], without its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Plain,
    Pending,
    Executable,
}

impl<S> Payload<S> {
    pub fn plain(value: impl Into<Value>) -> Self {
        Self::Plain(value.into())
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, PayloadError>> + 'static,
    {
        Self::Pending(future.boxed_local())
    }

    pub fn executable<F>(work: F) -> Self
    where
        F: FnOnce(Dispatcher<S>, StateReader<S>) -> Result<Completion, PayloadError> + 'static,
    {
        Self::Executable(Box::new(work))
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Plain(_) => PayloadKind::Plain,
            Self::Pending(_) => PayloadKind::Pending,
            Self::Executable(_) => PayloadKind::Executable,
        }
    }

    /// True for `null`, `false`, `0` and `""`.
    ///
    /// Async payloads are never falsy.
    pub fn is_falsy(&self) -> bool {
        match self {
            Self::Plain(Value::Null) => true,
            Self::Plain(Value::Bool(b)) => !b,
            Self::Plain(Value::Number(n)) => n.as_f64() == Some(0.0),
            Self::Plain(Value::String(s)) => s.is_empty(),
            _ => false,
        }
    }

    /// The plain value, if this payload is not async.
    pub fn as_plain(&self) -> Option<&Value> {
        match self {
            Self::Plain(value) => Some(value),
            _ => None,
        }
    }
}

impl<S> fmt::Debug for Payload<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
            Self::Executable(_) => f.write_str("Executable(..)"),
        }
    }
}

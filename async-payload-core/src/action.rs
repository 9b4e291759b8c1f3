//! Actions and action records

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatch::Dispatcher;
use crate::error::PayloadError;
use crate::payload::{Completion, Payload};
use crate::store::StateReader;

/// Meta key under which per-action middleware flags live.
pub const ASYNC_PAYLOAD_META_KEY: &str = "asyncPayload";
/// Flag under [`ASYNC_PAYLOAD_META_KEY`] that suppresses start and success actions.
pub const SKIP_OUTER_FLAG: &str = "skipOuter";

/// An intent to change state.
///
/// `S` is the state type of the store the action is dispatched to; it only
/// appears in executable payloads, which receive a [`StateReader<S>`].
///
/// # Example
/// ```
/// use async_payload_core::Action;
///
/// let action: Action<()> = Action::new("fetchUser").with_payload(42);
/// assert_eq!(action.kind, "fetchUser");
/// ```
pub struct Action<S> {
    /// The action type
    pub kind: String,
    pub payload: Option<Payload<S>>,
    /// Free-form metadata, copied onto derived actions
    pub meta: Option<Value>,
    pub error: Option<bool>,
}

impl<S> Action<S> {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
            meta: None,
            error: None,
        }
    }

    /// Attach a plain payload.
    pub fn with_payload(mut self, value: impl Into<Value>) -> Self {
        self.payload = Some(Payload::plain(value));
        self
    }

    /// Attach a payload that is still being computed.
    pub fn with_pending<F>(mut self, future: F) -> Self
    where
        F: Future<Output = Result<Value, PayloadError>> + 'static,
    {
        self.payload = Some(Payload::pending(future));
        self
    }

    /// Attach work to run when the action is dispatched.
    pub fn with_work<F>(mut self, work: F) -> Self
    where
        F: FnOnce(Dispatcher<S>, StateReader<S>) -> Result<Completion, PayloadError> + 'static,
    {
        self.payload = Some(Payload::executable(work));
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_error(mut self, error: bool) -> Self {
        self.error = Some(error);
        self
    }

    /// Mark the action so only its error action (if any) is dispatched.
    ///
    /// Merges into existing object meta; any other meta value is replaced.
    pub fn skipping_outer(mut self) -> Self {
        let mut meta = match self.meta.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let flags = meta
            .entry(ASYNC_PAYLOAD_META_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !flags.is_object() {
            *flags = Value::Object(Map::new());
        }
        if let Value::Object(flags) = flags {
            flags.insert(SKIP_OUTER_FLAG.to_string(), Value::Bool(true));
        }
        self.meta = Some(Value::Object(meta));
        self
    }

    /// True when `meta.asyncPayload.skipOuter` is exactly `true`.
    pub fn skip_outer(&self) -> bool {
        self.meta
            .as_ref()
            .and_then(|meta| meta.get(ASYNC_PAYLOAD_META_KEY))
            .and_then(|flags| flags.get(SKIP_OUTER_FLAG))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Snapshot of this action. Async payloads are recorded as absent.
    pub fn record(&self) -> ActionRecord {
        ActionRecord {
            kind: self.kind.clone(),
            payload: self.payload.as_ref().and_then(Payload::as_plain).cloned(),
            meta: self.meta.clone(),
            error: self.error,
        }
    }

    /// Build a plain action from its parts.
    pub(crate) fn from_parts(
        kind: String,
        payload: Option<Value>,
        error: Option<bool>,
        meta: Option<Value>,
    ) -> Self {
        Self {
            kind,
            payload: payload.map(Payload::Plain),
            meta,
            error,
        }
    }
}

impl<S> fmt::Debug for Action<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("kind", &self.kind)
            .field("payload", &self.payload)
            .field("meta", &self.meta)
            .field("error", &self.error)
            .finish()
    }
}

/// A cloneable, comparable snapshot of an action.
///
/// Serializes with the conventional field names:
/// `{"type": "fetchUser/success", "payload": ..., "error": false}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

impl ActionRecord {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
            meta: None,
            error: None,
        }
    }

    pub fn payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn error(mut self, error: bool) -> Self {
        self.error = Some(error);
        self
    }
}

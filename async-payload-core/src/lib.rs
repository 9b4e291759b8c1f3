//! Core types and the async payload middleware for async-payload
//!
//! This crate provides a Redux-style store with a middleware chain, and a
//! middleware that gives actions with async payloads a start/success/error
//! lifecycle.
//!
//! # Core Concepts
//!
//! - **Action**: A typed record describing an intent, with an optional payload
//! - **Payload**: A plain value, a value still being computed, or work to run
//! - **Store**: Centralized state container with reducer pattern
//! - **Middleware**: Wraps the dispatch chain; sees every action on its way down
//! - **AsyncPayloadMiddleware**: Dispatches `<type>/start`, `<type>/success`
//!   and `<type>/error` around async payloads
//!
//! # Basic Example
//!
//! ```
//! use async_payload_core::prelude::*;
//! use serde_json::json;
//!
//! #[derive(Clone, Default)]
//! struct AppState {
//!     loading: bool,
//!     user: Option<serde_json::Value>,
//! }
//!
//! fn reducer(state: &mut AppState, action: &Action<AppState>) -> bool {
//!     match ResolvedOptions::default().parse_action_type(&action.kind) {
//!         Some(("fetchUser", Stage::Start)) => state.loading = true,
//!         Some(("fetchUser", Stage::Success)) => {
//!             state.loading = false;
//!             state.user = action.payload.as_ref().and_then(Payload::as_plain).cloned();
//!         }
//!         _ => return false,
//!     }
//!     true
//! }
//!
//! # futures::executor::block_on(async {
//! let store = Store::with_middleware(AppState::default(), reducer, intercept(None));
//!
//! let pending = store.dispatch(
//!     Action::new("fetchUser").with_work(|_dispatch, _state| {
//!         Ok(Completion::pending(async { Ok(json!({"name": "Ada"})) }))
//!     }),
//! );
//! assert!(store.state().loading);
//!
//! pending.settle().await.unwrap();
//! assert!(!store.state().loading);
//! assert_eq!(store.state().user, Some(json!({"name": "Ada"})));
//! # });
//! ```
//!
//! # Skipping the outer actions
//!
//! Executable payloads often dispatch their own actions. Setting
//! `meta.asyncPayload.skipOuter` (see [`Action::skipping_outer`]) suppresses
//! the start and success actions for that dispatch; the caller receives the
//! raw resolved value instead. Failures still dispatch the error action.
//!
//! # Driving lifecycles
//!
//! The success or error action is dispatched once the payload's work
//! settles. Attach a [`Spawner`] to the store and every lifecycle starts
//! running as soon as it is dispatched; without one, the caller has to
//! `settle()` (or `spawn_local()`) the result, and a dropped result stops
//! after the start action with a warning.

pub mod action;
pub mod async_payload;
pub mod dispatch;
pub mod error;
pub mod options;
pub mod payload;
pub mod store;
pub mod tasks;
pub mod testing;

// Core exports
pub use action::{Action, ActionRecord};
pub use async_payload::{intercept, AsyncPayloadMiddleware};
pub use dispatch::{Dispatched, Dispatcher, PendingDispatch};
pub use error::{ConfigError, PayloadError};
pub use payload::{AsyncValue, Completion, Payload, PayloadKind, Work};

// Options exports
pub use options::{
    error_action_type, start_action_type, success_action_type, DerivedTypes, MiddlewareOptions,
    ResolvedOptions, Stage, SuffixOptions, Suffixes,
};

// Store exports
pub use store::{
    ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware, Reducer, StateReader,
    Store, StoreHandle,
};

// Task exports
pub use tasks::{Spawner, Task};

// Testing exports
pub use testing::{noop_reducer, ActionHistory, RecorderMiddleware, TestHarness};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionRecord};
    pub use crate::async_payload::{intercept, AsyncPayloadMiddleware};
    pub use crate::dispatch::{Dispatched, Dispatcher};
    pub use crate::error::PayloadError;
    pub use crate::options::{MiddlewareOptions, ResolvedOptions, Stage};
    pub use crate::payload::{Completion, Payload};
    pub use crate::store::{
        ComposedMiddleware, LoggingMiddleware, Middleware, NoopMiddleware, Reducer, StateReader,
        Store, StoreHandle,
    };
    pub use crate::tasks::Spawner;
    pub use crate::testing::{noop_reducer, ActionHistory, TestHarness};
}

//! async-payload: start/success/error actions for async work in a Redux-style store
//!
//! Dispatch an action whose payload is a future, or work that returns one,
//! and the middleware dispatches the lifecycle around it. Reducers only ever
//! see plain actions.
//!
//! # Example
//! ```
//! use async_payload::prelude::*;
//! use serde_json::json;
//!
//! # futures::executor::block_on(async {
//! let harness = TestHarness::new((), noop_reducer);
//!
//! let result = harness
//!     .dispatch(Action::new("foo").with_work(|dispatch, _state| {
//!         let _ = dispatch.dispatch(Action::new("OMG"));
//!         Ok(Completion::ready("foo"))
//!     }))
//!     .settle()
//!     .await
//!     .unwrap();
//!
//! assert_eq!(harness.kinds(), vec!["foo/start", "OMG", "foo/success"]);
//! assert_eq!(
//!     result.into_record(),
//!     Some(ActionRecord::new("foo/success").payload("foo").error(false))
//! );
//! # });
//! ```

// Re-export everything from core
pub use async_payload_core::*;

// Re-export assertion macros
pub use async_payload_core::{assert_dispatched, assert_not_dispatched, count_dispatched};

/// Prelude for convenient imports
pub mod prelude {
    // Actions and payloads
    pub use async_payload_core::{Action, ActionRecord, Completion, Payload, PayloadError};

    // Middleware
    pub use async_payload_core::{
        intercept, AsyncPayloadMiddleware, MiddlewareOptions, ResolvedOptions, Stage,
    };

    // Store
    pub use async_payload_core::{
        ComposedMiddleware, Dispatched, Dispatcher, LoggingMiddleware, Middleware, NoopMiddleware,
        Reducer, StateReader, Store, StoreHandle,
    };

    // Tasks
    pub use async_payload_core::Spawner;

    // Testing
    pub use async_payload_core::{noop_reducer, ActionHistory, TestHarness};
}

//! Start/success/error actions for async payloads
//!
//! [`AsyncPayloadMiddleware`] looks at the payload of every action it sees.
//! Plain payloads pass straight through. An action whose payload is still
//! being computed ([`Payload::Pending`]) or is work to run
//! ([`Payload::Executable`]) never reaches the reducer itself; instead the
//! middleware dispatches derived actions around the work:
//!
//! 1. `<type>/start` down the rest of the chain, before the work runs
//! 2. `<type>/success` with the resolved value, or `<type>/error` with the
//!    failure message, from the top of the chain once the work settles
//!
//! # Example
//!
//! ```
//! use async_payload_core::prelude::*;
//! use serde_json::json;
//!
//! # futures::executor::block_on(async {
//! let harness = TestHarness::new((), noop_reducer);
//!
//! let result = harness
//!     .dispatch(Action::new("fetchUser").with_pending(async { Ok(json!({"id": 1})) }))
//!     .settle()
//!     .await
//!     .unwrap();
//!
//! assert_eq!(harness.kinds(), vec!["fetchUser/start", "fetchUser/success"]);
//! assert_eq!(result.into_record().unwrap().payload, Some(json!({"id": 1})));
//! # });
//! ```

use std::future::Future;
use std::rc::Rc;

use futures::future::{self, FutureExt};
use serde_json::Value;

use crate::action::Action;
use crate::dispatch::{Dispatched, Dispatcher};
use crate::error::PayloadError;
use crate::options::{DerivedTypes, MiddlewareOptions, ResolvedOptions};
use crate::payload::{AsyncValue, Payload};
use crate::store::{Middleware, StoreHandle};

/// Create the middleware from optional partial options.
pub fn intercept(options: Option<MiddlewareOptions>) -> AsyncPayloadMiddleware {
    options.map(AsyncPayloadMiddleware::new).unwrap_or_default()
}

/// Middleware that turns async payloads into start/success/error actions.
#[derive(Debug, Clone, Default)]
pub struct AsyncPayloadMiddleware {
    options: Rc<ResolvedOptions>,
}

impl AsyncPayloadMiddleware {
    pub fn new(options: MiddlewareOptions) -> Self {
        Self::from_resolved(options.resolve())
    }

    pub fn from_resolved(options: ResolvedOptions) -> Self {
        Self {
            options: Rc::new(options),
        }
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }
}

impl<S: 'static> Middleware<S> for AsyncPayloadMiddleware {
    fn wrap(&self, store: StoreHandle<S>, next: Dispatcher<S>) -> Dispatcher<S> {
        let options = Rc::clone(&self.options);
        Dispatcher::new(move |action| dispatch_action(&options, &store, &next, action))
    }
}

fn dispatch_action<S: 'static>(
    options: &ResolvedOptions,
    store: &StoreHandle<S>,
    next: &Dispatcher<S>,
    mut action: Action<S>,
) -> Dispatched<S> {
    let payload = match action.payload.take() {
        Some(payload) if !payload.is_falsy() => payload,
        payload => {
            action.payload = payload;
            return next.dispatch(action);
        }
    };

    match payload {
        Payload::Plain(value) => {
            action.payload = Some(Payload::Plain(value));
            next.dispatch(action)
        }
        Payload::Pending(work) => {
            let call = AsyncCall::begin(options, store, next, &action);
            in_flight(store, &action.kind, call.run(work))
        }
        Payload::Executable(work) => {
            let mut call = AsyncCall::begin(options, store, next, &action);
            match work(store.dispatcher(), store.state_reader()) {
                Ok(completion) => {
                    in_flight(store, &action.kind, call.run(completion.into_async()))
                }
                Err(err) => {
                    // Report the failure before returning to the caller
                    let outcome = call.reject(err);
                    Dispatched::Pending(future::ready(outcome).boxed_local())
                }
            }
        }
    }
}

/// Wrap a running lifecycle for the caller, handing it to the store's
/// spawner when there is one.
fn in_flight<S, F>(store: &StoreHandle<S>, kind: &str, lifecycle: F) -> Dispatched<S>
where
    S: 'static,
    F: Future<Output = Result<Dispatched<S>, PayloadError>> + 'static,
{
    let guard = Unsettled::new(kind);
    let lifecycle = async move {
        let outcome = lifecycle.await;
        guard.disarm();
        outcome
    }
    .boxed_local();

    match store.spawner() {
        Some(spawner) => Dispatched::Pending(spawner.detach(lifecycle)),
        None => Dispatched::Pending(lifecycle),
    }
}

/// Warns when a lifecycle is dropped before it settles.
struct Unsettled {
    kind: String,
    armed: bool,
}

impl Unsettled {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Unsettled {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(
                action = %self.kind,
                "Async payload dropped before it settled; no success or error action will follow"
            );
        }
    }
}

/// Whether a call has produced its success or error action yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Pending,
    Settled,
}

/// One dispatch of an async payload, from start action to settlement.
struct AsyncCall<S> {
    types: DerivedTypes,
    meta: Option<Value>,
    skip_outer: bool,
    throw_original_error: bool,
    store: StoreHandle<S>,
    state: CallState,
}

impl<S: 'static> AsyncCall<S> {
    /// Compute the derived types and dispatch the start action down the chain.
    fn begin(
        options: &ResolvedOptions,
        store: &StoreHandle<S>,
        next: &Dispatcher<S>,
        action: &Action<S>,
    ) -> Self {
        let call = Self {
            types: options.derived_types(&action.kind),
            meta: action.meta.clone(),
            skip_outer: action.skip_outer(),
            throw_original_error: options.throw_original_error,
            store: store.clone(),
            state: CallState::Pending,
        };

        if call.skip_outer {
            tracing::trace!(action = %action.kind, "Skipping start action");
        } else {
            let start = Action::from_parts(
                call.types.start.clone(),
                None,
                action.error,
                call.meta.clone(),
            );
            // Layers below this one see the start action; nothing above does
            let _ = next.dispatch(start);
        }

        call
    }

    async fn run(mut self, work: AsyncValue) -> Result<Dispatched<S>, PayloadError> {
        match work.await {
            Ok(value) => self.fulfill(value),
            Err(err) => self.reject(err),
        }
    }

    /// Claim the right to settle. Only the first caller gets it.
    fn settle(&mut self) -> bool {
        match self.state {
            CallState::Pending => {
                self.state = CallState::Settled;
                true
            }
            CallState::Settled => false,
        }
    }

    fn fulfill(&mut self, value: Value) -> Result<Dispatched<S>, PayloadError> {
        if !self.settle() {
            tracing::debug!(action = %self.types.success, "Ignoring fulfilment of a settled call");
            return Ok(Dispatched::Value(value));
        }

        if self.skip_outer {
            return Ok(Dispatched::Value(value));
        }

        let success = Action::from_parts(
            self.types.success.clone(),
            Some(value),
            Some(false),
            self.meta.clone(),
        );
        Ok(self.store.dispatch(success))
    }

    fn reject(&mut self, err: PayloadError) -> Result<Dispatched<S>, PayloadError> {
        if !self.settle() {
            tracing::debug!(
                action = %self.types.error,
                error = %err,
                "Ignoring failure of a settled call"
            );
            return Err(err);
        }

        let message = err.message();
        tracing::debug!(action = %self.types.error, error = %message, "Async payload failed");

        let failure = Action::from_parts(
            self.types.error.clone(),
            Some(Value::String(message)),
            Some(true),
            self.meta.clone(),
        );
        let dispatched = self.store.dispatch(failure);

        if self.throw_original_error {
            Err(err)
        } else {
            Ok(dispatched)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionRecord;
    use crate::options::Stage;
    use crate::payload::Completion;
    use crate::testing::{noop_reducer, TestHarness};
    use serde_json::json;

    fn harness() -> TestHarness<()> {
        TestHarness::new((), noop_reducer)
    }

    #[test]
    fn test_intercept_defaults() {
        assert_eq!(intercept(None).options(), &ResolvedOptions::default());

        let middleware = intercept(Some(MiddlewareOptions::new().start_suffix("begin")));
        assert_eq!(middleware.options().suffixes.get(Stage::Start), "begin");
        assert_eq!(middleware.options().suffixes.get(Stage::Success), "success");
    }

    #[test]
    fn test_falsy_payload_passes_through() {
        let mut harness = harness();

        for payload in [Value::Null, json!(false), json!(0), json!("")] {
            let result = harness.dispatch(Action::new("foo").with_payload(payload.clone()));
            assert_eq!(
                result.into_record(),
                Some(ActionRecord::new("foo").payload(payload.clone()))
            );
            assert_eq!(
                harness.drain_history(),
                vec![ActionRecord::new("foo").payload(payload)]
            );
        }
    }

    #[test]
    fn test_plain_payload_passes_through() {
        let mut harness = harness();

        let result = harness.dispatch(
            Action::new("foo")
                .with_payload(json!({"a": 1}))
                .with_meta(json!({"asyncPayload": {"skipOuter": true}})),
        );

        let expected = ActionRecord::new("foo")
            .payload(json!({"a": 1}))
            .meta(json!({"asyncPayload": {"skipOuter": true}}));
        assert_eq!(result.into_record(), Some(expected.clone()));
        assert_eq!(harness.drain_history(), vec![expected]);
    }

    #[test]
    fn test_start_action_carries_error_flag_and_meta() {
        let harness = harness();

        let _pending = harness.dispatch(
            Action::new("foo")
                .with_pending(future::pending())
                .with_meta(json!({"id": 3}))
                .with_error(true),
        );

        assert_eq!(
            harness.history(),
            vec![ActionRecord::new("foo/start").meta(json!({"id": 3})).error(true)]
        );
    }

    #[test]
    fn test_sync_failure_is_reported_before_polling() {
        let harness = harness();

        let pending = harness.dispatch(Action::new("foo").with_work(|_, _| {
            Err(PayloadError::msg("the error message"))
        }));

        assert!(pending.is_pending());
        assert_eq!(
            harness.history(),
            vec![
                ActionRecord::new("foo/start"),
                ActionRecord::new("foo/error")
                    .payload("the error message")
                    .error(true),
            ]
        );
    }

    #[tokio::test]
    async fn test_executable_receives_state() {
        let harness = TestHarness::new(41, noop_reducer);

        let result = harness
            .dispatch(
                Action::new("read").with_work(|_, state| Ok(Completion::ready(state.get() + 1))),
            )
            .settle()
            .await
            .unwrap();

        assert_eq!(result.into_record().unwrap().payload, Some(json!(42)));
    }

    #[test]
    fn test_reject_then_fulfill_dispatches_once() {
        let harness = harness();
        let action: Action<()> = Action::new("foo").with_meta(json!({"id": 1}));
        let next = harness.store().handle().dispatcher();
        let mut call = AsyncCall::begin(
            &ResolvedOptions::default(),
            &harness.store().handle(),
            &next,
            &action,
        );

        let err = PayloadError::msg("boom");
        let rejected = call.reject(err.clone()).unwrap_err();
        assert!(PayloadError::ptr_eq(&rejected, &err));

        let late = call.fulfill(json!("late")).unwrap();
        assert_eq!(late.into_value(), Some(json!("late")));

        let late = call.reject(PayloadError::msg("again")).unwrap_err();
        assert_eq!(late.message(), "again");

        assert_eq!(
            harness.kinds(),
            vec!["foo/start".to_string(), "foo/error".to_string()]
        );
    }

    #[test]
    fn test_fulfill_then_reject_dispatches_once() {
        let harness = harness();
        let action: Action<()> = Action::new("foo").skipping_outer();
        let next = harness.store().handle().dispatcher();
        let mut call = AsyncCall::begin(
            &ResolvedOptions::default(),
            &harness.store().handle(),
            &next,
            &action,
        );

        let value = call.fulfill(json!(1)).unwrap();
        assert_eq!(value.into_value(), Some(json!(1)));
        assert!(call.reject(PayloadError::msg("late")).is_err());

        assert!(harness.history().is_empty());
    }

    #[test]
    fn test_unspawned_lifecycle_stops_when_dropped() {
        let harness = harness();

        drop(harness.dispatch(Action::new("foo").with_pending(async { Ok(json!(1)) })));

        assert_eq!(harness.kinds(), vec!["foo/start".to_string()]);
    }

    #[tokio::test]
    async fn test_spawner_receives_lifecycle_at_dispatch() {
        let tasks = Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = Rc::clone(&tasks);
        let harness = harness().with_spawner(crate::tasks::Spawner::new(move |task| {
            sink.borrow_mut().push(task)
        }));

        drop(harness.dispatch(Action::new("foo").with_pending(async { Ok(json!(1)) })));
        assert_eq!(tasks.borrow().len(), 1);

        let task = tasks.borrow_mut().pop().unwrap();
        task.await;
        assert_eq!(
            harness.history(),
            vec![
                ActionRecord::new("foo/start"),
                ActionRecord::new("foo/success").payload(1).error(false),
            ]
        );
    }
}

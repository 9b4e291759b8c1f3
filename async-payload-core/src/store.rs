//! Centralized state store with reducer pattern and middleware chain

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::action::Action;
use crate::dispatch::{Dispatched, Dispatcher};
use crate::payload::Payload;
use crate::tasks::Spawner;

/// A reducer function that handles actions and mutates state
///
/// Returns `true` if the state changed.
pub type Reducer<S> = fn(&mut S, &Action<S>) -> bool;

/// Read access to the store's state, handed to executable payloads.
pub struct StateReader<S> {
    state: Rc<RefCell<S>>,
}

impl<S> StateReader<S> {
    /// Run `f` with a reference to the current state
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.state.borrow();
        f(&*state)
    }
}

impl<S: Clone> StateReader<S> {
    /// Get a copy of the current state
    pub fn get(&self) -> S {
        self.state.borrow().clone()
    }
}

impl<S> Clone for StateReader<S> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

type RootSlot<S> = RefCell<Option<Dispatcher<S>>>;
type SpawnerSlot = Rc<RefCell<Option<Spawner>>>;

/// The store as seen by middleware: root dispatch plus state access.
///
/// Dispatching through the handle enters the chain from the top, so the
/// action passes through every middleware again. The handle holds the chain
/// weakly; dispatching before the chain is built or after the store is
/// dropped logs a warning and hands the action back unreduced.
pub struct StoreHandle<S> {
    state: Rc<RefCell<S>>,
    root: Weak<RootSlot<S>>,
    spawner: SpawnerSlot,
}

impl<S: 'static> StoreHandle<S> {
    /// Dispatch an action from the top of the chain
    pub fn dispatch(&self, action: Action<S>) -> Dispatched<S> {
        let slot = self.root.upgrade();
        let root = slot.as_ref().and_then(|slot| slot.borrow().clone());
        match root {
            Some(root) => root.dispatch(action),
            None => {
                tracing::warn!(action = %action.kind, "Dispatch with no middleware chain attached");
                Dispatched::Action(action)
            }
        }
    }

    /// A dispatcher that enters the chain from the top
    pub fn dispatcher(&self) -> Dispatcher<S> {
        let handle = self.clone();
        Dispatcher::new(move |action| handle.dispatch(action))
    }

    pub fn state_reader(&self) -> StateReader<S> {
        StateReader {
            state: Rc::clone(&self.state),
        }
    }

    /// The spawner attached to the store, if any
    pub fn spawner(&self) -> Option<Spawner> {
        self.spawner.borrow().clone()
    }
}

impl<S: Clone> StoreHandle<S> {
    /// Get a copy of the current state
    pub fn get_state(&self) -> S {
        self.state.borrow().clone()
    }
}

impl<S> Clone for StoreHandle<S> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            root: Weak::clone(&self.root),
            spawner: Rc::clone(&self.spawner),
        }
    }
}

impl<S> fmt::Debug for StoreHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("attached", &(self.root.strong_count() > 0))
            .finish()
    }
}

/// Centralized state store with Redux-like reducer pattern
///
/// The store holds the application state and routes every dispatched action
/// through its middleware chain before it reaches the reducer.
///
/// # Example
/// ```
/// use async_payload_core::{Action, Store};
///
/// #[derive(Clone, Default)]
/// struct AppState {
///     counter: i32,
/// }
///
/// fn reducer(state: &mut AppState, action: &Action<AppState>) -> bool {
///     match action.kind.as_str() {
///         "increment" => {
///             state.counter += 1;
///             true
///         }
///         _ => false,
///     }
/// }
///
/// let store = Store::new(AppState::default(), reducer);
/// let _ = store.dispatch(Action::new("increment"));
/// assert_eq!(store.state().counter, 1);
/// ```
pub struct Store<S> {
    state: Rc<RefCell<S>>,
    root: Rc<RootSlot<S>>,
    spawner: SpawnerSlot,
}

impl<S: 'static> Store<S> {
    /// Create a new store with initial state and reducer
    pub fn new(state: S, reducer: Reducer<S>) -> Self {
        Self::with_middleware(state, reducer, NoopMiddleware)
    }

    /// Create a new store whose dispatch runs through `middleware`
    pub fn with_middleware<M>(state: S, reducer: Reducer<S>, middleware: M) -> Self
    where
        M: Middleware<S>,
    {
        let store = Self {
            state: Rc::new(RefCell::new(state)),
            root: Rc::new(RefCell::new(None)),
            spawner: Rc::new(RefCell::new(None)),
        };

        let reduce = reduce_dispatcher(Rc::clone(&store.state), reducer);
        let chain = middleware.wrap(store.handle(), reduce);
        *store.root.borrow_mut() = Some(chain);

        store
    }

    /// Run in-flight async lifecycles on `spawner` from the moment they begin
    pub fn with_spawner(self, spawner: Spawner) -> Self {
        self.set_spawner(spawner);
        self
    }

    pub fn set_spawner(&self, spawner: Spawner) {
        *self.spawner.borrow_mut() = Some(spawner);
    }

    /// Dispatch an action through the middleware chain
    pub fn dispatch(&self, action: Action<S>) -> Dispatched<S> {
        self.handle().dispatch(action)
    }

    /// Get a reference to the current state
    ///
    /// Do not hold the reference across a dispatch.
    pub fn state(&self) -> Ref<'_, S> {
        self.state.borrow()
    }

    pub fn handle(&self) -> StoreHandle<S> {
        StoreHandle {
            state: Rc::clone(&self.state),
            root: Rc::downgrade(&self.root),
            spawner: Rc::clone(&self.spawner),
        }
    }
}

impl<S: Clone + 'static> Store<S> {
    /// Get a copy of the current state
    pub fn get_state(&self) -> S {
        self.state.borrow().clone()
    }
}

/// The end of every chain: apply the reducer and hand the action back.
fn reduce_dispatcher<S: 'static>(state: Rc<RefCell<S>>, reducer: Reducer<S>) -> Dispatcher<S> {
    Dispatcher::new(move |action: Action<S>| {
        let changed = reducer(&mut *state.borrow_mut(), &action);
        tracing::trace!(action = %action.kind, state_changed = changed, "Reduced action");
        Dispatched::Action(action)
    })
}

/// Middleware trait for intercepting actions
///
/// `wrap` is called once when the store is built. It receives the store
/// handle (root dispatch and state) and the rest of the chain, and returns
/// the dispatcher that takes this middleware's place in the chain.
pub trait Middleware<S> {
    fn wrap(&self, store: StoreHandle<S>, next: Dispatcher<S>) -> Dispatcher<S>;
}

impl<S, M: Middleware<S> + ?Sized> Middleware<S> for Box<M> {
    fn wrap(&self, store: StoreHandle<S>, next: Dispatcher<S>) -> Dispatcher<S> {
        (**self).wrap(store, next)
    }
}

/// A no-op middleware that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl<S> Middleware<S> for NoopMiddleware {
    fn wrap(&self, _store: StoreHandle<S>, next: Dispatcher<S>) -> Dispatcher<S> {
        next
    }
}

/// Middleware that logs actions (for debugging)
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Whether to log before dispatch
    pub log_before: bool,
    /// Whether to log after dispatch
    pub log_after: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings (log after only)
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Create a logging middleware that logs both before and after
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl<S: 'static> Middleware<S> for LoggingMiddleware {
    fn wrap(&self, _store: StoreHandle<S>, next: Dispatcher<S>) -> Dispatcher<S> {
        let (log_before, log_after) = (self.log_before, self.log_after);
        Dispatcher::new(move |action: Action<S>| {
            let kind = log_after.then(|| action.kind.clone());
            if log_before {
                tracing::debug!(
                    action = %action.kind,
                    payload = ?action.payload.as_ref().map(Payload::kind),
                    "Dispatching action"
                );
            }

            let result = next.dispatch(action);

            if let Some(kind) = kind {
                tracing::debug!(
                    action = %kind,
                    pending = result.is_pending(),
                    "Action processed"
                );
            }
            result
        })
    }
}

/// Compose multiple middleware into a single middleware
///
/// The first middleware added is the outermost: it sees an action first and
/// its `next` is the second middleware.
pub struct ComposedMiddleware<S> {
    middlewares: Vec<Box<dyn Middleware<S>>>,
}

impl<S> fmt::Debug for ComposedMiddleware<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedMiddleware")
            .field("middlewares_count", &self.middlewares.len())
            .finish()
    }
}

impl<S> Default for ComposedMiddleware<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ComposedMiddleware<S> {
    /// Create a new composed middleware
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Add a middleware to the composition
    pub fn add<M: Middleware<S> + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    /// Builder form of [`add`](Self::add)
    pub fn with<M: Middleware<S> + 'static>(mut self, middleware: M) -> Self {
        self.add(middleware);
        self
    }
}

impl<S> Middleware<S> for ComposedMiddleware<S> {
    fn wrap(&self, store: StoreHandle<S>, next: Dispatcher<S>) -> Dispatcher<S> {
        // Wrap innermost first so the first added ends up outermost
        self.middlewares
            .iter()
            .rev()
            .fold(next, |next, middleware| middleware.wrap(store.clone(), next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct TestState {
        counter: i32,
    }

    fn test_reducer(state: &mut TestState, action: &Action<TestState>) -> bool {
        match action.kind.as_str() {
            "Increment" => {
                state.counter += 1;
                true
            }
            "Decrement" => {
                state.counter -= 1;
                true
            }
            _ => false,
        }
    }

    #[test]
    fn test_store_dispatch() {
        let store = Store::new(TestState::default(), test_reducer);

        let _ = store.dispatch(Action::new("Increment"));
        assert_eq!(store.state().counter, 1);

        let _ = store.dispatch(Action::new("Increment"));
        assert_eq!(store.state().counter, 2);

        let _ = store.dispatch(Action::new("Decrement"));
        assert_eq!(store.get_state().counter, 1);
    }

    #[test]
    fn test_store_returns_action() {
        let store = Store::new(TestState::default(), test_reducer);

        let result = store.dispatch(Action::new("NoOp").with_payload(5));
        let record = result.into_record().unwrap();
        assert_eq!(record.kind, "NoOp");
        assert_eq!(record.payload, Some(serde_json::json!(5)));
        assert_eq!(store.state().counter, 0);
    }

    /// Appends its tag to a shared trace on every action it sees
    struct TraceMiddleware {
        tag: &'static str,
        trace: Rc<RefCell<Vec<String>>>,
    }

    impl Middleware<TestState> for TraceMiddleware {
        fn wrap(
            &self,
            _store: StoreHandle<TestState>,
            next: Dispatcher<TestState>,
        ) -> Dispatcher<TestState> {
            let tag = self.tag;
            let trace = Rc::clone(&self.trace);
            Dispatcher::new(move |action: Action<TestState>| {
                trace.borrow_mut().push(format!("{}:{}", tag, action.kind));
                next.dispatch(action)
            })
        }
    }

    #[test]
    fn test_composed_order() {
        let trace = Rc::new(RefCell::new(Vec::new()));
        let middleware = ComposedMiddleware::new()
            .with(TraceMiddleware {
                tag: "outer",
                trace: Rc::clone(&trace),
            })
            .with(LoggingMiddleware::verbose())
            .with(TraceMiddleware {
                tag: "inner",
                trace: Rc::clone(&trace),
            });
        let store = Store::with_middleware(TestState::default(), test_reducer, middleware);

        let _ = store.dispatch(Action::new("Increment"));

        assert_eq!(*trace.borrow(), vec!["outer:Increment", "inner:Increment"]);
        assert_eq!(store.state().counter, 1);
    }

    /// Re-dispatches `Ping` as `Pong` from the top of the chain
    struct EchoMiddleware;

    impl Middleware<TestState> for EchoMiddleware {
        fn wrap(
            &self,
            store: StoreHandle<TestState>,
            next: Dispatcher<TestState>,
        ) -> Dispatcher<TestState> {
            Dispatcher::new(move |action: Action<TestState>| {
                if action.kind == "Ping" {
                    return store.dispatch(Action::new("Increment"));
                }
                next.dispatch(action)
            })
        }
    }

    #[test]
    fn test_root_dispatch_reenters_chain() {
        let trace = Rc::new(RefCell::new(Vec::new()));
        let middleware = ComposedMiddleware::new()
            .with(TraceMiddleware {
                tag: "outer",
                trace: Rc::clone(&trace),
            })
            .with(EchoMiddleware);
        let store = Store::with_middleware(TestState::default(), test_reducer, middleware);

        let _ = store.dispatch(Action::new("Ping"));

        assert_eq!(*trace.borrow(), vec!["outer:Ping", "outer:Increment"]);
        assert_eq!(store.state().counter, 1);
    }

    #[test]
    fn test_handle_after_store_dropped() {
        let store = Store::new(TestState::default(), test_reducer);
        let handle = store.handle();
        drop(store);

        let result = handle.dispatch(Action::new("Increment"));
        assert_eq!(result.into_record().unwrap().kind, "Increment");
        assert_eq!(handle.get_state().counter, 0);
    }

    #[test]
    fn test_state_reader() {
        let store = Store::new(TestState::default(), test_reducer);
        let reader = store.handle().state_reader();

        let _ = store.dispatch(Action::new("Increment"));

        assert_eq!(reader.get().counter, 1);
        assert_eq!(reader.with(|state| state.counter * 10), 10);
    }

    #[test]
    fn test_spawner_is_shared_with_handles() {
        let store = Store::new(TestState::default(), test_reducer);
        let handle = store.handle();
        assert!(handle.spawner().is_none());

        store.set_spawner(Spawner::new(|_task| {}));
        assert!(handle.spawner().is_some());
    }
}

//! The state container.

use indexmap::IndexMap;
use tracing::debug;

use crate::compose::CombinedReducer;
use crate::error::{Result, StoreError};
use crate::traits::ActionLike;

/// Slot name -> fragment, in first-touch order.
pub type State<F> = IndexMap<String, F>;

/// Exclusively owns one state mapping and the combined reducer that updates it.
///
/// Single-threaded by construction: every write takes `&mut self`, so
/// overlapping dispatches cannot compile. Callers that run background work must
/// join it before reading state back.
pub struct StateContainer<A, F> {
    reducer: CombinedReducer<A, F>,
    state: State<F>,
    disposed: bool,
}

impl<A, F> StateContainer<A, F>
where
    A: ActionLike,
    F: Default,
{
    pub fn new(reducer: CombinedReducer<A, F>) -> Self {
        Self {
            reducer,
            state: State::new(),
            disposed: false,
        }
    }

    /// Apply `action` to every registered slot, in registration order.
    pub fn dispatch(&mut self, action: &A) -> Result<()> {
        self.ensure_live()?;
        debug!(action = action.action_type(), "dispatch");
        self.reducer.reduce_all(&mut self.state, action)
    }

    /// Apply `action` to the named slots only, in the given order.
    pub fn dispatch_to<K: AsRef<str>>(&mut self, action: &A, keys: &[K]) -> Result<()> {
        self.ensure_live()?;
        debug!(
            action = action.action_type(),
            targets = keys.len(),
            "dispatch to targets"
        );
        self.reducer.reduce_targets(&mut self.state, action, keys)
    }

    /// Run `selector` against the current state. Never mutates.
    pub fn select<R>(&self, selector: impl FnOnce(&State<F>) -> R) -> R {
        selector(&self.state)
    }

    /// Return the current state and leave the container empty.
    pub fn drain(&mut self) -> State<F> {
        std::mem::take(&mut self.state)
    }

    /// Empty the container and refuse further dispatches. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.state.clear();
        self.disposed = true;
        debug!("container disposed");
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(StoreError::Disposed);
        }
        Ok(())
    }
}

impl<A, F> StateContainer<A, F> {
    /// Shallow copy of the current state.
    pub fn snapshot(&self) -> State<F>
    where
        F: Clone,
    {
        self.state.clone()
    }

    pub fn get(&self, key: &str) -> Option<&F> {
        self.state.get(key)
    }

    /// Slots touched so far, in first-touch order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.state.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn reducer(&self) -> &CombinedReducer<A, F> {
        &self.reducer
    }
}

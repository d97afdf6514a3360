//! `Store`: the scored-access facade over a `StateContainer`.
//!
//! `score` is the seam where declarative configuration meets an installer:
//! optionally dispatch, extract one fragment per requested key, hand each to
//! a collector in request order.

use tracing::debug;
use uuid::Uuid;

use crate::compose::{CombinedReducer, ReducerComposer};
use crate::container::{State, StateContainer};
use crate::error::{Result, StoreError};
use crate::traits::ActionLike;

pub struct Store<A, F> {
    id: Uuid,
    container: StateContainer<A, F>,
}

impl<A, F> Store<A, F>
where
    A: ActionLike,
    F: Default + Clone,
{
    pub fn new(reducer: CombinedReducer<A, F>) -> Self {
        Self {
            id: Uuid::new_v4(),
            container: StateContainer::new(reducer),
        }
    }

    /// Compose `reducers` and wrap the result in a fresh store.
    pub fn build(reducers: ReducerComposer<A, F>) -> Result<Self> {
        Ok(Self::new(reducers.compose()?))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dispatch(&mut self, action: &A) -> Result<()> {
        self.container.dispatch(action)
    }

    pub fn dispatch_to<K: AsRef<str>>(&mut self, action: &A, keys: &[K]) -> Result<()> {
        self.container.dispatch_to(action, keys)
    }

    pub fn snapshot(&self) -> State<F> {
        self.container.snapshot()
    }

    pub fn fetch(&self) -> State<F> {
        self.snapshot()
    }

    pub fn select<R>(&self, selector: impl FnOnce(&State<F>) -> R) -> R {
        self.container.select(selector)
    }

    pub fn connect<R>(&self, selector: impl FnOnce(&State<F>) -> R) -> R {
        self.select(selector)
    }

    pub fn drain(&mut self) -> State<F> {
        self.container.drain()
    }

    pub fn dispose(&mut self) {
        self.container.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.container.is_disposed()
    }

    pub fn container(&self) -> &StateContainer<A, F> {
        &self.container
    }

    /// Fragments for `keys`, in request order. Untouched slots read as
    /// `F::default()`.
    pub fn values<K: AsRef<str>>(&self, keys: &[K]) -> Vec<F> {
        self.select(|state| {
            keys.iter()
                .map(|key| state.get(key.as_ref()).cloned().unwrap_or_default())
                .collect()
        })
    }

    /// Dispatch `action` (if any) to every slot, then feed the fragment of
    /// each key in `keys` to `collector`, once each, in request order.
    pub fn score<K, C>(&mut self, keys: &[K], action: Option<&A>, collector: C) -> Result<()>
    where
        K: AsRef<str>,
        C: FnMut(&F) -> anyhow::Result<()>,
    {
        self.score_inspect(keys, action, |_| Ok(()), collector)
    }

    /// Like [`Store::score`], with `inspect` observing the whole tuple once
    /// before the collector runs.
    pub fn score_inspect<K, I, C>(
        &mut self,
        keys: &[K],
        action: Option<&A>,
        inspect: I,
        mut collector: C,
    ) -> Result<()>
    where
        K: AsRef<str>,
        I: FnOnce(&[F]) -> anyhow::Result<()>,
        C: FnMut(&F) -> anyhow::Result<()>,
    {
        if let Some(action) = action {
            self.dispatch(action)?;
        }

        let values = self.values(keys);
        debug!(store = %self.id, keys = keys.len(), "score");

        inspect(&values).map_err(StoreError::Inspect)?;

        for (key, value) in keys.iter().zip(&values) {
            collector(value).map_err(|source| StoreError::Collector {
                key: key.as_ref().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

impl<A, F> std::fmt::Debug for Store<A, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("reducer", self.container.reducer())
            .field("disposed", &self.container.is_disposed())
            .finish()
    }
}

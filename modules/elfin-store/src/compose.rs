//! Binds named reducers into one combined reducer.

use std::fmt;

use indexmap::IndexMap;
use tracing::trace;

use crate::container::State;
use crate::error::{Result, StoreError};
use crate::traits::{Reducer, Reduction};

type BoxedReducer<A, F> = Box<dyn Reducer<A, F>>;

/// Collects `name -> reducer` bindings in registration order.
///
/// Nothing is validated until [`ReducerComposer::compose`].
pub struct ReducerComposer<A, F> {
    entries: Vec<(String, BoxedReducer<A, F>)>,
}

impl<A, F> ReducerComposer<A, F> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, reducer: impl Reducer<A, F> + 'static) -> Self {
        self.register(name, reducer);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, reducer: impl Reducer<A, F> + 'static) {
        self.entries.push((name.into(), Box::new(reducer)));
    }

    /// Registered names, in registration order (duplicates included).
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze the registry. An empty composer is legal and targets no slots;
    /// registering the same name twice is a configuration error.
    pub fn compose(self) -> Result<CombinedReducer<A, F>> {
        let mut reducers = IndexMap::with_capacity(self.entries.len());
        for (name, reducer) in self.entries {
            if reducers.contains_key(&name) {
                return Err(StoreError::DuplicateKey(name));
            }
            reducers.insert(name, reducer);
        }
        Ok(CombinedReducer { reducers })
    }
}

impl<A, F> Default for ReducerComposer<A, F> {
    fn default() -> Self {
        Self::new()
    }
}

/// An immutable, order-preserving registry of slot reducers.
pub struct CombinedReducer<A, F> {
    reducers: IndexMap<String, BoxedReducer<A, F>>,
}

impl<A, F: Default> CombinedReducer<A, F> {
    /// Run every registered reducer, in registration order.
    pub fn reduce_all(&self, state: &mut State<F>, action: &A) -> Result<()> {
        for (key, reducer) in &self.reducers {
            apply(key, reducer.as_ref(), state, action)?;
        }
        Ok(())
    }

    /// Run only the reducers named in `keys`, in the given order.
    ///
    /// Fails on the first unknown key. Slots reduced before it keep their new
    /// values; the unknown slot itself is never created.
    pub fn reduce_targets<K: AsRef<str>>(
        &self,
        state: &mut State<F>,
        action: &A,
        keys: &[K],
    ) -> Result<()> {
        for key in keys {
            let key = key.as_ref();
            let reducer = self
                .reducers
                .get(key)
                .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?;
            apply(key, reducer.as_ref(), state, action)?;
        }
        Ok(())
    }
}

impl<A, F> CombinedReducer<A, F> {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.reducers.keys().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.reducers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<A, F> fmt::Debug for CombinedReducer<A, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedReducer")
            .field("keys", &self.reducers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn apply<A, F: Default>(
    key: &str,
    reducer: &dyn Reducer<A, F>,
    state: &mut State<F>,
    action: &A,
) -> Result<()> {
    // Lazy init: first touch starts from an empty fragment.
    let fragment = state.entry(key.to_string()).or_default();

    let reduction = reducer
        .reduce(fragment, action)
        .map_err(|source| StoreError::Reducer {
            key: key.to_string(),
            source,
        })?;

    match reduction {
        Reduction::Keep => trace!(slot = key, "reducer kept fragment"),
        Reduction::Replace(next) => *fragment = next,
    }
    Ok(())
}

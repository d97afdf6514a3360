//! Suite-level fixture store.
//!
//! Built once before a suite runs, scored into the stub or mock installer
//! by each test's setup (usually a different key subset per installer), and
//! disposed once at teardown.

use elfin_store::{ActionLike, State, Store, StoreError};
use tracing::{debug, warn};

use crate::error::Result;
use crate::stubs::{StubRegistry, StubSet};
use crate::webmocks::{MockRegistry, MockSet};

/// One slot of the fixture store: stubs and mocks it contributes.
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    pub stubs: StubSet,
    pub mocks: MockSet,
}

impl Fixture {
    pub fn with_stubs(mut self, stubs: StubSet) -> Self {
        self.stubs = stubs;
        self
    }

    pub fn with_mocks(mut self, mocks: MockSet) -> Self {
        self.mocks = mocks;
        self
    }
}

/// A long-lived store wired to a harness's installers.
pub struct FixtureStore<A: ActionLike> {
    store: Store<A, Fixture>,
    stubs: StubRegistry,
    mocks: MockRegistry,
}

impl<A: ActionLike> FixtureStore<A> {
    pub(crate) fn new(store: Store<A, Fixture>, stubs: StubRegistry, mocks: MockRegistry) -> Self {
        Self { store, stubs, mocks }
    }

    pub fn dispatch(&mut self, action: &A) -> Result<()> {
        Ok(self.store.dispatch(action)?)
    }

    /// Install the stubs of `keys` (dispatching `action` first, if given).
    pub fn install_stubs<K: AsRef<str>>(&mut self, keys: &[K], action: Option<&A>) -> Result<()> {
        self.ensure_live()?;
        self.store
            .score(keys, action, |fixture| self.stubs.install(&fixture.stubs))?;
        debug!(store = %self.store.id(), slots = keys.len(), "fixture stubs installed");
        Ok(())
    }

    /// Install the HTTP mocks of `keys` (dispatching `action` first, if given).
    pub fn install_mocks<K: AsRef<str>>(&mut self, keys: &[K], action: Option<&A>) -> Result<()> {
        self.ensure_live()?;
        self.store
            .score(keys, action, |fixture| self.mocks.install(&fixture.mocks))?;
        debug!(store = %self.store.id(), slots = keys.len(), "fixture mocks installed");
        Ok(())
    }

    pub fn snapshot(&self) -> State<Fixture> {
        self.store.snapshot()
    }

    /// Suite teardown. Idempotent.
    pub fn dispose(&mut self) {
        if !self.store.is_disposed() {
            debug!(store = %self.store.id(), "fixture store disposed");
        }
        self.store.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.store.is_disposed()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.store.is_disposed() {
            return Err(StoreError::Disposed.into());
        }
        Ok(())
    }
}

impl<A: ActionLike> Drop for FixtureStore<A> {
    fn drop(&mut self) {
        if !self.store.is_disposed() {
            warn!(store = %self.store.id(), "fixture store dropped without dispose");
        }
    }
}

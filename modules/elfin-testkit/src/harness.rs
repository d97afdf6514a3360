//! Per-suite wiring: load declared doubles, poll, join background work.

use std::any::Any;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use elfin_store::{ActionLike, ReducerComposer, Store};
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::error::{Result, TestkitError};
use crate::fixture::{Fixture, FixtureStore};
use crate::stubs::{StubRegistry, StubSet};
use crate::webmocks::{MockRegistry, MockSet};

pub struct Harness {
    config: HarnessConfig,
    stubs: StubRegistry,
    mocks: MockRegistry,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            stubs: StubRegistry::new(),
            mocks: MockRegistry::with_default_status(config.default_status),
            background: Mutex::new(Vec::new()),
            config,
        }
    }

    pub fn from_env() -> Result<Self> {
        let config = HarnessConfig::from_env()?;
        config.log_summary();
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn stubs(&self) -> &StubRegistry {
        &self.stubs
    }

    pub fn mocks(&self) -> &MockRegistry {
        &self.mocks
    }

    /// Build the long-lived fixture store for a suite, wired to this
    /// harness's installers. Dispose it once at teardown.
    pub fn fixture_store<A: ActionLike>(
        &self,
        reducers: ReducerComposer<A, Fixture>,
    ) -> Result<FixtureStore<A>> {
        let store = Store::build(reducers)?;
        debug!(store = %store.id(), "fixture store built");
        Ok(FixtureStore::new(store, self.stubs.clone(), self.mocks.clone()))
    }

    /// Build a short-lived store per composer, dispatch `action` to every
    /// slot, and install each slot's fragment.
    pub fn load_dependencies<A: ActionLike>(
        &self,
        action: &A,
        stubs: Option<ReducerComposer<A, StubSet>>,
        mocks: Option<ReducerComposer<A, MockSet>>,
    ) -> Result<()> {
        if let Some(stubs) = stubs {
            let keys = stubs.keys();
            let mut store = Store::build(stubs)?;
            store.score(&keys, Some(action), |set| self.stubs.install(set))?;
            debug!(store = %store.id(), slots = keys.len(), "stubs loaded");
        }

        if let Some(mocks) = mocks {
            let keys = mocks.keys();
            let mut store = Store::build(mocks)?;
            store.score(&keys, Some(action), |set| self.mocks.install(set))?;
            debug!(store = %store.id(), slots = keys.len(), "mocks loaded");
        }

        Ok(())
    }

    /// Poll until `poll` yields a value. Gives up with `Timeout` after the
    /// configured number of attempts. In dependencies-only mode nothing is
    /// polled and `None` comes back.
    pub fn wait_until<T>(
        &self,
        mut poll: impl FnMut() -> anyhow::Result<Option<T>>,
    ) -> Result<Option<T>> {
        if self.config.run_dependencies_only {
            return Ok(None);
        }

        let attempts = self.config.retry_attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(value) = poll()? {
                debug!(attempt, "condition met");
                return Ok(Some(value));
            }
            if attempt < attempts {
                thread::sleep(self.config.retry_interval);
            }
        }
        Err(TestkitError::Timeout { attempts })
    }

    /// Run `task` on a background thread tracked by this harness.
    pub fn spawn(&self, task: impl FnOnce() + Send + 'static) {
        let handle = thread::spawn(task);
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Join every background task. Must run before state written by those
    /// tasks is read back. Reports the first panic after joining them all.
    pub fn await_background(&self) -> Result<()> {
        let handles: Vec<_> = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        let joined = handles.len();
        let mut first_panic = None;
        for handle in handles {
            if let Err(payload) = handle.join() {
                first_panic.get_or_insert_with(|| panic_message(payload.as_ref()));
            }
        }

        if joined > 0 {
            info!(joined, "background tasks joined");
        }
        match first_panic {
            Some(message) => Err(TestkitError::Background(message)),
            None => Ok(()),
        }
    }

    /// Check every stub expectation installed so far.
    pub fn verify(&self) -> Result<()> {
        self.stubs.verify()
    }

    /// Drop all doubles and executed-request history.
    pub fn reset(&self) {
        self.stubs.reset();
        self.mocks.reset();
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

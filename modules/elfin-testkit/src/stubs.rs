//! Method stubs: canned responses for named providers.
//!
//! A `StubSet` is the fragment a stub reducer owns: provider name -> method
//! name -> behavior. `StubRegistry::install` is the collector that makes a
//! set live; the code under test then goes through `StubRegistry::call`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, TestkitError};

/// Predicate over the arguments of a call. Returning `false` rejects the call.
pub type Intercept = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

const DEFAULT_EXCEPTION: &str = "RuntimeError";

/// A call that must happen: exactly `times` times, or at least once.
#[derive(Clone)]
pub struct Expectation {
    pub response: Value,
    pub times: Option<u32>,
    pub intercept: Option<Intercept>,
}

impl Expectation {
    pub fn returning(response: impl Into<Value>) -> Self {
        Self {
            response: response.into(),
            times: None,
            intercept: None,
        }
    }

    pub fn times(mut self, times: u32) -> Self {
        self.times = Some(times);
        self
    }

    pub fn intercept(mut self, predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.intercept = Some(Arc::new(predicate));
        self
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("response", &self.response)
            .field("times", &self.times)
            .field("intercept", &self.intercept.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum StubBehavior {
    Returns(Value),
    Raises {
        error: String,
        exception: Option<String>,
    },
    Expects(Expectation),
}

impl StubBehavior {
    pub fn returns(value: impl Into<Value>) -> Self {
        StubBehavior::Returns(value.into())
    }

    pub fn raises(error: impl Into<String>) -> Self {
        StubBehavior::Raises {
            error: error.into(),
            exception: None,
        }
    }

    pub fn raises_as(exception: impl Into<String>, error: impl Into<String>) -> Self {
        StubBehavior::Raises {
            error: error.into(),
            exception: Some(exception.into()),
        }
    }
}

impl From<Expectation> for StubBehavior {
    fn from(expectation: Expectation) -> Self {
        StubBehavior::Expects(expectation)
    }
}

/// Provider -> method -> behavior, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StubSet {
    providers: IndexMap<String, IndexMap<String, StubBehavior>>,
}

impl StubSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        provider: impl Into<String>,
        method: impl Into<String>,
        behavior: impl Into<StubBehavior>,
    ) -> Self {
        self.insert(provider, method, behavior);
        self
    }

    pub fn insert(
        &mut self,
        provider: impl Into<String>,
        method: impl Into<String>,
        behavior: impl Into<StubBehavior>,
    ) {
        self.providers
            .entry(provider.into())
            .or_default()
            .insert(method.into(), behavior.into());
    }

    pub fn get(&self, provider: &str, method: &str) -> Option<&StubBehavior> {
        self.providers.get(provider)?.get(method)
    }

    /// Every `(provider, method, behavior)` entry.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &StubBehavior)> {
        self.providers.iter().flat_map(|(provider, methods)| {
            methods
                .iter()
                .map(move |(method, behavior)| (provider.as_str(), method.as_str(), behavior))
        })
    }

    pub fn len(&self) -> usize {
        self.providers.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for StubBehavior {
    fn from(value: &str) -> Self {
        StubBehavior::Returns(Value::from(value))
    }
}

impl From<Value> for StubBehavior {
    fn from(value: Value) -> Self {
        StubBehavior::Returns(value)
    }
}

/// A call that reached a stub and was answered.
#[derive(Debug, Clone, PartialEq)]
pub struct StubCall {
    pub provider: String,
    pub method: String,
    pub args: Value,
}

#[derive(Default)]
struct Installed {
    stubs: HashMap<(String, String), StubBehavior>,
    calls: Vec<StubCall>,
}

/// Live stub table. Cheap to clone; clones share the same table, so one
/// handle can be given to the code under test and another kept for checks.
#[derive(Clone, Default)]
pub struct StubRegistry {
    inner: Arc<Mutex<Installed>>,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every entry of `set` live. Later installs of the same
    /// provider/method replace earlier ones.
    pub fn install(&self, set: &StubSet) -> anyhow::Result<()> {
        let mut installed = self.lock();
        for (provider, method, behavior) in set.iter() {
            debug!(provider, method, "stub installed");
            installed
                .stubs
                .insert((provider.to_string(), method.to_string()), behavior.clone());
        }
        Ok(())
    }

    /// Invoke a stubbed method.
    pub fn call(&self, provider: &str, method: &str, args: Value) -> Result<Value> {
        let behavior = self
            .lock()
            .stubs
            .get(&(provider.to_string(), method.to_string()))
            .cloned()
            .ok_or_else(|| TestkitError::NoStub {
                provider: provider.to_string(),
                method: method.to_string(),
            })?;

        // Predicates run unlocked; they are caller code.
        let outcome = match behavior {
            StubBehavior::Returns(value) => Ok(value),
            StubBehavior::Raises { error, exception } => Err(TestkitError::StubRaised {
                provider: provider.to_string(),
                method: method.to_string(),
                exception: exception.unwrap_or_else(|| DEFAULT_EXCEPTION.to_string()),
                message: error,
            }),
            StubBehavior::Expects(expectation) => match &expectation.intercept {
                Some(intercept) if !intercept(&args) => {
                    warn!(provider, method, "stub rejected arguments");
                    return Err(TestkitError::UnexpectedArguments {
                        provider: provider.to_string(),
                        method: method.to_string(),
                        args,
                    });
                }
                _ => Ok(expectation.response),
            },
        };

        self.lock().calls.push(StubCall {
            provider: provider.to_string(),
            method: method.to_string(),
            args,
        });
        outcome
    }

    pub fn calls(&self, provider: &str, method: &str) -> Vec<StubCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.provider == provider && c.method == method)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, provider: &str, method: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.provider == provider && c.method == method)
            .count()
    }

    pub fn is_stubbed(&self, provider: &str, method: &str) -> bool {
        self.lock()
            .stubs
            .contains_key(&(provider.to_string(), method.to_string()))
    }

    /// Check every installed expectation against the recorded calls.
    pub fn verify(&self) -> Result<()> {
        let installed = self.lock();
        let mut failures = Vec::new();

        for ((provider, method), behavior) in &installed.stubs {
            let StubBehavior::Expects(expectation) = behavior else {
                continue;
            };
            let seen = installed
                .calls
                .iter()
                .filter(|c| &c.provider == provider && &c.method == method)
                .count();
            match expectation.times {
                Some(times) if seen != times as usize => failures.push(format!(
                    "{provider}::{method} expected exactly {times} call(s), got {seen}"
                )),
                None if seen == 0 => failures.push(format!(
                    "{provider}::{method} expected at least once, never called"
                )),
                _ => {}
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        failures.sort();
        Err(TestkitError::Expectation(failures.join("; ")))
    }

    /// Drop every stub and recorded call.
    pub fn reset(&self) {
        let mut installed = self.lock();
        installed.stubs.clear();
        installed.calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Installed> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for StubRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let installed = self.lock();
        f.debug_struct("StubRegistry")
            .field("stubs", &installed.stubs.len())
            .field("calls", &installed.calls.len())
            .finish()
    }
}

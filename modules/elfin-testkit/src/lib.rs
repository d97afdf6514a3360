//! Test-double installers driven by `elfin-store`.
//!
//! Test code declares stubs and HTTP mocks as reducer-owned fragments; the
//! harness scores every slot of a short-lived store and hands each fragment
//! to the matching installer.

pub mod config;
pub mod error;
pub mod fixture;
pub mod harness;
pub mod stubs;
pub mod telemetry;
pub mod webmocks;

pub use config::HarnessConfig;
pub use error::{Result, TestkitError};
pub use fixture::{Fixture, FixtureStore};
pub use harness::Harness;
pub use stubs::{Expectation, StubBehavior, StubCall, StubRegistry, StubSet};
pub use webmocks::{
    HttpMethod, MockRegistry, MockReply, MockRequest, MockResponse, MockSet, RecordedRequest,
    RequestExpectation, UrlPattern,
};

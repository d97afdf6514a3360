use elfin_store::StoreError;
use thiserror::Error;

use crate::webmocks::HttpMethod;

pub type Result<T> = std::result::Result<T, TestkitError>;

#[derive(Debug, Error)]
pub enum TestkitError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{provider}::{method} raised {exception}: {message}")]
    StubRaised {
        provider: String,
        method: String,
        exception: String,
        message: String,
    },

    #[error("No stub installed for {provider}::{method}")]
    NoStub { provider: String, method: String },

    #[error("Unexpected arguments for {provider}::{method}: {args}")]
    UnexpectedArguments {
        provider: String,
        method: String,
        args: serde_json::Value,
    },

    #[error("Expectation failed: {0}")]
    Expectation(String),

    #[error("No mock matches {method} {url}")]
    NoMatchingMock { method: HttpMethod, url: String },

    #[error("Invalid URL pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Condition not met after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("Background task panicked: {0}")]
    Background(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

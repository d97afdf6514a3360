use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No reducer registered for slot '{0}'")]
    KeyNotFound(String),

    #[error("Slot '{0}' is registered more than once")]
    DuplicateKey(String),

    #[error("Store has been disposed")]
    Disposed,

    #[error("Reducer for slot '{key}' failed")]
    Reducer {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Collector failed for slot '{key}'")]
    Collector {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Inspection callback failed")]
    Inspect(#[source] anyhow::Error),
}

//! Reducer-based state container.
//!
//! Named slots of state are updated by dispatching actions through a set of
//! per-slot reducers, then read back as snapshots. The container never looks
//! inside actions or fragments; only the reducers do.
//!
//! Consumers define their domain by implementing `Reducer` (pure slot updates)
//! and `ActionLike` (the `type` discriminator), then drive a `Store`.

pub mod action;
pub mod compose;
pub mod container;
pub mod error;
pub mod store;
pub mod traits;

pub use action::Action;
pub use compose::{CombinedReducer, ReducerComposer};
pub use container::{State, StateContainer};
pub use error::{Result, StoreError};
pub use store::Store;
pub use traits::{ActionLike, Reducer, Reduction};

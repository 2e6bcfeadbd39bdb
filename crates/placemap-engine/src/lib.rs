//! Search and marker synchronization.
//!
//! `SyncEngine` is the single owner of query, filter, results, selection,
//! pending and error state. `EngineDriver` feeds it from one inbox: user
//! commands, debounce timers and provider completions, so state is never
//! mutated concurrently.

pub mod debounce;
pub mod driver;
pub mod engine;
pub mod record;
pub mod state;

pub use driver::{Command, EngineDriver, EngineHandle, Event};
pub use engine::{Completion, SearchTicket, SyncEngine};
pub use record::PlaceRecord;
pub use state::{PlaceSummary, ViewState, NO_FILTER};

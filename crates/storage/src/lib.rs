//! statescope-storage: where execution histories come from.
//!
//! The replay engine is pure; fetching a log is the job of a
//! [`HistorySource`]. This crate defines that trait, its error type and
//! records, two backends (in-memory and a directory of JSON exports), and
//! a conformance suite every backend is expected to pass.

pub mod conformance;
mod directory;
mod error;
mod memory;
mod record;
mod traits;

pub use directory::DirectoryHistorySource;
pub use error::StorageError;
pub use memory::MemoryHistorySource;
pub use record::{ExecutionHistoryRecord, ExecutionRecord};
pub use traits::HistorySource;

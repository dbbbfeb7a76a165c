//! Output sinks for canonical records
//!
//! This module handles:
//! - The `Sink` contract shared by every destination
//! - JSON Lines and SQLite sinks, selected by `[output] kind`
//! - An in-memory sink for embedding and tests
//! - Statistics over stored records

mod jsonl;
mod memory;
mod schema;
mod sqlite_output;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;
pub use sqlite_output::{RunRecord, RunStatus, SqliteSink};
pub use stats::{load_statistics, print_statistics, print_summary, RecordStatistics};
pub use traits::{Sink, WriteError, WriteResult};

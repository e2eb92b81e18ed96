//! Long-term memory persisted across pipeline runs.

mod bank;
mod record;

pub use bank::{MemoryBank, DEFAULT_CAPACITY};
pub use record::MemoryRecord;

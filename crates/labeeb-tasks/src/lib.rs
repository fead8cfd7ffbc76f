//! Labeeb Tasks crate - task memory for the assistant.
//!
//! Owns the Arabic date expression parser, the on-disk task file codec, and
//! the [`TaskStore`] that keeps tasks, their embeddings, and the
//! nearest-neighbour index in lock-step.

pub mod error;
pub mod file;
pub mod store;
pub mod time_parser;

pub use error::TaskError;
pub use file::{TaskFile, TaskRecord};
pub use store::{DeleteOutcome, LoadReport, TaskStore};
pub use time_parser::{parse_date, parse_date_at};

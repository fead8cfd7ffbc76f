//! Labeeb core crate - shared data model, configuration, errors, and text helpers.
//!
//! Every other Labeeb crate depends on this one for the `Task` and `Intent`
//! types, the top-level `LabeebError`, and the TOML-backed `LabeebConfig`.

pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use config::LabeebConfig;
pub use error::{LabeebError, Result};
pub use types::*;

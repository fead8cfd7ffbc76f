//! Labeeb Dialog crate - the wake-word gated conversation loop.
//!
//! [`DialogSession`] owns the task store and the chat components, tracks the
//! Idle/Active session state, and turns each utterance into exactly one
//! spoken response.

pub mod confirmation;
pub mod error;
pub mod session;
pub mod state;
pub mod wake;

pub use confirmation::{Confirmation, ConfirmationState};
pub use error::DialogError;
pub use session::{DialogSession, TurnOutcome};
pub use state::{SessionPhase, SessionState};
pub use wake::UtteranceFilter;

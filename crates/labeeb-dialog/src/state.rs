//! Session state with validated transitions.
//!
//! - Idle -> Active (wake word heard)
//! - Active -> Idle (timeout, or a reply carrying the close marker)
//!
//! While Active, every processed utterance refreshes the last-interaction
//! time. The state is shared: clones observe the same session.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::DialogError;

/// Whether the assistant is waiting for the wake word or in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Idle,
    Active,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::Active => write!(f, "Active"),
        }
    }
}

impl SessionPhase {
    pub fn can_transition_to(&self, target: &SessionPhase) -> bool {
        matches!(
            (self, target),
            (SessionPhase::Idle, SessionPhase::Active) | (SessionPhase::Active, SessionPhase::Idle)
        )
    }
}

#[derive(Debug)]
struct Inner {
    phase: SessionPhase,
    last_interaction: Instant,
}

/// Shared `{active, last_interaction}` pair.
#[derive(Debug, Clone)]
pub struct SessionState {
    inner: Arc<Mutex<Inner>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// A new, inactive session.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                phase: SessionPhase::Idle,
                last_interaction: Instant::now(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guarded data is two plain values; a panic elsewhere cannot
        // leave it half-written.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> SessionPhase {
        self.lock().phase
    }

    pub fn is_active(&self) -> bool {
        self.current() == SessionPhase::Active
    }

    pub fn last_interaction(&self) -> Instant {
        self.lock().last_interaction
    }

    fn transition(&self, target: SessionPhase, now: Instant) -> Result<(), DialogError> {
        let mut inner = self.lock();
        if !inner.phase.can_transition_to(&target) {
            return Err(DialogError::InvalidTransition {
                from: inner.phase,
                to: target,
            });
        }
        debug!("Session state: {} -> {}", inner.phase, target);
        inner.phase = target;
        inner.last_interaction = now;
        Ok(())
    }

    /// Idle -> Active.
    pub fn activate(&self, now: Instant) -> Result<(), DialogError> {
        self.transition(SessionPhase::Active, now)
    }

    /// Active -> Idle.
    pub fn deactivate(&self, now: Instant) -> Result<(), DialogError> {
        self.transition(SessionPhase::Idle, now)
    }

    /// Refresh the last-interaction time of an active session.
    pub fn touch(&self, now: Instant) {
        let mut inner = self.lock();
        if inner.phase == SessionPhase::Active {
            inner.last_interaction = now;
        }
    }

    /// Whether an active session has been silent for at least `timeout`.
    pub fn timed_out(&self, now: Instant, timeout: Duration) -> bool {
        let inner = self.lock();
        inner.phase == SessionPhase::Active
            && now.saturating_duration_since(inner.last_interaction) >= timeout
    }

    /// Time left before an active session times out.
    pub fn remaining(&self, now: Instant, timeout: Duration) -> Duration {
        let elapsed = now.saturating_duration_since(self.last_interaction());
        timeout.saturating_sub(elapsed)
    }
}

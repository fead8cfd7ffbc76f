//! Core domain types shared across the Labeeb crates.

use std::fmt;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Dimension of every embedding vector produced or stored by Labeeb.
pub const EMBEDDING_DIM: usize = 384;

/// Marker a generated reply carries when the conversation should close.
///
/// Stripped from any text before it is synthesized.
pub const CLOSE_CONVERSATION: &str = "<close_conversation>";

/// Current local wall-clock time without a zone, the representation used
/// for every task timestamp.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

// =============================================================================
// Task
// =============================================================================

/// A registered natural-language task.
///
/// Tasks are immutable once created; the store only ever appends or removes
/// them. The `id` is not persisted and is regenerated on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub text: String,
    pub scheduled_time: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl Task {
    /// Create a task created now.
    pub fn new(text: impl Into<String>, scheduled_time: NaiveDateTime) -> Self {
        Self::with_created_at(text, scheduled_time, local_now())
    }

    /// Create a task with an explicit creation time.
    pub fn with_created_at(
        text: impl Into<String>,
        scheduled_time: NaiveDateTime,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            scheduled_time,
            created_at,
        }
    }
}

// =============================================================================
// Intent
// =============================================================================

/// Purpose of a single user utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Register a new task.
    Register,
    /// Ask about existing tasks.
    Recall,
    /// Delete one task.
    Delete,
    /// Delete every task (requires confirmation).
    DeleteAll,
    /// Anything else; handled as generic conversation.
    Chat,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::Register,
        Intent::Recall,
        Intent::Delete,
        Intent::DeleteAll,
        Intent::Chat,
    ];

    /// The literal Arabic token the classifier model answers with.
    pub fn token(&self) -> &'static str {
        match self {
            Intent::Register => "تسجيل",
            Intent::Recall => "تذكير",
            Intent::Delete => "حذف",
            Intent::DeleteAll => "حذف_الكل",
            Intent::Chat => "غير",
        }
    }

    /// Map a classifier token back to an intent. Exact match only.
    pub fn from_token(token: &str) -> Option<Intent> {
        Intent::ALL.into_iter().find(|i| i.token() == token)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Register => write!(f, "register"),
            Intent::Recall => write!(f, "recall"),
            Intent::Delete => write!(f, "delete"),
            Intent::DeleteAll => write!(f, "delete_all"),
            Intent::Chat => write!(f, "chat"),
        }
    }
}

impl std::str::FromStr for Intent {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register" => Ok(Intent::Register),
            "recall" => Ok(Intent::Recall),
            "delete" => Ok(Intent::Delete),
            "delete_all" => Ok(Intent::DeleteAll),
            "chat" => Ok(Intent::Chat),
            _ => Err(format!("Unknown intent: {}", s)),
        }
    }
}

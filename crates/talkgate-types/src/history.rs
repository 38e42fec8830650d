//! Conversation history turns.
//!
//! Turns are append-only and immutable. Retrieval for LLM context is
//! user-scoped by default, so context carries over between sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::llm::MessageRole;

/// Reserved prefix for topic-selection marker turns.
///
/// Marker turns are kept in the log for audit but never sent to the LLM.
pub const TOPIC_MARKER_PREFIX: &str = "#topic:";

/// One role-tagged message unit in the persisted history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: i64,
    pub role: MessageRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(session_id: Uuid, user_id: i64, role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            session_id,
            user_id,
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// The marker turn recorded when a topic is chosen.
    pub fn topic_marker(session_id: Uuid, user_id: i64, topic_id: &str) -> Self {
        Self::new(
            session_id,
            user_id,
            MessageRole::User,
            format!("{TOPIC_MARKER_PREFIX}{topic_id}"),
        )
    }

    pub fn is_topic_marker(&self) -> bool {
        self.text.starts_with(TOPIC_MARKER_PREFIX)
    }
}

/// Which turns feed the LLM context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryScope {
    /// Every turn the user ever had, across sessions.
    #[default]
    User,
    /// Only turns of the current session.
    Session,
}

//! Conversation session types.
//!
//! A session is one bounded conversation: it opens waiting for a topic,
//! becomes active once a topic is chosen, and closes on the message cap or
//! an explicit close.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a conversation session.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (state IN ('awaiting_topic', 'active', 'closed'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingTopic,
    Active,
    Closed,
}

impl SessionState {
    /// Whether the session state machine allows moving from `self` to `to`.
    ///
    /// `awaiting_topic -> active`, `awaiting_topic -> closed`,
    /// `active -> closed`. Everything else is rejected, including any move
    /// out of `closed`.
    pub fn can_transition_to(self, to: SessionState) -> bool {
        matches!(
            (self, to),
            (SessionState::AwaitingTopic, SessionState::Active)
                | (SessionState::AwaitingTopic, SessionState::Closed)
                | (SessionState::Active, SessionState::Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::AwaitingTopic => write!(f, "awaiting_topic"),
            SessionState::Active => write!(f, "active"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "awaiting_topic" => Ok(SessionState::AwaitingTopic),
            "active" => Ok(SessionState::Active),
            "closed" => Ok(SessionState::Closed),
            other => Err(format!("invalid session state: '{other}'")),
        }
    }
}

/// A conversation session belonging to one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i64,
    pub state: SessionState,
    /// Prompt chosen for this session, set on topic selection.
    pub topic_id: Option<String>,
    /// Accepted user turns. Only reset by creating a new session.
    pub user_message_count: u32,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A freshly opened session waiting for a topic.
    pub fn open(user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            state: SessionState::AwaitingTopic,
            topic_id: None,
            user_message_count: 0,
            created_at: now,
            closed_at: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn waiting_for_topic(&self) -> bool {
        self.state == SessionState::AwaitingTopic
    }
}

/// Outcome of closing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The session moved to `closed` and the owner's quota was charged.
    Closed,
    /// The session was already closed; nothing changed.
    AlreadyClosed,
}

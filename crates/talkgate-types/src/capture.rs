//! Side-channel capture records: support requests, bot feedback, and
//! per-session ratings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A free-text message routed to support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportMessage {
    pub id: Uuid,
    pub user_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Free-text feedback about the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackMessage {
    pub id: Uuid,
    pub user_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A 1-5 score for a closed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRating {
    pub id: Uuid,
    pub user_id: i64,
    pub session_id: Uuid,
    pub score: u8,
    pub created_at: DateTime<Utc>,
}

/// Accepted rating scores.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

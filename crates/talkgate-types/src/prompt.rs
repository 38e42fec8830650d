//! Topic prompts offered when a session opens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest prompt id that still fits a Telegram callback payload.
pub const MAX_PROMPT_ID_LEN: usize = 32;

/// A selectable conversation topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Short stable id (e.g. `prompt_1`), used in callback data.
    pub id: String,
    /// Button label.
    pub title: String,
    /// Content sent to the LLM when the topic is chosen.
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Validate a prompt id: 1..=32 chars of `[A-Za-z0-9_-]`.
pub fn validate_prompt_id(id: &str) -> Result<(), String> {
    if id.is_empty() || id.len() > MAX_PROMPT_ID_LEN {
        return Err(format!(
            "prompt id must be 1-{MAX_PROMPT_ID_LEN} characters, got {}",
            id.len()
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(format!("prompt id '{id}' may only contain letters, digits, '_' and '-'"));
    }
    Ok(())
}

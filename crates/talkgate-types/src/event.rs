//! Transport-facing event and effect types.
//!
//! The transport adapter turns channel updates into [`InboundEvent`]s and
//! carries the orchestrator's [`OutboundEffect`]s back to the user. Button
//! payloads follow the [`Callback`] grammar.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::capture::RATING_RANGE;
use crate::entitlement::Plan;
use crate::prompt::validate_prompt_id;

/// An inbound update for one user, already classified by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub user_id: i64,
    pub chat_id: i64,
    pub kind: EventKind,
}

/// The shape of an inbound update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// A slash command, name without the leading `/`.
    Command { name: String, args: String },
    /// Plain text typed by the user.
    FreeText { text: String },
    /// An inline keyboard button press.
    ButtonPress {
        data: String,
        /// Id of the message carrying the keyboard, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<i32>,
    },
    /// A photo, document, voice note, or other attachment.
    Media { reference: String },
}

impl EventKind {
    /// Classify raw message text: `/name args` becomes a command, anything
    /// else free text. A `@botname` suffix on the command is stripped.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if let Some(rest) = trimmed.strip_prefix('/') {
            let (head, args) = match rest.split_once(char::is_whitespace) {
                Some((head, args)) => (head, args.trim()),
                None => (rest, ""),
            };
            let name = head.split('@').next().unwrap_or(head);
            if !name.is_empty() {
                return EventKind::Command {
                    name: name.to_lowercase(),
                    args: args.to_string(),
                };
            }
        }
        EventKind::FreeText {
            text: text.to_string(),
        }
    }
}

/// A single inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, callback: &Callback) -> Self {
        Self {
            label: label.into(),
            data: callback.to_string(),
        }
    }
}

/// Rows of inline buttons attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// One button per row.
    pub fn column(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// All buttons on a single row.
    pub fn row(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: vec![buttons.into_iter().collect()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.is_empty())
    }
}

/// An instruction for the transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEffect {
    SendText {
        chat_id: i64,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keyboard: Option<Keyboard>,
    },
    /// Acknowledge a button press and remove the message that carried it.
    ClearPrompt { chat_id: i64, message_id: i32 },
}

impl OutboundEffect {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        OutboundEffect::SendText {
            chat_id,
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(chat_id: i64, text: impl Into<String>, keyboard: Keyboard) -> Self {
        OutboundEffect::SendText {
            chat_id,
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Button payloads understood by the orchestrator.
///
/// Wire grammar (Telegram limits callback data to 64 bytes):
/// - `topic:<prompt_id>`
/// - `plan:<basic|standard|premium>`
/// - `rate:<session_uuid>:<1-5>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    SelectTopic(String),
    Purchase(Plan),
    Rate { session_id: Uuid, score: u8 },
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::SelectTopic(id) => write!(f, "topic:{id}"),
            Callback::Purchase(plan) => write!(f, "plan:{plan}"),
            Callback::Rate { session_id, score } => write!(f, "rate:{session_id}:{score}"),
        }
    }
}

impl FromStr for Callback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("malformed callback data: '{s}'"))?;

        match kind {
            "topic" => {
                validate_prompt_id(rest)?;
                Ok(Callback::SelectTopic(rest.to_string()))
            }
            "plan" => {
                let plan: Plan = rest.parse()?;
                if !Plan::PURCHASABLE.contains(&plan) {
                    return Err(format!("plan '{plan}' cannot be purchased"));
                }
                Ok(Callback::Purchase(plan))
            }
            "rate" => {
                let (session, score) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| format!("malformed rating callback: '{s}'"))?;
                let session_id = Uuid::parse_str(session)
                    .map_err(|e| format!("invalid session id in rating callback: {e}"))?;
                let score: u8 = score
                    .parse()
                    .map_err(|_| format!("invalid rating score: '{score}'"))?;
                if !RATING_RANGE.contains(&score) {
                    return Err(format!("rating score {score} outside 1-5"));
                }
                Ok(Callback::Rate { session_id, score })
            }
            other => Err(format!("unknown callback kind: '{other}'")),
        }
    }
}

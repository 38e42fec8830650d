//! LLM context assembly from persisted turns.

use talkgate_types::history::Turn;
use talkgate_types::llm::{Message, MessageRole};

/// Turn history into gateway messages.
///
/// Input order is kept (callers pass turns oldest first). Topic marker turns
/// are dropped. When nothing remains, a single default system turn is
/// returned so the request is never empty.
pub fn assemble_messages(turns: &[Turn], default_system_prompt: &str) -> Vec<Message> {
    let messages: Vec<Message> = turns
        .iter()
        .filter(|t| !t.is_topic_marker())
        .map(|t| Message::new(t.role, t.text.clone()))
        .collect();

    if messages.is_empty() {
        return vec![Message::new(MessageRole::System, default_system_prompt)];
    }
    messages
}

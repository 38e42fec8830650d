//! Conversion between Telegram updates and orchestrator events/effects.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId};

use talkgate_types::event::{EventKind, InboundEvent, Keyboard, OutboundEffect};

/// A single Bot API call produced from an orchestrator effect.
#[derive(Debug, Clone)]
pub enum TelegramAction {
    SendMessage {
        chat_id: ChatId,
        text: String,
        markup: Option<InlineKeyboardMarkup>,
    },
    DeleteMessage {
        chat_id: ChatId,
        message_id: MessageId,
    },
}

/// Map a Telegram message to an inbound event.
///
/// Text becomes a command or free text; anything else (photos, documents,
/// stickers, voice) is media. Messages without a sender are ignored.
pub fn message_to_event(msg: &Message) -> Option<InboundEvent> {
    let user = msg.from.as_ref()?;
    let user_id = i64::try_from(user.id.0).ok()?;

    let kind = match msg.text() {
        Some(text) => EventKind::from_text(text),
        None => EventKind::Media {
            reference: format!("telegram:{}:{}", msg.chat.id.0, msg.id.0),
        },
    };

    Some(InboundEvent {
        user_id,
        chat_id: msg.chat.id.0,
        kind,
    })
}

/// Map a callback query (inline button press) to an inbound event.
///
/// The originating message id is carried so its keyboard can be cleared.
/// Queries without data are ignored.
pub fn callback_to_event(query: &CallbackQuery) -> Option<InboundEvent> {
    let data = query.data.clone()?;
    let user_id = i64::try_from(query.from.id.0).ok()?;

    let (chat_id, message_id) = match query.message.as_ref() {
        Some(message) => (message.chat().id.0, Some(message.id().0)),
        None => (user_id, None),
    };

    Some(InboundEvent {
        user_id,
        chat_id,
        kind: EventKind::ButtonPress { data, message_id },
    })
}

/// Build an inline keyboard markup from a transport-neutral keyboard.
pub fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    let rows = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.data.clone()))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

/// Translate effects into Bot API calls, preserving order.
///
/// Empty keyboards are dropped; Telegram rejects a markup without buttons.
pub fn to_actions(effects: Vec<OutboundEffect>) -> Vec<TelegramAction> {
    effects
        .into_iter()
        .map(|effect| match effect {
            OutboundEffect::SendText {
                chat_id,
                text,
                keyboard,
            } => TelegramAction::SendMessage {
                chat_id: ChatId(chat_id),
                text,
                markup: keyboard.filter(|k| !k.is_empty()).as_ref().map(to_markup),
            },
            OutboundEffect::ClearPrompt {
                chat_id,
                message_id,
            } => TelegramAction::DeleteMessage {
                chat_id: ChatId(chat_id),
                message_id: MessageId(message_id),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use talkgate_types::event::{Button, Callback};
    use talkgate_types::entitlement::Plan;

    fn private_message(user_id: u64, body: serde_json::Value) -> Message {
        let mut json = serde_json::json!({
            "message_id": 10,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
        });
        if let (Some(obj), Some(extra)) = (json.as_object_mut(), body.as_object()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    #[test]
    fn text_command_maps_to_command() {
        let msg = private_message(42, serde_json::json!({ "text": "/start" }));
        let event = message_to_event(&msg).unwrap();
        assert_eq!(event.user_id, 42);
        assert_eq!(event.chat_id, 42);
        assert_eq!(
            event.kind,
            EventKind::Command {
                name: "start".to_string(),
                args: String::new()
            }
        );
    }

    #[test]
    fn plain_text_maps_to_free_text() {
        let msg = private_message(42, serde_json::json!({ "text": "hello there" }));
        let event = message_to_event(&msg).unwrap();
        assert_eq!(
            event.kind,
            EventKind::FreeText {
                text: "hello there".to_string()
            }
        );
    }

    #[test]
    fn non_text_maps_to_media() {
        let msg = private_message(
            42,
            serde_json::json!({ "dice": { "emoji": "🎲", "value": 3 } }),
        );
        let event = message_to_event(&msg).unwrap();
        assert_eq!(
            event.kind,
            EventKind::Media {
                reference: "telegram:42:10".to_string()
            }
        );
    }

    #[test]
    fn callback_carries_message_id() {
        let query: CallbackQuery = serde_json::from_value(serde_json::json!({
            "id": "cb-1",
            "from": { "id": 42, "is_bot": false, "first_name": "Test" },
            "chat_instance": "ci",
            "data": "topic:prompt_1",
            "message": {
                "message_id": 77,
                "date": 1700000000i64,
                "chat": { "id": 42, "type": "private", "first_name": "Test" },
                "text": "Choose a topic",
            },
        }))
        .expect("failed to deserialize mock callback");

        let event = callback_to_event(&query).unwrap();
        assert_eq!(event.user_id, 42);
        assert_eq!(event.chat_id, 42);
        assert_eq!(
            event.kind,
            EventKind::ButtonPress {
                data: "topic:prompt_1".to_string(),
                message_id: Some(77)
            }
        );
    }

    #[test]
    fn keyboard_layout_is_preserved() {
        let keyboard = Keyboard {
            rows: vec![
                vec![Button::new("Career", &Callback::SelectTopic("career".to_string()))],
                vec![
                    Button::new("A", &Callback::SelectTopic("a".to_string())),
                    Button::new("B", &Callback::SelectTopic("b".to_string())),
                ],
            ],
        };
        let markup = to_markup(&keyboard);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[1].len(), 2);
        assert_eq!(markup.inline_keyboard[0][0].text, "Career");
    }

    #[test]
    fn effects_become_actions_in_order() {
        let keyboard = Keyboard::column(
            [Plan::Basic, Plan::Premium]
                .into_iter()
                .map(|plan| Button::new(plan.label(), &Callback::Purchase(plan))),
        );
        let actions = to_actions(vec![
            OutboundEffect::ClearPrompt {
                chat_id: 42,
                message_id: 55,
            },
            OutboundEffect::with_keyboard(42, "Choose a plan", keyboard),
            OutboundEffect::text(42, "Thanks!"),
        ]);
        assert_eq!(actions.len(), 3);

        match &actions[0] {
            TelegramAction::DeleteMessage {
                chat_id,
                message_id,
            } => {
                assert_eq!(*chat_id, ChatId(42));
                assert_eq!(*message_id, MessageId(55));
            }
            other => panic!("unexpected action: {other:?}"),
        }

        match &actions[1] {
            TelegramAction::SendMessage {
                chat_id,
                text,
                markup: Some(markup),
            } => {
                assert_eq!(*chat_id, ChatId(42));
                assert_eq!(text, "Choose a plan");
                assert_eq!(markup.inline_keyboard.len(), 2);
                assert!(markup.inline_keyboard.iter().all(|row| row.len() == 1));
                assert_eq!(markup.inline_keyboard[1][0].text, Plan::Premium.label());
            }
            other => panic!("unexpected action: {other:?}"),
        }

        assert!(matches!(
            &actions[2],
            TelegramAction::SendMessage { text, markup: None, .. } if text == "Thanks!"
        ));
    }

    #[test]
    fn empty_keyboard_is_dropped() {
        let actions = to_actions(vec![OutboundEffect::with_keyboard(
            7,
            "Nothing to pick",
            Keyboard { rows: vec![] },
        )]);
        assert!(matches!(
            &actions[0],
            TelegramAction::SendMessage { markup: None, .. }
        ));
    }
}

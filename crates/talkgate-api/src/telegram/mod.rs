//! Telegram transport adapter.
//!
//! Long-polls the Bot API with teloxide, turns private-chat messages and
//! inline button presses into [`InboundEvent`]s, runs them through the
//! orchestrator and delivers the resulting effects.

pub mod convert;

use secrecy::{ExposeSecret, SecretString};
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use talkgate_types::event::{InboundEvent, OutboundEffect};

use crate::state::AppState;
use convert::TelegramAction;

/// Run the long-polling dispatcher until `shutdown` is cancelled.
pub async fn run(state: AppState, token: SecretString, shutdown: CancellationToken) {
    let bot = Bot::new(token.expose_secret());

    let message_state = state.clone();
    let on_message = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let state = message_state.clone();
        async move {
            if !msg.chat.is_private() {
                debug!(chat_id = msg.chat.id.0, "ignoring non-private message");
                return respond(());
            }
            match convert::message_to_event(&msg) {
                Some(event) => process(&bot, &state, event).await,
                None => debug!(msg_id = msg.id.0, "ignoring message without sender"),
            }
            respond(())
        }
    });

    let callback_state = state;
    let on_callback = Update::filter_callback_query().endpoint(move |bot: Bot, query: CallbackQuery| {
        let state = callback_state.clone();
        async move {
            if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
                warn!(error = %e, "failed to answer callback query");
            }
            match convert::callback_to_event(&query) {
                Some(event) => process(&bot, &state, event).await,
                None => debug!("ignoring callback query without data"),
            }
            respond(())
        }
    });

    let handler = dptree::entry().branch(on_message).branch(on_callback);

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .build();

    let dispatcher_token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        match dispatcher_token.shutdown() {
            Ok(done) => done.await,
            Err(_) => debug!("telegram dispatcher already idle at shutdown"),
        }
    });

    info!("telegram polling started");
    dispatcher.dispatch().await;
    info!("telegram polling stopped");
}

async fn process(bot: &Bot, state: &AppState, event: InboundEvent) {
    let user_id = event.user_id;
    let effects = state.orchestrator.handle(event).await;
    debug!(user_id, effects = effects.len(), "delivering effects");
    deliver(bot, effects).await;
}

/// Deliver effects in order. Failures are logged and do not stop the rest.
pub async fn deliver(bot: &Bot, effects: Vec<OutboundEffect>) {
    for action in convert::to_actions(effects) {
        match action {
            TelegramAction::SendMessage {
                chat_id,
                text,
                markup,
            } => {
                let request = bot.send_message(chat_id, text);
                let result = match markup {
                    Some(markup) => request.reply_markup(markup).await,
                    None => request.await,
                };
                if let Err(e) = result {
                    warn!(chat_id = chat_id.0, error = %e, "failed to send message");
                }
            }
            TelegramAction::DeleteMessage {
                chat_id,
                message_id,
            } => {
                if let Err(e) = bot.delete_message(chat_id, message_id).await {
                    debug!(
                        chat_id = chat_id.0,
                        message_id = message_id.0,
                        error = %e,
                        "failed to clear prompt"
                    );
                }
            }
        }
    }
}

//! User-facing reply templates and keyboards.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use talkgate_types::capture::RATING_RANGE;
use talkgate_types::entitlement::{AdmissionReason, Entitlement, Plan};
use talkgate_types::event::{Button, Callback, Keyboard};
use talkgate_types::prompt::Prompt;

use crate::service::entitlement::PlanOffer;

pub const SERVER_ERROR: &str = "Something went wrong on our side. Please try again later.";
pub const INVALID_SELECTION: &str = "That selection is not valid.";
pub const TEXT_ONLY: &str = "Only text messages are supported.";
pub const CHOOSE_TOPIC: &str = "Choose a topic for this session:";
pub const CHOOSE_TOPIC_FIRST: &str = "Please choose a topic first using the buttons above.";
pub const NO_TOPICS: &str = "No topics are available right now. Please try again later.";
pub const TOPIC_UNAVAILABLE: &str = "That topic is no longer available.";
pub const TOPIC_ALREADY_CHOSEN: &str = "A topic has already been chosen for this session.";
pub const SESSION_IN_PROGRESS: &str =
    "A session is already in progress. Keep typing, or send /close to end it.";
pub const SESSION_CLOSED: &str = "Your session is closed. Send /start to begin a new one.";
pub const NO_ACTIVE_SESSION: &str = "You have no active session.";
pub const SESSION_ENDED: &str = "Your session has ended.";
pub const LIMIT_REACHED: &str =
    "You have reached the message limit for this session. The session is now closed.";
pub const RATE_SESSION: &str = "How would you rate this session?";
pub const RATING_THANKS: &str = "Thank you for rating the session!";
pub const SUPPORT_PROMPT: &str = "Describe your problem in one message and we will pass it on.";
pub const SUPPORT_RECEIVED: &str = "Thank you, your message has been sent to support.";
pub const FEEDBACK_PROMPT: &str = "Send your feedback about the bot in one message.";
pub const FEEDBACK_RECEIVED: &str = "Thank you for your feedback!";
pub const SIDE_FLOW_PENDING: &str =
    "Please finish your support or feedback message before starting a session.";
pub const START_FIRST: &str = "Please send /start first.";
pub const EMPTY_REPLY: &str = "I have nothing to add.";

pub const HELP: &str = "Available commands:\n\
/start - start a conversation session\n\
/close - end the current session\n\
/buy - view and buy subscription plans\n\
/techsup - contact support\n\
/feedback - leave feedback about the bot\n\
/help - show this message";

pub fn admission_denied(reason: AdmissionReason) -> &'static str {
    match reason {
        AdmissionReason::Expired => "Your subscription has expired. Send /buy to choose a plan.",
        AdmissionReason::QuotaExhausted => "You have no sessions left. Send /buy to choose a plan.",
        _ => "You cannot start a session right now.",
    }
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

pub fn plan_button_label(plan: Plan) -> String {
    match plan.terms() {
        Some(terms) if terms.unlimited => {
            format!("{} ({} days, unlimited)", plan.label(), terms.duration_days)
        }
        Some(terms) => format!(
            "{} ({} days, {} sessions)",
            plan.label(),
            terms.duration_days,
            terms.session_grant
        ),
        None => plan.label().to_string(),
    }
}

pub fn offer_text(offer: &PlanOffer) -> String {
    match offer {
        PlanOffer::PremiumActive { until } => format!(
            "Your Premium plan is active until {}. You can renew it after it ends.",
            format_date(*until)
        ),
        PlanOffer::TrialActive { until } => {
            format!("You are on the trial plan. It ends on {}.", format_date(*until))
        }
        PlanOffer::Upgrade { current, plans } => {
            let names: Vec<&str> = plans.iter().map(|p| p.label()).collect();
            format!(
                "Your {} plan is active. You can upgrade to {}.",
                current.label(),
                names.join(" or ")
            )
        }
        PlanOffer::TrialEnded { .. } => "Your trial has ended. Choose a plan:".to_string(),
        PlanOffer::NoSubscription { .. } => {
            "You have no active subscription. Choose a plan:".to_string()
        }
    }
}

pub fn offer_keyboard(offer: &PlanOffer) -> Option<Keyboard> {
    let plans = offer.plans();
    if plans.is_empty() {
        return None;
    }
    Some(Keyboard::column(plans.iter().map(|plan| {
        Button::new(plan_button_label(*plan), &Callback::Purchase(*plan))
    })))
}

pub fn purchase_confirmed(ent: &Entitlement) -> String {
    format!(
        "You are now subscribed to {} until {}.",
        ent.plan.label(),
        format_date(ent.subscription_end)
    )
}

pub fn topic_keyboard(prompts: &[Prompt]) -> Keyboard {
    Keyboard::column(
        prompts
            .iter()
            .map(|p| Button::new(p.title.clone(), &Callback::SelectTopic(p.id.clone()))),
    )
}

pub fn rating_keyboard(session_id: Uuid) -> Keyboard {
    Keyboard::row(RATING_RANGE.map(|score| {
        Button::new(score.to_string(), &Callback::Rate { session_id, score })
    }))
}

//! Session & entitlement orchestrator.
//!
//! Consumes one [`InboundEvent`] at a time per user, applies the entitlement,
//! session, and process state machines against the stores, calls the
//! completion gateway when a turn should be answered, and returns the
//! effects the transport has to deliver. `handle` never fails outward: store
//! and gateway errors are logged and become a templated reply.

use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use talkgate_types::config::AppConfig;
use talkgate_types::entitlement::{Plan, ProcessTag};
use talkgate_types::error::OrchestratorError;
use talkgate_types::event::{Callback, EventKind, InboundEvent, OutboundEffect};
use talkgate_types::history::HistoryScope;
use talkgate_types::llm::{CompletionRequest, LlmError};
use talkgate_types::session::{CloseOutcome, Session};

use crate::llm::provider::LlmProvider;
use crate::repository::capture::CaptureRepository;
use crate::repository::entitlement::EntitlementRepository;
use crate::repository::history::HistoryRepository;
use crate::repository::prompt::PromptRepository;
use crate::repository::session::SessionRepository;
use crate::service::capture::CaptureService;
use crate::service::entitlement::EntitlementGate;
use crate::service::history::assemble_messages;
use crate::service::session::SessionLifecycle;

use super::locks::UserLocks;
use super::replies;

/// Tunables the orchestrator reads on every event.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub message_cap: u32,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub gateway_timeout: Duration,
    pub default_system_prompt: String,
    pub history_scope: HistoryScope,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            message_cap: config.session.message_cap,
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            gateway_timeout: Duration::from_secs(config.llm.timeout_secs),
            default_system_prompt: config.llm.default_system_prompt.clone(),
            history_scope: config.history_scope,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// The conversation core, generic over every store and the gateway.
pub struct Orchestrator<E, S, H, P, C, L>
where
    E: EntitlementRepository,
    S: SessionRepository,
    H: HistoryRepository,
    P: PromptRepository,
    C: CaptureRepository,
    L: LlmProvider,
{
    gate: EntitlementGate<E>,
    sessions: SessionLifecycle<S, H, E, P>,
    capture: CaptureService<C>,
    prompts: P,
    provider: L,
    settings: OrchestratorSettings,
    locks: UserLocks,
}

impl<E, S, H, P, C, L> Orchestrator<E, S, H, P, C, L>
where
    E: EntitlementRepository + Clone,
    S: SessionRepository,
    H: HistoryRepository,
    P: PromptRepository + Clone,
    C: CaptureRepository,
    L: LlmProvider,
{
    pub fn new(
        entitlements: E,
        sessions: S,
        history: H,
        prompts: P,
        capture: C,
        provider: L,
        config: &AppConfig,
    ) -> Self {
        Self::with_settings(
            entitlements,
            sessions,
            history,
            prompts,
            capture,
            provider,
            config,
            OrchestratorSettings::from_config(config),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_settings(
        entitlements: E,
        sessions: S,
        history: H,
        prompts: P,
        capture: C,
        provider: L,
        config: &AppConfig,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            gate: EntitlementGate::new(entitlements.clone(), config.session.clone()),
            sessions: SessionLifecycle::new(sessions, history, entitlements, prompts.clone()),
            capture: CaptureService::new(capture),
            prompts,
            provider,
            settings,
            locks: UserLocks::new(),
        }
    }
}

impl<E, S, H, P, C, L> Orchestrator<E, S, H, P, C, L>
where
    E: EntitlementRepository,
    S: SessionRepository,
    H: HistoryRepository,
    P: PromptRepository,
    C: CaptureRepository,
    L: LlmProvider,
{
    pub fn gate(&self) -> &EntitlementGate<E> {
        &self.gate
    }

    pub fn sessions(&self) -> &SessionLifecycle<S, H, E, P> {
        &self.sessions
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Handle one inbound event and return the effects to deliver.
    ///
    /// Events of the same user are serialized; different users proceed in
    /// parallel.
    pub async fn handle(&self, event: InboundEvent) -> Vec<OutboundEffect> {
        let _guard = self.locks.acquire(event.user_id).await;
        let span = tracing::info_span!("orchestrator.handle", user_id = event.user_id);

        match self.dispatch(&event).instrument(span).await {
            Ok(effects) => effects,
            Err(OrchestratorError::Validation(reason)) => {
                tracing::warn!(user_id = event.user_id, %reason, "event rejected");
                vec![OutboundEffect::text(event.chat_id, replies::INVALID_SELECTION)]
            }
            Err(e) => {
                tracing::error!(user_id = event.user_id, error = %e, "event handling failed");
                vec![OutboundEffect::text(event.chat_id, replies::SERVER_ERROR)]
            }
        }
    }

    async fn dispatch(&self, event: &InboundEvent) -> Result<Vec<OutboundEffect>, OrchestratorError> {
        let user_id = event.user_id;
        let chat_id = event.chat_id;
        match &event.kind {
            EventKind::Command { name, .. } => match name.as_str() {
                "start" => self.start(user_id, chat_id).await,
                "buy" => self.buy(user_id, chat_id).await,
                "close" => self.close(user_id, chat_id).await,
                "techsup" => {
                    self.enter_side_flow(user_id, chat_id, ProcessTag::Support, replies::SUPPORT_PROMPT)
                        .await
                }
                "feedback" => {
                    self.enter_side_flow(user_id, chat_id, ProcessTag::Feedback, replies::FEEDBACK_PROMPT)
                        .await
                }
                _ => Ok(vec![OutboundEffect::text(chat_id, replies::HELP)]),
            },
            EventKind::FreeText { text } => self.free_text(user_id, chat_id, text).await,
            EventKind::ButtonPress { data, message_id } => {
                let callback = match data.parse::<Callback>() {
                    Ok(callback) => callback,
                    Err(reason) => {
                        tracing::warn!(user_id, data = %data, %reason, "malformed callback data");
                        return Ok(vec![OutboundEffect::text(chat_id, replies::INVALID_SELECTION)]);
                    }
                };
                let mut effects = match callback {
                    Callback::SelectTopic(topic_id) => {
                        self.select_topic(user_id, chat_id, &topic_id).await?
                    }
                    Callback::Purchase(plan) => self.purchase(user_id, chat_id, plan).await?,
                    Callback::Rate { session_id, score } => {
                        self.rate(user_id, chat_id, session_id, score).await?
                    }
                };
                if let Some(message_id) = message_id {
                    effects.insert(
                        0,
                        OutboundEffect::ClearPrompt {
                            chat_id,
                            message_id: *message_id,
                        },
                    );
                }
                Ok(effects)
            }
            EventKind::Media { .. } => Ok(vec![OutboundEffect::text(chat_id, replies::TEXT_ONLY)]),
        }
    }

    async fn start(&self, user_id: i64, chat_id: i64) -> Result<Vec<OutboundEffect>, OrchestratorError> {
        let admission = self.gate.can_start_session(user_id).await?;
        if !admission.allowed {
            tracing::info!(user_id, reason = ?admission.reason, "session start denied");
            return Ok(vec![OutboundEffect::text(
                chat_id,
                replies::admission_denied(admission.reason),
            )]);
        }

        // Nothing to choose from: leave process and sessions untouched.
        let prompts = self.prompts.list().await?;
        if prompts.is_empty() {
            tracing::warn!(user_id, "no topic prompts configured");
            return Ok(vec![OutboundEffect::text(chat_id, replies::NO_TOPICS)]);
        }

        match self.gate.set_process(user_id, ProcessTag::InSession).await {
            Ok(()) => {}
            Err(OrchestratorError::Validation(_)) => {
                return Ok(vec![OutboundEffect::text(chat_id, replies::SIDE_FLOW_PENDING)]);
            }
            Err(e) => return Err(e),
        }

        let (session, _created) = self.sessions.get_or_create_session(user_id).await?;
        if !session.waiting_for_topic() {
            return Ok(vec![OutboundEffect::text(chat_id, replies::SESSION_IN_PROGRESS)]);
        }
        Ok(vec![OutboundEffect::with_keyboard(
            chat_id,
            replies::CHOOSE_TOPIC,
            replies::topic_keyboard(&prompts),
        )])
    }

    async fn buy(&self, user_id: i64, chat_id: i64) -> Result<Vec<OutboundEffect>, OrchestratorError> {
        // Purchases need an existing record.
        if self.gate.get(user_id).await?.is_none() {
            return Ok(vec![OutboundEffect::text(chat_id, replies::START_FIRST)]);
        }
        let offer = self.gate.offers(user_id).await?;
        let text = replies::offer_text(&offer);
        Ok(vec![match replies::offer_keyboard(&offer) {
            Some(keyboard) => OutboundEffect::with_keyboard(chat_id, text, keyboard),
            None => OutboundEffect::text(chat_id, text),
        }])
    }

    async fn close(&self, user_id: i64, chat_id: i64) -> Result<Vec<OutboundEffect>, OrchestratorError> {
        // A pending support or feedback prompt is abandoned either way.
        self.gate.set_process(user_id, ProcessTag::None).await?;
        let Some(open) = self.sessions.find_open(user_id).await? else {
            return Ok(vec![OutboundEffect::text(chat_id, replies::NO_ACTIVE_SESSION)]);
        };
        self.sessions.close(&open.id).await?;

        let mut effects = vec![OutboundEffect::text(chat_id, replies::SESSION_ENDED)];
        if let Some(last) = self.sessions.find_last_closed(user_id).await? {
            effects.push(OutboundEffect::with_keyboard(
                chat_id,
                replies::RATE_SESSION,
                replies::rating_keyboard(last.id),
            ));
        }
        Ok(effects)
    }

    async fn enter_side_flow(
        &self,
        user_id: i64,
        chat_id: i64,
        to: ProcessTag,
        prompt: &str,
    ) -> Result<Vec<OutboundEffect>, OrchestratorError> {
        match self.gate.set_process(user_id, to).await {
            Ok(()) => Ok(vec![OutboundEffect::text(chat_id, prompt)]),
            Err(OrchestratorError::NotFound(_)) => {
                Ok(vec![OutboundEffect::text(chat_id, replies::START_FIRST)])
            }
            Err(e) => Err(e),
        }
    }

    async fn free_text(
        &self,
        user_id: i64,
        chat_id: i64,
        text: &str,
    ) -> Result<Vec<OutboundEffect>, OrchestratorError> {
        let process = self
            .gate
            .get(user_id)
            .await?
            .map(|e| e.process)
            .unwrap_or_default();

        // Side flows take the text before any session rule applies.
        if process.is_side_flow() {
            let reply = match process {
                ProcessTag::Support => {
                    self.capture.capture_support(user_id, text).await?;
                    replies::SUPPORT_RECEIVED
                }
                _ => {
                    self.capture.capture_feedback(user_id, text).await?;
                    replies::FEEDBACK_RECEIVED
                }
            };
            self.gate.set_process(user_id, ProcessTag::None).await?;
            if let Some(open) = self.sessions.find_open(user_id).await? {
                self.sessions.close(&open.id).await?;
            }
            return Ok(vec![OutboundEffect::text(chat_id, reply)]);
        }

        let Some(session) = self.sessions.find_open(user_id).await? else {
            return Ok(vec![OutboundEffect::text(chat_id, replies::SESSION_CLOSED)]);
        };
        if session.waiting_for_topic() {
            return Ok(vec![OutboundEffect::text(chat_id, replies::CHOOSE_TOPIC_FIRST)]);
        }

        let count = self.sessions.record_user_turn(&session, text).await?;
        if count >= self.settings.message_cap {
            return self.finish_capped(&session, chat_id, count).await;
        }

        let reply = self.complete(&session).await?;
        Ok(vec![OutboundEffect::text(chat_id, reply)])
    }

    async fn finish_capped(
        &self,
        session: &Session,
        chat_id: i64,
        count: u32,
    ) -> Result<Vec<OutboundEffect>, OrchestratorError> {
        let outcome = self.sessions.close(&session.id).await?;
        self.gate.set_process(session.user_id, ProcessTag::None).await?;
        tracing::info!(
            user_id = session.user_id,
            session_id = %session.id,
            count,
            closed = outcome == CloseOutcome::Closed,
            "message cap reached"
        );
        Ok(vec![
            OutboundEffect::text(chat_id, replies::LIMIT_REACHED),
            OutboundEffect::with_keyboard(
                chat_id,
                replies::RATE_SESSION,
                replies::rating_keyboard(session.id),
            ),
        ])
    }

    async fn select_topic(
        &self,
        user_id: i64,
        chat_id: i64,
        topic_id: &str,
    ) -> Result<Vec<OutboundEffect>, OrchestratorError> {
        let Some(session) = self.sessions.find_open(user_id).await? else {
            return Ok(vec![OutboundEffect::text(chat_id, replies::SESSION_CLOSED)]);
        };
        if !session.waiting_for_topic() {
            return Ok(vec![OutboundEffect::text(chat_id, replies::TOPIC_ALREADY_CHOSEN)]);
        }

        match self.sessions.select_topic(&session.id, topic_id).await {
            Ok(_) => {}
            Err(OrchestratorError::NotFound(_)) => {
                return Ok(vec![OutboundEffect::text(chat_id, replies::TOPIC_UNAVAILABLE)]);
            }
            Err(e) => return Err(e),
        }

        let session = self.sessions.get(&session.id).await?;
        let reply = self.complete(&session).await?;
        Ok(vec![OutboundEffect::text(chat_id, reply)])
    }

    async fn purchase(
        &self,
        user_id: i64,
        chat_id: i64,
        plan: Plan,
    ) -> Result<Vec<OutboundEffect>, OrchestratorError> {
        match self.gate.purchase_plan(user_id, plan).await {
            Ok(ent) => Ok(vec![OutboundEffect::text(
                chat_id,
                replies::purchase_confirmed(&ent),
            )]),
            Err(OrchestratorError::NotFound(_)) => {
                Ok(vec![OutboundEffect::text(chat_id, replies::START_FIRST)])
            }
            Err(e) => Err(e),
        }
    }

    async fn rate(
        &self,
        user_id: i64,
        chat_id: i64,
        session_id: Uuid,
        score: u8,
    ) -> Result<Vec<OutboundEffect>, OrchestratorError> {
        let session = match self.sessions.get(&session_id).await {
            Ok(session) => session,
            Err(OrchestratorError::NotFound(what)) => {
                return Err(OrchestratorError::Validation(format!("rated {what} not found")));
            }
            Err(e) => return Err(e),
        };
        if session.user_id != user_id {
            return Err(OrchestratorError::Validation(format!(
                "session {session_id} does not belong to user {user_id}"
            )));
        }
        self.capture.capture_rating(user_id, session_id, score).await?;
        Ok(vec![OutboundEffect::text(chat_id, replies::RATING_THANKS)])
    }

    /// Call the gateway with the assembled context and persist the reply.
    async fn complete(&self, session: &Session) -> Result<String, OrchestratorError> {
        let turns = self
            .sessions
            .context_turns(session, self.settings.history_scope)
            .await?;
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: assemble_messages(&turns, &self.settings.default_system_prompt),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let span = tracing::info_span!(
            "gen_ai.complete",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            session_id = %session.id,
            messages = request.messages.len(),
        );

        let timeout = self.settings.gateway_timeout;
        let response = tokio::time::timeout(timeout, self.provider.complete(&request))
            .instrument(span)
            .await
            .map_err(|_| LlmError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            })??;

        tracing::debug!(
            session_id = %session.id,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = %response.stop_reason,
            "completion received"
        );

        let content = if response.content.trim().is_empty() {
            replies::EMPTY_REPLY.to_string()
        } else {
            response.content
        };
        self.sessions.record_assistant_turn(session, &content).await?;
        Ok(content)
    }
}

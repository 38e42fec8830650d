//! In-memory repository fakes and a scripted LLM provider for unit tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use talkgate_types::capture::{FeedbackMessage, SessionRating, SupportMessage};
use talkgate_types::entitlement::{Entitlement, ProcessTag, PurchaseUpdate, SessionGrant};
use talkgate_types::error::RepositoryError;
use talkgate_types::history::Turn;
use talkgate_types::llm::{CompletionRequest, CompletionResponse, LlmError, StopReason, Usage};
use talkgate_types::prompt::Prompt;
use talkgate_types::session::{Session, SessionState};

use crate::llm::provider::LlmProvider;
use crate::repository::capture::CaptureRepository;
use crate::repository::entitlement::EntitlementRepository;
use crate::repository::history::HistoryRepository;
use crate::repository::prompt::PromptRepository;
use crate::repository::session::SessionRepository;

#[derive(Clone, Default)]
pub struct InMemoryEntitlements {
    rows: Arc<Mutex<HashMap<i64, Entitlement>>>,
}

impl InMemoryEntitlements {
    pub fn put(&self, ent: Entitlement) {
        self.rows.lock().unwrap().insert(ent.user_id, ent);
    }
}

impl EntitlementRepository for InMemoryEntitlements {
    fn get(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<Entitlement>, RepositoryError>> + Send {
        let row = self.rows.lock().unwrap().get(&user_id).cloned();
        async move { Ok(row) }
    }

    fn insert_if_absent(
        &self,
        entitlement: &Entitlement,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send {
        let mut rows = self.rows.lock().unwrap();
        let created = if rows.contains_key(&entitlement.user_id) {
            false
        } else {
            rows.insert(entitlement.user_id, entitlement.clone());
            true
        };
        async move { Ok(created) }
    }

    fn apply_purchase(
        &self,
        user_id: i64,
        update: &PurchaseUpdate,
    ) -> impl Future<Output = Result<Option<Entitlement>, RepositoryError>> + Send {
        let mut rows = self.rows.lock().unwrap();
        let updated = rows.get_mut(&user_id).map(|ent| {
            ent.plan = update.plan;
            ent.subscription_start = update.subscription_start;
            ent.subscription_end = update.subscription_end;
            ent.unlimited = update.unlimited;
            ent.sessions_left = match update.sessions {
                SessionGrant::Set(n) => n,
                SessionGrant::Increment(n) => ent.sessions_left + n,
            };
            ent.updated_at = Utc::now();
            ent.clone()
        });
        async move { Ok(updated) }
    }

    fn set_process(
        &self,
        user_id: i64,
        process: ProcessTag,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send {
        let mut rows = self.rows.lock().unwrap();
        let found = match rows.get_mut(&user_id) {
            Some(ent) => {
                ent.process = process;
                true
            }
            None => false,
        };
        async move { Ok(found) }
    }

    fn consume_session(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<i64>, RepositoryError>> + Send {
        let mut rows = self.rows.lock().unwrap();
        let left = match rows.get_mut(&user_id) {
            Some(ent) if !ent.unlimited => {
                ent.sessions_left -= 1;
                Some(ent.sessions_left)
            }
            _ => None,
        };
        async move { Ok(left) }
    }
}

#[derive(Clone, Default)]
pub struct InMemorySessions {
    rows: Arc<Mutex<Vec<Session>>>,
}

impl InMemorySessions {
    pub fn all(&self) -> Vec<Session> {
        self.rows.lock().unwrap().clone()
    }
}

impl SessionRepository for InMemorySessions {
    fn create_if_none_open(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<(Session, bool), RepositoryError>> + Send {
        let mut rows = self.rows.lock().unwrap();
        let result = match rows
            .iter()
            .find(|s| s.user_id == session.user_id && !s.is_closed())
        {
            Some(open) => (open.clone(), false),
            None => {
                rows.push(session.clone());
                (session.clone(), true)
            }
        };
        async move { Ok(result) }
    }

    fn get(
        &self,
        session_id: &Uuid,
    ) -> impl Future<Output = Result<Option<Session>, RepositoryError>> + Send {
        let row = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == *session_id)
            .cloned();
        async move { Ok(row) }
    }

    fn find_open(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<Session>, RepositoryError>> + Send {
        let row = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id && !s.is_closed())
            .cloned();
        async move { Ok(row) }
    }

    fn find_last_closed(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<Session>, RepositoryError>> + Send {
        let row = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.is_closed())
            .max_by_key(|s| (s.created_at, s.id))
            .cloned();
        async move { Ok(row) }
    }

    fn list_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> impl Future<Output = Result<Vec<Session>, RepositoryError>> + Send {
        let mut rows: Vec<Session> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }
        async move { Ok(rows) }
    }

    fn activate(
        &self,
        session_id: &Uuid,
        topic_id: &str,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send {
        let mut rows = self.rows.lock().unwrap();
        let changed = match rows
            .iter_mut()
            .find(|s| s.id == *session_id && s.state == SessionState::AwaitingTopic)
        {
            Some(s) => {
                s.state = SessionState::Active;
                s.topic_id = Some(topic_id.to_string());
                true
            }
            None => false,
        };
        async move { Ok(changed) }
    }

    fn increment_user_messages(
        &self,
        session_id: &Uuid,
    ) -> impl Future<Output = Result<Option<u32>, RepositoryError>> + Send {
        let mut rows = self.rows.lock().unwrap();
        let count = rows
            .iter_mut()
            .find(|s| s.id == *session_id && s.state == SessionState::Active)
            .map(|s| {
                s.user_message_count += 1;
                s.user_message_count
            });
        async move { Ok(count) }
    }

    fn mark_closed(
        &self,
        session_id: &Uuid,
        closed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send {
        let mut rows = self.rows.lock().unwrap();
        let changed = match rows
            .iter_mut()
            .find(|s| s.id == *session_id && !s.is_closed())
        {
            Some(s) => {
                s.state = SessionState::Closed;
                s.closed_at = Some(closed_at);
                true
            }
            None => false,
        };
        async move { Ok(changed) }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryHistory {
    rows: Arc<Mutex<Vec<Turn>>>,
}

impl InMemoryHistory {
    pub fn all(&self) -> Vec<Turn> {
        self.rows.lock().unwrap().clone()
    }
}

impl HistoryRepository for InMemoryHistory {
    fn append(&self, turn: &Turn) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.rows.lock().unwrap().push(turn.clone());
        async { Ok(()) }
    }

    fn list_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> impl Future<Output = Result<Vec<Turn>, RepositoryError>> + Send {
        let mut rows: Vec<Turn> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }
        async move { Ok(rows) }
    }

    fn list_for_session(
        &self,
        session_id: &Uuid,
    ) -> impl Future<Output = Result<Vec<Turn>, RepositoryError>> + Send {
        let mut rows: Vec<Turn> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.session_id == *session_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        async move { Ok(rows) }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPrompts {
    rows: Arc<Mutex<HashMap<String, Prompt>>>,
}

impl InMemoryPrompts {
    pub fn with(prompts: &[(&str, &str, &str)]) -> Self {
        let repo = Self::default();
        {
            let mut rows = repo.rows.lock().unwrap();
            for (id, title, text) in prompts {
                rows.insert(
                    id.to_string(),
                    Prompt {
                        id: id.to_string(),
                        title: title.to_string(),
                        text: text.to_string(),
                        created_at: Utc::now(),
                    },
                );
            }
        }
        repo
    }
}

impl PromptRepository for InMemoryPrompts {
    fn upsert(&self, prompt: &Prompt) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.rows
            .lock()
            .unwrap()
            .insert(prompt.id.clone(), prompt.clone());
        async { Ok(()) }
    }

    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Prompt>, RepositoryError>> + Send {
        let row = self.rows.lock().unwrap().get(id).cloned();
        async move { Ok(row) }
    }

    fn list(&self) -> impl Future<Output = Result<Vec<Prompt>, RepositoryError>> + Send {
        let mut rows: Vec<Prompt> = self.rows.lock().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        async move { Ok(rows) }
    }

    fn delete(&self, id: &str) -> impl Future<Output = Result<bool, RepositoryError>> + Send {
        let removed = self.rows.lock().unwrap().remove(id).is_some();
        async move { Ok(removed) }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCapture {
    pub support: Arc<Mutex<Vec<SupportMessage>>>,
    pub feedback: Arc<Mutex<Vec<FeedbackMessage>>>,
    pub ratings: Arc<Mutex<Vec<SessionRating>>>,
}

impl CaptureRepository for InMemoryCapture {
    fn save_support(
        &self,
        message: &SupportMessage,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.support.lock().unwrap().push(message.clone());
        async { Ok(()) }
    }

    fn save_feedback(
        &self,
        message: &FeedbackMessage,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.feedback.lock().unwrap().push(message.clone());
        async { Ok(()) }
    }

    fn save_rating(
        &self,
        rating: &SessionRating,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        self.ratings.lock().unwrap().push(rating.clone());
        async { Ok(()) }
    }
}

/// Scripted provider: pops queued results, then echoes a fixed reply.
/// Every request is recorded for assertions.
#[derive(Clone, Default)]
pub struct MockProvider {
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    queued: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    delay: Arc<Mutex<Option<std::time::Duration>>>,
}

impl MockProvider {
    /// Make every following call wait `delay` before answering.
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_next(&self, err: LlmError) {
        self.queued.lock().unwrap().push_back(Err(err));
    }

    pub fn reply_next(&self, text: &str) {
        self.queued.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send {
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("mock reply".to_string()));
        let delay = *self.delay.lock().unwrap();
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let content = next?;
            Ok(CompletionResponse {
                id: "resp-mock".to_string(),
                content,
                model: "mock-model".to_string(),
                stop_reason: StopReason::EndTurn,
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 20,
                },
            })
        }
    }
}

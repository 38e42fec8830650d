//! Session lifecycle manager.
//!
//! `NoSession -> Open(awaiting_topic) -> Open(active) -> Closed`. Every
//! state change goes through a conditional store update, so a stale caller
//! cannot reopen a session or charge the quota twice.

use chrono::Utc;
use uuid::Uuid;

use talkgate_types::error::OrchestratorError;
use talkgate_types::history::{HistoryScope, MessageRole, Turn};
use talkgate_types::prompt::Prompt;
use talkgate_types::session::{CloseOutcome, Session};

use crate::repository::entitlement::EntitlementRepository;
use crate::repository::history::HistoryRepository;
use crate::repository::prompt::PromptRepository;
use crate::repository::session::SessionRepository;

/// Service managing conversation sessions and the turns recorded in them.
pub struct SessionLifecycle<S, H, E, P>
where
    S: SessionRepository,
    H: HistoryRepository,
    E: EntitlementRepository,
    P: PromptRepository,
{
    sessions: S,
    history: H,
    entitlements: E,
    prompts: P,
}

impl<S, H, E, P> SessionLifecycle<S, H, E, P>
where
    S: SessionRepository,
    H: HistoryRepository,
    E: EntitlementRepository,
    P: PromptRepository,
{
    pub fn new(sessions: S, history: H, entitlements: E, prompts: P) -> Self {
        Self {
            sessions,
            history,
            entitlements,
            prompts,
        }
    }

    /// Return the user's open session, or open a new one awaiting a topic.
    ///
    /// The flag is `true` when this call created the session.
    pub async fn get_or_create_session(
        &self,
        user_id: i64,
    ) -> Result<(Session, bool), OrchestratorError> {
        if let Some(open) = self.sessions.find_open(user_id).await? {
            return Ok((open, false));
        }
        let candidate = Session::open(user_id, Utc::now());
        let (session, created) = self.sessions.create_if_none_open(&candidate).await?;
        if created {
            tracing::info!(user_id, session_id = %session.id, "session opened");
        }
        Ok((session, created))
    }

    pub async fn get(&self, session_id: &Uuid) -> Result<Session, OrchestratorError> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("session {session_id}")))
    }

    pub async fn find_open(&self, user_id: i64) -> Result<Option<Session>, OrchestratorError> {
        Ok(self.sessions.find_open(user_id).await?)
    }

    /// The most recently closed session. Absence is not an error.
    pub async fn find_last_closed(
        &self,
        user_id: i64,
    ) -> Result<Option<Session>, OrchestratorError> {
        Ok(self.sessions.find_last_closed(user_id).await?)
    }

    pub async fn list_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Session>, OrchestratorError> {
        Ok(self.sessions.list_for_user(user_id, limit).await?)
    }

    /// Resolve the topic prompt and activate an awaiting session.
    ///
    /// Records the `#topic:` marker turn followed by the prompt text as a
    /// system turn. An unknown prompt mutates nothing.
    pub async fn select_topic(
        &self,
        session_id: &Uuid,
        topic_id: &str,
    ) -> Result<Prompt, OrchestratorError> {
        let session = self.get(session_id).await?;
        if !session.waiting_for_topic() {
            return Err(OrchestratorError::Validation(format!(
                "session {session_id} is {} and cannot take a topic",
                session.state
            )));
        }
        let prompt = self
            .prompts
            .get(topic_id)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("prompt '{topic_id}'")))?;

        if !self.sessions.activate(session_id, topic_id).await? {
            return Err(OrchestratorError::Validation(format!(
                "session {session_id} is no longer awaiting a topic"
            )));
        }

        self.history
            .append(&Turn::topic_marker(session.id, session.user_id, topic_id))
            .await?;
        self.history
            .append(&Turn::new(
                session.id,
                session.user_id,
                MessageRole::System,
                prompt.text.clone(),
            ))
            .await?;

        tracing::info!(
            user_id = session.user_id,
            session_id = %session.id,
            topic_id,
            "topic selected"
        );
        Ok(prompt)
    }

    /// Append a user turn and bump the counter by exactly one.
    ///
    /// Returns the new count. Only active sessions accept user turns.
    pub async fn record_user_turn(
        &self,
        session: &Session,
        text: &str,
    ) -> Result<u32, OrchestratorError> {
        if session.is_closed() || session.waiting_for_topic() {
            return Err(OrchestratorError::Validation(format!(
                "session {} is {} and cannot take user turns",
                session.id, session.state
            )));
        }
        self.history
            .append(&Turn::new(session.id, session.user_id, MessageRole::User, text))
            .await?;
        self.sessions
            .increment_user_messages(&session.id)
            .await?
            .ok_or_else(|| {
                OrchestratorError::Validation(format!("session {} is no longer active", session.id))
            })
    }

    pub async fn record_assistant_turn(
        &self,
        session: &Session,
        text: &str,
    ) -> Result<(), OrchestratorError> {
        self.history
            .append(&Turn::new(
                session.id,
                session.user_id,
                MessageRole::Assistant,
                text,
            ))
            .await?;
        Ok(())
    }

    /// Close a session and charge the owner's quota.
    ///
    /// Closing an already-closed session changes nothing and reports
    /// [`CloseOutcome::AlreadyClosed`]. Unlimited owners are never charged.
    pub async fn close(&self, session_id: &Uuid) -> Result<CloseOutcome, OrchestratorError> {
        let session = self.get(session_id).await?;
        if !self.sessions.mark_closed(session_id, Utc::now()).await? {
            tracing::debug!(session_id = %session_id, "session already closed");
            return Ok(CloseOutcome::AlreadyClosed);
        }
        let left = self.entitlements.consume_session(session.user_id).await?;
        tracing::info!(
            user_id = session.user_id,
            session_id = %session_id,
            sessions_left = ?left,
            "session closed"
        );
        Ok(CloseOutcome::Closed)
    }

    /// Turns feeding the LLM context, oldest first.
    pub async fn context_turns(
        &self,
        session: &Session,
        scope: HistoryScope,
    ) -> Result<Vec<Turn>, OrchestratorError> {
        let turns = match scope {
            HistoryScope::User => self.history.list_for_user(session.user_id, None).await?,
            HistoryScope::Session => self.history.list_for_session(&session.id).await?,
        };
        Ok(turns)
    }

    /// Full dialogue log of a user, oldest first.
    pub async fn history_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Turn>, OrchestratorError> {
        Ok(self.history.list_for_user(user_id, limit).await?)
    }

    /// Turns of a single session, oldest first.
    pub async fn history_for_session(&self, session_id: &Uuid) -> Result<Vec<Turn>, OrchestratorError> {
        Ok(self.history.list_for_session(session_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryEntitlements, InMemoryHistory, InMemoryPrompts, InMemorySessions};
    use chrono::Duration;
    use talkgate_types::entitlement::Entitlement;
    use talkgate_types::session::SessionState;

    type Lifecycle =
        SessionLifecycle<InMemorySessions, InMemoryHistory, InMemoryEntitlements, InMemoryPrompts>;

    struct Fixture {
        lifecycle: Lifecycle,
        sessions: InMemorySessions,
        history: InMemoryHistory,
        entitlements: InMemoryEntitlements,
    }

    fn fixture() -> Fixture {
        let sessions = InMemorySessions::default();
        let history = InMemoryHistory::default();
        let entitlements = InMemoryEntitlements::default();
        let prompts = InMemoryPrompts::with(&[("prompt_1", "Career", "Talk about careers.")]);
        entitlements.put(Entitlement::trial(1, 2, Duration::hours(24), Utc::now()));
        Fixture {
            lifecycle: SessionLifecycle::new(
                sessions.clone(),
                history.clone(),
                entitlements.clone(),
                prompts,
            ),
            sessions,
            history,
            entitlements,
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let f = fixture();
        let (first, created) = f.lifecycle.get_or_create_session(1).await.unwrap();
        assert!(created);
        assert_eq!(first.state, SessionState::AwaitingTopic);

        let (second, created) = f.lifecycle.get_or_create_session(1).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(f.sessions.all().len(), 1);
    }

    #[tokio::test]
    async fn test_select_topic_records_marker_and_prompt() {
        let f = fixture();
        let (session, _) = f.lifecycle.get_or_create_session(1).await.unwrap();

        let prompt = f.lifecycle.select_topic(&session.id, "prompt_1").await.unwrap();
        assert_eq!(prompt.text, "Talk about careers.");

        let session = f.lifecycle.get(&session.id).await.unwrap();
        assert_eq!(session.state, SessionState::Active);
        assert_eq!(session.topic_id.as_deref(), Some("prompt_1"));

        let turns = f.history.all();
        assert_eq!(turns.len(), 2);
        assert!(turns[0].is_topic_marker());
        assert_eq!(turns[1].role, MessageRole::System);

        // A second selection is rejected.
        let err = f.lifecycle.select_topic(&session.id, "prompt_1").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_topic_mutates_nothing() {
        let f = fixture();
        let (session, _) = f.lifecycle.get_or_create_session(1).await.unwrap();

        let err = f.lifecycle.select_topic(&session.id, "nope").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NotFound(_)));

        let session = f.lifecycle.get(&session.id).await.unwrap();
        assert!(session.waiting_for_topic());
        assert!(f.history.all().is_empty());
        assert_eq!(f.sessions.all().len(), 1);
    }

    #[tokio::test]
    async fn test_record_user_turn_counts_monotonically() {
        let f = fixture();
        let (session, _) = f.lifecycle.get_or_create_session(1).await.unwrap();

        let err = f.lifecycle.record_user_turn(&session, "too early").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Validation(_)));

        f.lifecycle.select_topic(&session.id, "prompt_1").await.unwrap();
        let session = f.lifecycle.get(&session.id).await.unwrap();
        assert_eq!(f.lifecycle.record_user_turn(&session, "a").await.unwrap(), 1);
        assert_eq!(f.lifecycle.record_user_turn(&session, "b").await.unwrap(), 2);
        assert_eq!(f.lifecycle.record_user_turn(&session, "c").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_close_charges_quota_once() {
        let f = fixture();
        let (session, _) = f.lifecycle.get_or_create_session(1).await.unwrap();

        assert_eq!(f.lifecycle.close(&session.id).await.unwrap(), CloseOutcome::Closed);
        assert_eq!(
            f.lifecycle.close(&session.id).await.unwrap(),
            CloseOutcome::AlreadyClosed
        );

        let ent = f.entitlements.get(1).await.unwrap().unwrap();
        assert_eq!(ent.sessions_left, 1);

        let last = f.lifecycle.find_last_closed(1).await.unwrap().unwrap();
        assert_eq!(last.id, session.id);
        assert!(last.closed_at.is_some());
        assert!(f.lifecycle.find_open(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_unlimited_owner_keeps_quota() {
        let f = fixture();
        let mut ent = Entitlement::trial(2, 0, Duration::days(90), Utc::now());
        ent.unlimited = true;
        f.entitlements.put(ent);

        let (session, _) = f.lifecycle.get_or_create_session(2).await.unwrap();
        f.lifecycle.close(&session.id).await.unwrap();
        assert_eq!(f.entitlements.get(2).await.unwrap().unwrap().sessions_left, 0);
    }

    #[tokio::test]
    async fn test_find_last_closed_absent_is_none() {
        let f = fixture();
        assert!(f.lifecycle.find_last_closed(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_context_scope() {
        let f = fixture();
        let (first, _) = f.lifecycle.get_or_create_session(1).await.unwrap();
        f.lifecycle.select_topic(&first.id, "prompt_1").await.unwrap();
        let first = f.lifecycle.get(&first.id).await.unwrap();
        f.lifecycle.record_user_turn(&first, "old").await.unwrap();
        f.lifecycle.close(&first.id).await.unwrap();

        let (second, _) = f.lifecycle.get_or_create_session(1).await.unwrap();
        f.lifecycle.select_topic(&second.id, "prompt_1").await.unwrap();

        let user_scope = f.lifecycle.context_turns(&second, HistoryScope::User).await.unwrap();
        assert_eq!(user_scope.len(), 5);
        let session_scope = f
            .lifecycle
            .context_turns(&second, HistoryScope::Session)
            .await
            .unwrap();
        assert_eq!(session_scope.len(), 2);
    }
}

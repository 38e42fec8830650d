//! Support and feedback capture.
//!
//! Side-channel logs are append-only. Ratings are validated here so a bad
//! score never reaches the store.

use chrono::Utc;
use uuid::Uuid;

use talkgate_types::capture::{FeedbackMessage, RATING_RANGE, SessionRating, SupportMessage};
use talkgate_types::error::OrchestratorError;

use crate::repository::capture::CaptureRepository;

pub struct CaptureService<C: CaptureRepository> {
    repo: C,
}

impl<C: CaptureRepository> CaptureService<C> {
    pub fn new(repo: C) -> Self {
        Self { repo }
    }

    pub async fn capture_support(&self, user_id: i64, text: &str) -> Result<(), OrchestratorError> {
        let message = SupportMessage {
            id: Uuid::now_v7(),
            user_id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.repo.save_support(&message).await?;
        tracing::info!(user_id, "support message captured");
        Ok(())
    }

    pub async fn capture_feedback(&self, user_id: i64, text: &str) -> Result<(), OrchestratorError> {
        let message = FeedbackMessage {
            id: Uuid::now_v7(),
            user_id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.repo.save_feedback(&message).await?;
        tracing::info!(user_id, "feedback captured");
        Ok(())
    }

    pub async fn capture_rating(
        &self,
        user_id: i64,
        session_id: Uuid,
        score: u8,
    ) -> Result<(), OrchestratorError> {
        if !RATING_RANGE.contains(&score) {
            return Err(OrchestratorError::Validation(format!(
                "rating score {score} outside 1-5"
            )));
        }
        let rating = SessionRating {
            id: Uuid::now_v7(),
            user_id,
            session_id,
            score,
            created_at: Utc::now(),
        };
        self.repo.save_rating(&rating).await?;
        tracing::info!(user_id, session_id = %session_id, score, "session rated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryCapture;

    #[tokio::test]
    async fn test_capture_logs_verbatim() {
        let repo = InMemoryCapture::default();
        let service = CaptureService::new(repo.clone());

        service.capture_support(1, "  my app crashed  ").await.unwrap();
        service.capture_feedback(1, "great bot").await.unwrap();

        assert_eq!(repo.support.lock().unwrap()[0].text, "  my app crashed  ");
        assert_eq!(repo.feedback.lock().unwrap()[0].text, "great bot");
    }

    #[tokio::test]
    async fn test_rating_range_enforced() {
        let repo = InMemoryCapture::default();
        let service = CaptureService::new(repo.clone());
        let session_id = Uuid::now_v7();

        service.capture_rating(1, session_id, 5).await.unwrap();
        for bad in [0, 6] {
            let err = service.capture_rating(1, session_id, bad).await.unwrap_err();
            assert!(matches!(err, OrchestratorError::Validation(_)));
        }
        assert_eq!(repo.ratings.lock().unwrap().len(), 1);
    }
}

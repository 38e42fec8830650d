//! Capture repository trait definition.

use talkgate_types::capture::{FeedbackMessage, SessionRating, SupportMessage};
use talkgate_types::error::RepositoryError;

/// Repository trait for the append-only side-channel logs.
pub trait CaptureRepository: Send + Sync {
    fn save_support(
        &self,
        message: &SupportMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn save_feedback(
        &self,
        message: &FeedbackMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn save_rating(
        &self,
        rating: &SessionRating,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use survey_core::model::{AnswerStoreError, CatalogError, SectionId};
use survey_core::navigation::NavigationError;

/// Errors emitted by the survey services.
///
/// Validation failures (`AnswerStore`, `Navigation`) leave the session as it
/// was. `PersistenceFailure` keeps every in-memory answer; the caller may retry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SurveyError {
    #[error("no authenticated user")]
    Unauthenticated,
    #[error("no section is open")]
    NotOpen,
    #[error("saving section {section} failed: {reason}")]
    PersistenceFailure { section: SectionId, reason: String },
    #[error(transparent)]
    AnswerStore(#[from] AnswerStoreError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SurveyError {
    /// True when retrying the same call later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure { .. })
    }

    /// True for rejected input that the user can correct in place.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::AnswerStore(_) | Self::Navigation(_))
    }
}

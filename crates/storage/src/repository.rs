use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use survey_core::model::{AnswerValue, QuestionPosition, SectionId, SurveySession, UserId};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of one user's answers to one section.
///
/// Saving a record replaces whatever was stored for the same `(user, section)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionAnswersRecord {
    pub user_id: UserId,
    pub section_id: SectionId,
    pub answers: Vec<(QuestionPosition, AnswerValue)>,
    pub saved_at: DateTime<Utc>,
}

impl SectionAnswersRecord {
    /// Snapshot a section of an in-memory session.
    #[must_use]
    pub fn from_session(
        session: &SurveySession,
        section_id: &SectionId,
        saved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: session.user_id(),
            section_id: section_id.clone(),
            answers: session.section_answers(section_id),
            saved_at,
        }
    }
}

/// Save metadata for a section, without the answers themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSectionRow {
    pub section_id: SectionId,
    pub answer_count: u32,
    pub saved_at: DateTime<Utc>,
}

/// Repository contract for survey answers.
#[async_trait]
pub trait SurveyAnswerRepository: Send + Sync {
    /// Persist a section, replacing any earlier save of it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the section cannot be stored.
    async fn save_section(&self, record: &SectionAnswersRecord) -> Result<(), StorageError>;

    /// Fetch the last saved copy of a section.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the section was never saved for this user.
    async fn load_section(
        &self,
        user_id: UserId,
        section_id: &SectionId,
    ) -> Result<SectionAnswersRecord, StorageError>;

    /// List every section this user has saved, ordered by section id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_saved_sections(&self, user_id: UserId)
    -> Result<Vec<SavedSectionRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sections: Arc<Mutex<HashMap<(UserId, SectionId), SectionAnswersRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sections: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl SurveyAnswerRepository for InMemoryRepository {
    async fn save_section(&self, record: &SectionAnswersRecord) -> Result<(), StorageError> {
        let mut guard = self
            .sections
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            (record.user_id, record.section_id.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn load_section(
        &self,
        user_id: UserId,
        section_id: &SectionId,
    ) -> Result<SectionAnswersRecord, StorageError> {
        let guard = self
            .sections
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .get(&(user_id, section_id.clone()))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_saved_sections(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SavedSectionRow>, StorageError> {
        let guard = self
            .sections
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<_> = guard
            .values()
            .filter(|record| record.user_id == user_id)
            .map(|record| SavedSectionRow {
                section_id: record.section_id.clone(),
                answer_count: u32::try_from(record.answers.len()).unwrap_or(u32::MAX),
                saved_at: record.saved_at,
            })
            .collect();
        rows.sort_by(|a, b| a.section_id.cmp(&b.section_id));
        Ok(rows)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub answers: Arc<dyn SurveyAnswerRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let answers: Arc<dyn SurveyAnswerRepository> = Arc::new(InMemoryRepository::new());
        Self { answers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::time::fixed_now;

    fn sid(raw: &str) -> SectionId {
        SectionId::new(raw).unwrap()
    }

    fn record(user: u64, section: &str, values: &[i64]) -> SectionAnswersRecord {
        SectionAnswersRecord {
            user_id: UserId::new(user),
            section_id: sid(section),
            answers: values
                .iter()
                .zip(1..)
                .map(|(v, p)| (QuestionPosition::new(p), AnswerValue::new(*v).unwrap()))
                .collect(),
            saved_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn round_trips_a_section() {
        let repo = InMemoryRepository::new();
        let saved = record(1, "leistung", &[3, 5, 1]);
        repo.save_section(&saved).await.unwrap();

        let loaded = repo.load_section(UserId::new(1), &sid("leistung")).await.unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn missing_section_is_not_found() {
        let repo = InMemoryRepository::new();
        repo.save_section(&record(1, "a", &[1])).await.unwrap();

        let err = repo.load_section(UserId::new(2), &sid("a")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn save_replaces_previous_copy() {
        let repo = InMemoryRepository::new();
        repo.save_section(&record(1, "a", &[1, 2, 3])).await.unwrap();
        repo.save_section(&record(1, "a", &[4])).await.unwrap();

        let loaded = repo.load_section(UserId::new(1), &sid("a")).await.unwrap();
        assert_eq!(loaded.answers.len(), 1);
        assert_eq!(loaded.answers[0].1.value(), 4);
    }

    #[tokio::test]
    async fn lists_only_the_users_sections() {
        let repo = InMemoryRepository::new();
        repo.save_section(&record(1, "b", &[1, 2])).await.unwrap();
        repo.save_section(&record(1, "a", &[1])).await.unwrap();
        repo.save_section(&record(2, "c", &[5])).await.unwrap();

        let rows = repo.list_saved_sections(UserId::new(1)).await.unwrap();
        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.section_id.as_str(), r.answer_count))
            .collect();
        assert_eq!(summary, [("a", 1), ("b", 2)]);
    }
}

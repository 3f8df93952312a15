use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::model::answer::{AnswerError, AnswerValue};
use crate::model::catalog::{QuestionCatalog, Section};
use crate::model::ids::{QuestionPosition, SectionId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerStoreError {
    #[error(transparent)]
    InvalidRange(#[from] AnswerError),

    #[error("position {position} is outside 1..={question_count} for section {section}")]
    InvalidPosition {
        section: SectionId,
        position: QuestionPosition,
        question_count: u32,
    },

    #[error("unknown section: {0}")]
    NotFound(SectionId),
}

type AnswerKey = (SectionId, QuestionPosition);

/// One user's answers across every section of the catalog.
///
/// Every stored key is a real `(section, position)` of the catalog and every value
/// is in range; rejected writes leave the store untouched. Nothing here touches
/// persistence: flushing is the caller's job.
#[derive(Clone)]
pub struct SurveySession {
    user_id: UserId,
    catalog: Arc<QuestionCatalog>,
    answers: BTreeMap<AnswerKey, AnswerValue>,
}

impl SurveySession {
    #[must_use]
    pub fn new(user_id: UserId, catalog: Arc<QuestionCatalog>) -> Self {
        Self {
            user_id,
            catalog,
            answers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<QuestionCatalog> {
        &self.catalog
    }

    /// Validates a raw submission and stores it.
    ///
    /// # Errors
    ///
    /// Returns `AnswerStoreError::InvalidRange` for values outside `1..=5`,
    /// `AnswerStoreError::NotFound` for an unknown section and
    /// `AnswerStoreError::InvalidPosition` for a position outside the section.
    pub fn set(
        &mut self,
        section: &SectionId,
        position: QuestionPosition,
        value: i64,
    ) -> Result<Option<AnswerValue>, AnswerStoreError> {
        let value = AnswerValue::new(value)?;
        self.set_value(section, position, value)
    }

    /// Stores an already validated answer, returning the value it replaced.
    ///
    /// # Errors
    ///
    /// Returns `AnswerStoreError::NotFound` or `AnswerStoreError::InvalidPosition`.
    pub fn set_value(
        &mut self,
        section: &SectionId,
        position: QuestionPosition,
        value: AnswerValue,
    ) -> Result<Option<AnswerValue>, AnswerStoreError> {
        self.check_position(section, position)?;
        Ok(self.answers.insert((section.clone(), position), value))
    }

    /// The stored answer, or `None` while the question is unanswered.
    #[must_use]
    pub fn get(&self, section: &SectionId, position: QuestionPosition) -> Option<AnswerValue> {
        self.answers.get(&(section.clone(), position)).copied()
    }

    /// # Errors
    ///
    /// Returns `AnswerStoreError::NotFound` for an unknown section.
    pub fn completed_count(&self, section: &SectionId) -> Result<u32, AnswerStoreError> {
        let section = self
            .catalog
            .section(section)
            .map_err(|_| AnswerStoreError::NotFound(section.clone()))?;
        Ok(self.answered_in(section))
    }

    /// Answered positions of a section taken from the catalog itself.
    #[must_use]
    pub fn answered_in(&self, section: &Section) -> u32 {
        let question_count = section.question_count();
        let answered = self
            .section_entries(section.id())
            .filter(|(position, _)| position.is_within(question_count))
            .count();
        u32::try_from(answered).unwrap_or(question_count)
    }

    /// # Errors
    ///
    /// Returns `AnswerStoreError::NotFound` for an unknown section.
    pub fn is_section_complete(&self, section: &SectionId) -> Result<bool, AnswerStoreError> {
        let question_count = self.question_count(section)?;
        Ok(self.completed_count(section)? == question_count)
    }

    /// Answers of one section ordered by position.
    #[must_use]
    pub fn section_answers(&self, section: &SectionId) -> Vec<(QuestionPosition, AnswerValue)> {
        self.section_entries(section).collect()
    }

    /// Replaces a section's answers with a persisted copy.
    ///
    /// All entries are validated before anything is written, so a bad record
    /// leaves the session exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `AnswerStoreError::NotFound` or `AnswerStoreError::InvalidPosition`
    /// for entries that do not belong to the catalog.
    pub fn restore_section(
        &mut self,
        section: &SectionId,
        answers: &[(QuestionPosition, AnswerValue)],
    ) -> Result<(), AnswerStoreError> {
        for (position, _) in answers {
            self.check_position(section, *position)?;
        }

        self.answers.retain(|(sid, _), _| sid != section);
        for (position, value) in answers {
            self.answers.insert((section.clone(), *position), *value);
        }
        Ok(())
    }

    /// Total number of answers across all sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    fn question_count(&self, section: &SectionId) -> Result<u32, AnswerStoreError> {
        self.catalog
            .section(section)
            .map(Section::question_count)
            .map_err(|_| AnswerStoreError::NotFound(section.clone()))
    }

    fn check_position(
        &self,
        section: &SectionId,
        position: QuestionPosition,
    ) -> Result<(), AnswerStoreError> {
        let question_count = self.question_count(section)?;
        if !position.is_within(question_count) {
            return Err(AnswerStoreError::InvalidPosition {
                section: section.clone(),
                position,
                question_count,
            });
        }
        Ok(())
    }

    fn section_entries<'a>(
        &'a self,
        section: &SectionId,
    ) -> impl Iterator<Item = (QuestionPosition, AnswerValue)> + 'a {
        let start = (section.clone(), QuestionPosition::new(0));
        let end = (section.clone(), QuestionPosition::new(u32::MAX));
        self.answers
            .range(start..=end)
            .map(|((_, position), value)| (*position, *value))
    }
}

impl fmt::Debug for SurveySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurveySession")
            .field("user_id", &self.user_id)
            .field("sections", &self.catalog.len())
            .field("answers_len", &self.answers.len())
            .finish_non_exhaustive()
    }
}

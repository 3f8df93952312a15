use chrono::{DateTime, Utc};
use std::sync::Arc;

use storage::repository::{SectionAnswersRecord, StorageError, SurveyAnswerRepository};
use survey_core::model::{AnswerValue, QuestionCatalog, SectionId, SurveySession};
use survey_core::navigation::{Cursor, Direction, NavigationOutcome};

use super::service::SurveySessionService;
use super::view::SectionStatusItem;
use crate::Clock;
use crate::error::SurveyError;
use crate::identity::IdentityProvider;

/// Outcome of a save attempt: the `saved_at` stamp, or the failure.
pub type FlushResult = Result<DateTime<Utc>, SurveyError>;

/// Result of answering the current question.
#[derive(Debug)]
pub struct SubmitResult {
    pub value: AnswerValue,
    /// Present only when autosave is enabled.
    pub flush: Option<FlushResult>,
}

/// Result of a navigation request.
///
/// A failed flush does not undo the move; it is reported next to the outcome.
#[derive(Debug)]
pub struct SurveyStep {
    pub outcome: NavigationOutcome,
    pub flush: Option<FlushResult>,
}

impl SurveyStep {
    #[must_use]
    pub fn flush_failed(&self) -> bool {
        matches!(self.flush, Some(Err(_)))
    }
}

/// Orchestrates identity, resume from storage and flushing for survey sessions.
#[derive(Clone)]
pub struct SurveyLoopService {
    clock: Clock,
    catalog: Arc<QuestionCatalog>,
    identity: Arc<dyn IdentityProvider>,
    answers: Arc<dyn SurveyAnswerRepository>,
    autosave: bool,
}

impl SurveyLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<QuestionCatalog>,
        identity: Arc<dyn IdentityProvider>,
        answers: Arc<dyn SurveyAnswerRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            identity,
            answers,
            autosave: false,
        }
    }

    /// Save the section after every accepted answer.
    #[must_use]
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<QuestionCatalog> {
        &self.catalog
    }

    #[must_use]
    pub fn autosave(&self) -> bool {
        self.autosave
    }

    /// Start an empty session for the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::Unauthenticated` when the identity provider has no user.
    pub fn start_session(&self) -> Result<SurveySessionService, SurveyError> {
        let user_id = self
            .identity
            .current_user()
            .ok_or(SurveyError::Unauthenticated)?;
        let started_at = self.clock.now();
        tracing::info!(%user_id, sections = self.catalog.len(), "survey session started");
        Ok(SurveySessionService::new(
            SurveySession::new(user_id, Arc::clone(&self.catalog)),
            started_at,
        ))
    }

    /// Open a section, seeding it from the last saved copy the first time this
    /// session touches it.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::Navigation` for unknown or empty sections and
    /// `SurveyError::PersistenceFailure` when the saved copy cannot be read. The
    /// session is left untouched on failure.
    pub async fn open_section(
        &self,
        session: &mut SurveySessionService,
        section: &SectionId,
    ) -> Result<Cursor, SurveyError> {
        if !session.has_local_state(section) && self.catalog.contains(section) {
            match self.answers.load_section(session.user_id(), section).await {
                Ok(record) => self.restore_saved(session, section, record)?,
                Err(StorageError::NotFound) => {}
                Err(err) => {
                    tracing::warn!(%section, %err, "loading saved section failed");
                    return Err(SurveyError::PersistenceFailure {
                        section: section.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let cursor = session.open_section(section)?.clone();
        tracing::info!(%cursor, "section opened");
        Ok(cursor)
    }

    /// Seed a section from its saved copy.
    ///
    /// Answers at positions the catalog no longer has are dropped; the section is
    /// then marked unsaved so the next save replaces the stale copy.
    fn restore_saved(
        &self,
        session: &mut SurveySessionService,
        section: &SectionId,
        record: SectionAnswersRecord,
    ) -> Result<(), SurveyError> {
        let question_count = self.catalog.question_count(section)?;
        let (kept, dropped): (Vec<_>, Vec<_>) = record
            .answers
            .into_iter()
            .partition(|(position, _)| position.is_within(question_count));

        session
            .session_mut()
            .restore_section(section, &kept)
            .map_err(|err| SurveyError::PersistenceFailure {
                section: section.clone(),
                reason: err.to_string(),
            })?;
        session.mark_saved(section, record.saved_at);

        if dropped.is_empty() {
            tracing::info!(%section, saved_at = %record.saved_at, "section restored");
        } else {
            tracing::warn!(
                %section,
                dropped = dropped.len(),
                question_count,
                "saved copy no longer fits the catalog, extra answers dropped"
            );
            session.mark_unsaved(section);
        }
        Ok(())
    }

    /// Answer the question under the cursor.
    ///
    /// # Errors
    ///
    /// Propagates validation errors from `SurveySessionService::submit_answer`.
    /// Autosave failures are reported in `SubmitResult::flush` instead.
    pub async fn submit_answer(
        &self,
        session: &mut SurveySessionService,
        value: i64,
    ) -> Result<SubmitResult, SurveyError> {
        let value = session.submit_answer(value)?;
        let flush = match session.active_section().cloned() {
            Some(section) if self.autosave && session.is_unsaved(&section) => {
                Some(self.flush_section(session, &section).await)
            }
            _ => None,
        };
        Ok(SubmitResult { value, flush })
    }

    /// Move within the open section; finishing it saves any unsaved answers.
    ///
    /// # Errors
    ///
    /// Propagates navigation errors from `SurveySessionService::navigate`.
    pub async fn navigate(
        &self,
        session: &mut SurveySessionService,
        direction: Direction,
    ) -> Result<SurveyStep, SurveyError> {
        let outcome = session.navigate(direction)?;
        let flush = match &outcome {
            NavigationOutcome::SectionFinished(section) if session.is_unsaved(section) => {
                Some(self.flush_section(session, section).await)
            }
            _ => None,
        };
        Ok(SurveyStep { outcome, flush })
    }

    /// Save one section, replacing the stored copy.
    ///
    /// On failure the in-memory answers stay and the section stays unsaved, so
    /// the call can simply be repeated.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::Catalog` for an unknown section and
    /// `SurveyError::PersistenceFailure` when the repository rejects the save.
    pub async fn flush_section(
        &self,
        session: &mut SurveySessionService,
        section: &SectionId,
    ) -> FlushResult {
        self.catalog.section(section)?;
        let saved_at = self.clock.now();
        let record = SectionAnswersRecord::from_session(session.session(), section, saved_at);

        if let Err(err) = self.answers.save_section(&record).await {
            tracing::warn!(%section, %err, "section save failed");
            return Err(SurveyError::PersistenceFailure {
                section: section.clone(),
                reason: err.to_string(),
            });
        }

        session.mark_saved(section, saved_at);
        tracing::info!(%section, answers = record.answers.len(), "section saved");
        Ok(saved_at)
    }

    /// Save every section with unsaved changes.
    ///
    /// Every section is attempted even if an earlier one fails.
    pub async fn flush_all(
        &self,
        session: &mut SurveySessionService,
    ) -> Vec<(SectionId, FlushResult)> {
        let pending: Vec<SectionId> = session.unsaved_sections().cloned().collect();
        let mut results = Vec::with_capacity(pending.len());
        for section in pending {
            let result = self.flush_section(session, &section).await;
            results.push((section, result));
        }
        results
    }

    /// Per-section status for a survey list: progress, last save and unsaved flag.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::Storage` when the saved-section listing fails.
    pub async fn section_statuses(
        &self,
        session: &SurveySessionService,
    ) -> Result<Vec<SectionStatusItem>, SurveyError> {
        let saved = self.answers.list_saved_sections(session.user_id()).await?;
        let overview = session.overview();

        Ok(self
            .catalog
            .sections()
            .iter()
            .zip(overview.sections)
            .map(|(section, progress)| {
                let stored = saved.iter().find(|row| &row.section_id == section.id());
                SectionStatusItem::new(
                    section.header(),
                    &progress,
                    session
                        .saved_at(section.id())
                        .or(stored.map(|row| row.saved_at)),
                    stored.map_or(0, |row| row.answer_count),
                    session.is_unsaved(section.id()),
                )
            })
            .collect())
    }
}

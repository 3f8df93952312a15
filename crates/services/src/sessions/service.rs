use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use survey_core::model::{
    AnswerStoreError, AnswerValue, Question, SectionId, SurveySession, UserId,
};
use survey_core::navigation::{Cursor, Direction, NavigationController, NavigationOutcome};
use survey_core::progress::{self, SectionProgress, SurveyOverview};

use crate::error::SurveyError;

//
// ─── ACTIVE SECTION ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct ActiveSection {
    controller: NavigationController,
    cursor: Cursor,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory survey session for one user, as seen by the presentation layer.
///
/// Wraps the answer store with a cursor into the section currently being
/// answered and remembers which sections changed since their last save. All
/// mutation goes through `&mut self`, so one writer at a time is enforced by the
/// borrow checker; hosts that share a session across tasks put it behind a lock.
pub struct SurveySessionService {
    session: SurveySession,
    active: Option<ActiveSection>,
    unsaved: BTreeSet<SectionId>,
    saved_at: HashMap<SectionId, DateTime<Utc>>,
    started_at: DateTime<Utc>,
}

impl SurveySessionService {
    /// `started_at` should come from the services layer clock to keep time deterministic.
    #[must_use]
    pub fn new(session: SurveySession, started_at: DateTime<Utc>) -> Self {
        Self {
            session,
            active: None,
            unsaved: BTreeSet::new(),
            saved_at: HashMap::new(),
            started_at,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.session.user_id()
    }

    #[must_use]
    pub fn session(&self) -> &SurveySession {
        &self.session
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Make `section` the one being answered and place the cursor on its first
    /// unanswered question.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::Navigation` for unknown or empty sections.
    pub fn open_section(&mut self, section: &SectionId) -> Result<&Cursor, SurveyError> {
        let controller = NavigationController::new(self.session.catalog(), section)?;
        let cursor = controller.first_unanswered(&self.session);
        let active = self.active.insert(ActiveSection { controller, cursor });
        Ok(&active.cursor)
    }

    /// Leave the open section, e.g. to go back to the section list. Answers stay.
    pub fn close_section(&mut self) {
        self.active = None;
    }

    #[must_use]
    pub fn active_section(&self) -> Option<&SectionId> {
        self.active.as_ref().map(|a| a.controller.section())
    }

    #[must_use]
    pub fn cursor(&self) -> Option<&Cursor> {
        self.active.as_ref().map(|a| &a.cursor)
    }

    /// # Errors
    ///
    /// Returns `SurveyError::NotOpen` when no section is open.
    pub fn current_question(&self) -> Result<&Question, SurveyError> {
        let cursor = self.cursor().ok_or(SurveyError::NotOpen)?;
        Ok(self
            .session
            .catalog()
            .question(cursor.section(), cursor.position())?)
    }

    #[must_use]
    pub fn current_answer(&self) -> Option<AnswerValue> {
        self.cursor()
            .and_then(|c| self.session.get(c.section(), c.position()))
    }

    /// Record an answer for the question under the cursor.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::NotOpen` without an open section, and
    /// `SurveyError::AnswerStore` (`InvalidRange`) for values outside `1..=5`.
    /// A rejected value leaves the session untouched.
    pub fn submit_answer(&mut self, value: i64) -> Result<AnswerValue, SurveyError> {
        let cursor = self.cursor().cloned().ok_or(SurveyError::NotOpen)?;
        let answer = AnswerValue::new(value)
            .map_err(AnswerStoreError::from)
            .inspect_err(|err| tracing::debug!(%cursor, value, %err, "answer rejected"))?;
        let previous = self
            .session
            .set_value(cursor.section(), cursor.position(), answer)?;

        if previous != Some(answer) {
            self.unsaved.insert(cursor.section().clone());
        }
        Ok(answer)
    }

    /// Move within the open section.
    ///
    /// The cursor only changes on `NavigationOutcome::Moved`; at either end of
    /// the section it stays where it is.
    ///
    /// # Errors
    ///
    /// Returns `SurveyError::NotOpen` without an open section and
    /// `SurveyError::Navigation` (`AnswerRequired`) when moving forward past an
    /// unanswered question.
    pub fn navigate(&mut self, direction: Direction) -> Result<NavigationOutcome, SurveyError> {
        let active = self.active.as_mut().ok_or(SurveyError::NotOpen)?;
        let outcome = active
            .controller
            .navigate(&self.session, &active.cursor, direction)?;
        if let NavigationOutcome::Moved(cursor) = &outcome {
            active.cursor = cursor.clone();
        }
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `SurveyError::AnswerStore` (`NotFound`) for an unknown section.
    pub fn progress(&self, section: &SectionId) -> Result<SectionProgress, SurveyError> {
        Ok(progress::section_progress(&self.session, section)?)
    }

    #[must_use]
    pub fn overview(&self) -> SurveyOverview {
        progress::overview(&self.session)
    }

    /// True when the section changed since it was last saved.
    #[must_use]
    pub fn is_unsaved(&self, section: &SectionId) -> bool {
        self.unsaved.contains(section)
    }

    pub fn unsaved_sections(&self) -> impl Iterator<Item = &SectionId> {
        self.unsaved.iter()
    }

    #[must_use]
    pub fn saved_at(&self, section: &SectionId) -> Option<DateTime<Utc>> {
        self.saved_at.get(section).copied()
    }

    pub(crate) fn mark_saved(&mut self, section: &SectionId, at: DateTime<Utc>) {
        self.unsaved.remove(section);
        self.saved_at.insert(section.clone(), at);
    }

    pub(crate) fn mark_unsaved(&mut self, section: &SectionId) {
        self.unsaved.insert(section.clone());
    }

    /// Whether this session already holds answers or edits for the section.
    pub(crate) fn has_local_state(&self, section: &SectionId) -> bool {
        self.unsaved.contains(section)
            || self.saved_at.contains_key(section)
            || !self.session.section_answers(section).is_empty()
    }

    pub(crate) fn session_mut(&mut self) -> &mut SurveySession {
        &mut self.session
    }
}

impl fmt::Debug for SurveySessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurveySessionService")
            .field("user_id", &self.session.user_id())
            .field("answers_len", &self.session.len())
            .field("cursor", &self.cursor())
            .field("unsaved", &self.unsaved)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

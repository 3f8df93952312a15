use std::fmt;
use thiserror::Error;

use crate::model::{QuestionCatalog, QuestionPosition, SectionId, SurveySession};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("question {position} of section {section} must be answered first")]
    AnswerRequired {
        section: SectionId,
        position: QuestionPosition,
    },

    #[error("section {0} has no questions")]
    EmptySection(SectionId),

    #[error("unknown section: {0}")]
    NotFound(SectionId),

    #[error("position {position} is outside section {section}")]
    InvalidPosition {
        section: SectionId,
        position: QuestionPosition,
    },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where the user currently is: one question of one section.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor {
    section: SectionId,
    position: QuestionPosition,
}

impl Cursor {
    #[must_use]
    pub fn section(&self) -> &SectionId {
        &self.section
    }

    #[must_use]
    pub fn position(&self) -> QuestionPosition {
        self.position
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.section, self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Next,
    Previous,
}

/// Successful result of a navigation request.
///
/// Reaching either end of a section is not an error: `SectionFinished` tells the
/// caller to hand off (persist, then let the user pick another section), and
/// `NoPrevious` means the control should be hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Moved(Cursor),
    SectionFinished(SectionId),
    NoPrevious,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Moves a cursor through the questions of a single section.
///
/// Never crosses into another section on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationController {
    section: SectionId,
    question_count: u32,
}

impl NavigationController {
    /// # Errors
    ///
    /// Returns `NavigationError::NotFound` for an unknown section and
    /// `NavigationError::EmptySection` when the section has no questions.
    pub fn new(catalog: &QuestionCatalog, section: &SectionId) -> Result<Self, NavigationError> {
        let question_count = catalog
            .question_count(section)
            .map_err(|_| NavigationError::NotFound(section.clone()))?;
        if question_count == 0 {
            return Err(NavigationError::EmptySection(section.clone()));
        }
        Ok(Self {
            section: section.clone(),
            question_count,
        })
    }

    #[must_use]
    pub fn section(&self) -> &SectionId {
        &self.section
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn first(&self) -> Cursor {
        Cursor {
            section: self.section.clone(),
            position: QuestionPosition::FIRST,
        }
    }

    /// # Errors
    ///
    /// Returns `NavigationError::InvalidPosition` outside `1..=question_count`.
    pub fn cursor_at(&self, position: QuestionPosition) -> Result<Cursor, NavigationError> {
        if !position.is_within(self.question_count) {
            return Err(NavigationError::InvalidPosition {
                section: self.section.clone(),
                position,
            });
        }
        Ok(Cursor {
            section: self.section.clone(),
            position,
        })
    }

    /// Where to resume: the first unanswered question, or the first question
    /// when everything is answered already.
    #[must_use]
    pub fn first_unanswered(&self, session: &SurveySession) -> Cursor {
        let position = (1..=self.question_count)
            .map(QuestionPosition::new)
            .find(|p| session.get(&self.section, *p).is_none())
            .unwrap_or(QuestionPosition::FIRST);
        Cursor {
            section: self.section.clone(),
            position,
        }
    }

    /// # Errors
    ///
    /// Returns `NavigationError::AnswerRequired` while the current question is
    /// unanswered, or a cursor validation error.
    pub fn next(
        &self,
        session: &SurveySession,
        cursor: &Cursor,
    ) -> Result<NavigationOutcome, NavigationError> {
        self.check(cursor)?;
        if session.get(&self.section, cursor.position).is_none() {
            return Err(NavigationError::AnswerRequired {
                section: self.section.clone(),
                position: cursor.position,
            });
        }

        if cursor.position.get() == self.question_count {
            return Ok(NavigationOutcome::SectionFinished(self.section.clone()));
        }
        Ok(NavigationOutcome::Moved(Cursor {
            section: self.section.clone(),
            position: cursor.position.next(),
        }))
    }

    /// # Errors
    ///
    /// Returns a cursor validation error; the first question yields
    /// `NavigationOutcome::NoPrevious` rather than an error.
    pub fn previous(&self, cursor: &Cursor) -> Result<NavigationOutcome, NavigationError> {
        self.check(cursor)?;
        Ok(match cursor.position.previous() {
            Some(position) => NavigationOutcome::Moved(Cursor {
                section: self.section.clone(),
                position,
            }),
            None => NavigationOutcome::NoPrevious,
        })
    }

    /// # Errors
    ///
    /// See [`NavigationController::next`] and [`NavigationController::previous`].
    pub fn navigate(
        &self,
        session: &SurveySession,
        cursor: &Cursor,
        direction: Direction,
    ) -> Result<NavigationOutcome, NavigationError> {
        match direction {
            Direction::Next => self.next(session, cursor),
            Direction::Previous => self.previous(cursor),
        }
    }

    /// A cursor from another section is out of range for this one.
    fn check(&self, cursor: &Cursor) -> Result<(), NavigationError> {
        if cursor.section != self.section || !cursor.position.is_within(self.question_count) {
            return Err(NavigationError::InvalidPosition {
                section: cursor.section.clone(),
                position: cursor.position,
            });
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Section, UserId};
    use std::sync::Arc;

    fn sid(raw: &str) -> SectionId {
        SectionId::new(raw).unwrap()
    }

    fn catalog() -> Arc<QuestionCatalog> {
        Arc::new(
            QuestionCatalog::new(vec![
                Section::new(sid("A"), "Section A", ["a1", "a2", "a3"]).unwrap(),
                Section::new(sid("B"), "Section B", ["b1", "b2"]).unwrap(),
                Section::new(sid("E"), "Empty", Vec::<String>::new()).unwrap(),
            ])
            .unwrap(),
        )
    }

    fn moved(outcome: NavigationOutcome) -> Cursor {
        match outcome {
            NavigationOutcome::Moved(cursor) => cursor,
            other => panic!("expected Moved, got {other:?}"),
        }
    }

    #[test]
    fn walks_a_section_to_the_end() {
        let catalog = catalog();
        let mut session = SurveySession::new(UserId::new(1), Arc::clone(&catalog));
        let nav = NavigationController::new(&catalog, &sid("A")).unwrap();

        let c1 = nav.first();
        session.set(&sid("A"), c1.position(), 3).unwrap();
        let c2 = moved(nav.next(&session, &c1).unwrap());
        assert_eq!(c2.position().get(), 2);

        session.set(&sid("A"), c2.position(), 5).unwrap();
        let c3 = moved(nav.next(&session, &c2).unwrap());
        assert_eq!(c3.position().get(), 3);

        session.set(&sid("A"), c3.position(), 1).unwrap();
        assert_eq!(
            nav.next(&session, &c3).unwrap(),
            NavigationOutcome::SectionFinished(sid("A"))
        );
        assert_eq!(session.completed_count(&sid("A")).unwrap(), 3);
        assert!(session.is_section_complete(&sid("A")).unwrap());
    }

    #[test]
    fn unanswered_section_cannot_advance_or_go_back() {
        let catalog = catalog();
        let session = SurveySession::new(UserId::new(1), Arc::clone(&catalog));
        let nav = NavigationController::new(&catalog, &sid("B")).unwrap();
        let first = nav.first();

        assert_eq!(
            nav.next(&session, &first).unwrap_err(),
            NavigationError::AnswerRequired {
                section: sid("B"),
                position: QuestionPosition::FIRST,
            }
        );
        assert_eq!(nav.previous(&first).unwrap(), NavigationOutcome::NoPrevious);
    }

    #[test]
    fn second_next_without_new_answer_is_refused() {
        let catalog = catalog();
        let mut session = SurveySession::new(UserId::new(1), Arc::clone(&catalog));
        let nav = NavigationController::new(&catalog, &sid("A")).unwrap();

        session.set(&sid("A"), QuestionPosition::FIRST, 2).unwrap();
        let second = moved(nav.next(&session, &nav.first()).unwrap());
        let err = nav.next(&session, &second).unwrap_err();
        assert!(matches!(err, NavigationError::AnswerRequired { .. }));
    }

    #[test]
    fn previous_then_next_returns_to_start() {
        let catalog = catalog();
        let mut session = SurveySession::new(UserId::new(1), Arc::clone(&catalog));
        let nav = NavigationController::new(&catalog, &sid("A")).unwrap();
        session.set(&sid("A"), QuestionPosition::new(1), 4).unwrap();
        session.set(&sid("A"), QuestionPosition::new(2), 4).unwrap();

        let middle = nav.cursor_at(QuestionPosition::new(2)).unwrap();
        let back = moved(nav.previous(&middle).unwrap());
        let again = moved(nav.next(&session, &back).unwrap());
        assert_eq!(again, middle);
    }

    #[test]
    fn empty_section_is_rejected_at_construction() {
        let catalog = catalog();
        assert_eq!(
            NavigationController::new(&catalog, &sid("E")).unwrap_err(),
            NavigationError::EmptySection(sid("E"))
        );
        assert_eq!(
            NavigationController::new(&catalog, &sid("nope")).unwrap_err(),
            NavigationError::NotFound(sid("nope"))
        );
    }

    #[test]
    fn foreign_or_out_of_range_cursors_are_rejected() {
        let catalog = catalog();
        let session = SurveySession::new(UserId::new(1), Arc::clone(&catalog));
        let a = NavigationController::new(&catalog, &sid("A")).unwrap();
        let b = NavigationController::new(&catalog, &sid("B")).unwrap();

        assert_eq!(
            a.previous(&b.first()).unwrap_err(),
            NavigationError::InvalidPosition {
                section: sid("B"),
                position: QuestionPosition::FIRST,
            }
        );
        assert!(matches!(
            a.cursor_at(QuestionPosition::new(4)),
            Err(NavigationError::InvalidPosition { .. })
        ));
        assert!(matches!(
            a.cursor_at(QuestionPosition::new(0)),
            Err(NavigationError::InvalidPosition { .. })
        ));
        assert!(a.navigate(&session, &a.first(), Direction::Previous).is_ok());
    }

    #[test]
    fn resume_point_is_first_gap() {
        let catalog = catalog();
        let mut session = SurveySession::new(UserId::new(1), Arc::clone(&catalog));
        let nav = NavigationController::new(&catalog, &sid("A")).unwrap();
        assert_eq!(nav.first_unanswered(&session), nav.first());

        session.set(&sid("A"), QuestionPosition::new(1), 1).unwrap();
        session.set(&sid("A"), QuestionPosition::new(3), 1).unwrap();
        assert_eq!(nav.first_unanswered(&session).position().get(), 2);

        session.set(&sid("A"), QuestionPosition::new(2), 1).unwrap();
        assert_eq!(nav.first_unanswered(&session), nav.first());
    }
}

//! Completion figures derived from a `SurveySession`.
//!
//! Nothing here is cached: each call reads the session as it is right now.

use crate::model::{AnswerStoreError, SectionId, SurveySession};

/// Completed vs. total questions of one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionProgress {
    pub section_id: SectionId,
    pub completed: u32,
    pub total: u32,
}

impl SectionProgress {
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.completed)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }

    /// Fraction answered in `0.0..=1.0`; an empty section counts as done.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        f64::from(self.completed) / f64::from(self.total)
    }
}

/// Progress of every section, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyOverview {
    pub sections: Vec<SectionProgress>,
}

impl SurveyOverview {
    #[must_use]
    pub fn completed_sections(&self) -> usize {
        self.sections.iter().filter(|p| p.is_complete()).count()
    }

    #[must_use]
    pub fn total_sections(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sections.iter().all(SectionProgress::is_complete)
    }

    #[must_use]
    pub fn get(&self, section: &SectionId) -> Option<&SectionProgress> {
        self.sections.iter().find(|p| &p.section_id == section)
    }
}

/// # Errors
///
/// Returns `AnswerStoreError::NotFound` for an unknown section.
pub fn section_progress(
    session: &SurveySession,
    section: &SectionId,
) -> Result<SectionProgress, AnswerStoreError> {
    let total = session
        .catalog()
        .question_count(section)
        .map_err(|_| AnswerStoreError::NotFound(section.clone()))?;
    Ok(SectionProgress {
        section_id: section.clone(),
        completed: session.completed_count(section)?,
        total,
    })
}

#[must_use]
pub fn overview(session: &SurveySession) -> SurveyOverview {
    let sections = session
        .catalog()
        .sections()
        .iter()
        .map(|section| SectionProgress {
            section_id: section.id().clone(),
            completed: session.answered_in(section),
            total: section.question_count(),
        })
        .collect();
    SurveyOverview { sections }
}

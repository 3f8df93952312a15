use chrono::{DateTime, Utc};

use survey_core::model::SectionId;
use survey_core::progress::SectionProgress;

/// Presentation-agnostic row of the survey list.
///
/// Counts and timestamps only; the UI decides how to render "3 / 10" or a
/// relative save time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionStatusItem {
    pub section_id: SectionId,
    pub header: String,
    pub completed: u32,
    pub total: u32,
    /// Last successful save, from this session or an earlier one.
    pub saved_at: Option<DateTime<Utc>>,
    /// Answers held by the last stored copy.
    pub stored_answers: u32,
    pub unsaved: bool,
}

impl SectionStatusItem {
    #[must_use]
    pub fn new(
        header: &str,
        progress: &SectionProgress,
        saved_at: Option<DateTime<Utc>>,
        stored_answers: u32,
        unsaved: bool,
    ) -> Self {
        Self {
            section_id: progress.section_id.clone(),
            header: header.to_owned(),
            completed: progress.completed,
            total: progress.total,
            saved_at,
            stored_answers,
            unsaved,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_progress_figures() {
        let progress = SectionProgress {
            section_id: SectionId::new("leistung").unwrap(),
            completed: 2,
            total: 5,
        };
        let item = SectionStatusItem::new("Leistung", &progress, None, 0, true);
        assert_eq!(item.section_id.as_str(), "leistung");
        assert_eq!((item.completed, item.total), (2, 5));
        assert!(!item.is_complete());
        assert!(item.unsaved);
    }
}

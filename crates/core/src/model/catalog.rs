use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::model::ids::{QuestionPosition, SectionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("unknown section: {0}")]
    NotFound(SectionId),

    #[error("section {section} has no question at position {position}")]
    InvalidPosition {
        section: SectionId,
        position: QuestionPosition,
    },

    #[error("duplicate section id: {0}")]
    DuplicateSection(SectionId),

    #[error("section {0} has an empty header")]
    EmptyHeader(SectionId),

    #[error("section {section} has an empty prompt at position {position}")]
    EmptyPrompt {
        section: SectionId,
        position: QuestionPosition,
    },

    #[error("section {0} has too many questions")]
    TooManyQuestions(SectionId),

    #[error("invalid catalog document: {0}")]
    Parse(String),
}

//
// ─── QUESTION / SECTION ────────────────────────────────────────────────────────
//

/// A single prompt. Its position is implied by its place in the owning section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    prompt: String,
}

impl Question {
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// A named group of questions that is answered and saved as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    id: SectionId,
    header: String,
    questions: Vec<Question>,
    question_count: u32,
}

impl Section {
    /// Builds a section from its prompts, in display order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the header or a prompt is blank, or when the
    /// question count does not fit the position type.
    pub fn new(
        id: SectionId,
        header: impl Into<String>,
        prompts: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, CatalogError> {
        let header = header.into().trim().to_string();
        if header.is_empty() {
            return Err(CatalogError::EmptyHeader(id));
        }

        let mut questions = Vec::new();
        for prompt in prompts {
            let prompt = prompt.into().trim().to_string();
            let position = u32::try_from(questions.len() + 1)
                .map_err(|_| CatalogError::TooManyQuestions(id.clone()))?;
            if prompt.is_empty() {
                return Err(CatalogError::EmptyPrompt {
                    section: id,
                    position: QuestionPosition::new(position),
                });
            }
            questions.push(Question { prompt });
        }

        let question_count = u32::try_from(questions.len())
            .map_err(|_| CatalogError::TooManyQuestions(id.clone()))?;

        Ok(Self {
            id,
            header,
            questions,
            question_count,
        })
    }

    #[must_use]
    pub fn id(&self) -> &SectionId {
        &self.id
    }

    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn question(&self, position: QuestionPosition) -> Option<&Question> {
        position.index().and_then(|i| self.questions.get(i))
    }

    /// Iterates `(position, question)` pairs, starting at position 1.
    pub fn positioned(&self) -> impl Iterator<Item = (QuestionPosition, &Question)> {
        (1..=self.question_count)
            .map(QuestionPosition::new)
            .zip(self.questions.iter())
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct SectionDocument {
    id: String,
    header: String,
    #[serde(default)]
    questions: Vec<String>,
}

/// Ordered, read-only set of survey sections.
///
/// Loaded once when the process starts and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCatalog {
    sections: Vec<Section>,
    by_id: HashMap<SectionId, usize>,
}

impl QuestionCatalog {
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateSection` if two sections share an id.
    pub fn new(sections: Vec<Section>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(sections.len());
        for (index, section) in sections.iter().enumerate() {
            if by_id.insert(section.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateSection(section.id.clone()));
            }
        }
        Ok(Self { sections, by_id })
    }

    /// Parses the JSON catalog format: an array of `{ "id", "header", "questions": [..] }`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON or ids, and the usual
    /// section validation errors otherwise.
    pub fn from_json(document: &str) -> Result<Self, CatalogError> {
        let raw: Vec<SectionDocument> =
            serde_json::from_str(document).map_err(|e| CatalogError::Parse(e.to_string()))?;

        let mut sections = Vec::with_capacity(raw.len());
        for doc in raw {
            let id = SectionId::new(doc.id).map_err(|e| CatalogError::Parse(e.to_string()))?;
            sections.push(Section::new(id, doc.header, doc.questions)?);
        }
        Self::new(sections)
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown section id.
    pub fn section(&self, id: &SectionId) -> Result<&Section, CatalogError> {
        self.by_id
            .get(id)
            .map(|&i| &self.sections[i])
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown section id.
    pub fn question_count(&self, id: &SectionId) -> Result<u32, CatalogError> {
        self.section(id).map(Section::question_count)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown section and
    /// `CatalogError::InvalidPosition` when the position is out of range.
    pub fn question(
        &self,
        id: &SectionId,
        position: QuestionPosition,
    ) -> Result<&Question, CatalogError> {
        self.section(id)?
            .question(position)
            .ok_or_else(|| CatalogError::InvalidPosition {
                section: id.clone(),
                position,
            })
    }

    #[must_use]
    pub fn contains(&self, id: &SectionId) -> bool {
        self.by_id.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(raw: &str) -> SectionId {
        SectionId::new(raw).unwrap()
    }

    fn catalog() -> QuestionCatalog {
        QuestionCatalog::new(vec![
            Section::new(sid("a"), "Section A", ["q1", "q2", "q3"]).unwrap(),
            Section::new(sid("b"), "Section B", ["q1", "q2"]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn sections_keep_declared_order() {
        let catalog = catalog();
        let ids: Vec<_> = catalog.sections().iter().map(|s| s.id().as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(catalog.question_count(&sid("a")).unwrap(), 3);
        assert_eq!(catalog.question_count(&sid("b")).unwrap(), 2);
    }

    #[test]
    fn unknown_section_is_not_found() {
        let catalog = catalog();
        assert_eq!(
            catalog.section(&sid("zz")).unwrap_err(),
            CatalogError::NotFound(sid("zz"))
        );
        assert!(catalog.question_count(&sid("zz")).is_err());
    }

    #[test]
    fn question_lookup_is_one_based() {
        let catalog = catalog();
        let q = catalog.question(&sid("a"), QuestionPosition::new(1)).unwrap();
        assert_eq!(q.prompt(), "q1");
        let err = catalog
            .question(&sid("a"), QuestionPosition::new(0))
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPosition { .. }));
        assert!(catalog.question(&sid("a"), QuestionPosition::new(4)).is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = QuestionCatalog::new(vec![
            Section::new(sid("a"), "One", ["q"]).unwrap(),
            Section::new(sid("a"), "Two", ["q"]).unwrap(),
        ])
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateSection(sid("a")));
    }

    #[test]
    fn blank_prompt_is_rejected_with_position() {
        let err = Section::new(sid("a"), "A", ["ok", "  "]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::EmptyPrompt {
                section: sid("a"),
                position: QuestionPosition::new(2)
            }
        );
    }

    #[test]
    fn empty_sections_are_allowed_in_the_catalog() {
        let section = Section::new(sid("empty"), "Nothing here", Vec::<String>::new()).unwrap();
        assert_eq!(section.question_count(), 0);
        assert!(QuestionCatalog::new(vec![section]).is_ok());
    }

    #[test]
    fn parses_json_document() {
        let json = r#"[
            {"id": "leistung", "header": "Leistungsmotivation", "questions": ["Ich setze mir hohe Ziele."]},
            {"id": "gestaltung", "header": "Gestaltungsmotivation", "questions": ["A", "B"]}
        ]"#;
        let catalog = QuestionCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.section(&sid("leistung")).unwrap().header(),
            "Leistungsmotivation"
        );
        let positions: Vec<_> = catalog
            .section(&sid("gestaltung"))
            .unwrap()
            .positioned()
            .map(|(p, q)| (p.get(), q.prompt().to_string()))
            .collect();
        assert_eq!(positions, [(1, "A".to_string()), (2, "B".to_string())]);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            QuestionCatalog::from_json("{not json"),
            Err(CatalogError::Parse(_))
        ));
        assert!(matches!(
            QuestionCatalog::from_json(r#"[{"id": "", "header": "x"}]"#),
            Err(CatalogError::Parse(_))
        ));
    }
}

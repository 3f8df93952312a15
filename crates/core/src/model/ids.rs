use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a survey section (a URL-safe slug such as `leistungsmotivation`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionId(String);

impl SectionId {
    /// Creates a `SectionId` after trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `ParseIdError` if the trimmed id is empty or contains whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self, ParseIdError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(ParseIdError {
                kind: "SectionId".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SectionId {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SectionId> for String {
    fn from(value: SectionId) -> Self {
        value.0
    }
}

/// Identifier of the person taking the survey, as handed out by the identity provider.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(u64);

impl UserId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// 1-based position of a question inside its section.
///
/// Any `u32` is representable; range checks happen against the catalog, so a
/// position of `0` or past the end is rejected by the operation that receives it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionPosition(u32);

impl QuestionPosition {
    pub const FIRST: Self = Self(1);

    #[must_use]
    pub fn new(position: u32) -> Self {
        Self(position)
    }

    #[must_use]
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Zero-based index into a section's question list, if this is a valid 1-based position.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.0
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The preceding position, or `None` at the first question.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        if self.0 <= 1 {
            None
        } else {
            Some(Self(self.0 - 1))
        }
    }

    #[must_use]
    pub fn is_within(&self, question_count: u32) -> bool {
        (1..=question_count).contains(&self.0)
    }
}

impl fmt::Debug for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SectionId({})", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Debug for QuestionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionPosition({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for QuestionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for SectionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for UserId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(UserId::new)
            .map_err(|_| ParseIdError {
                kind: "UserId".to_string(),
            })
    }
}

impl FromStr for QuestionPosition {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(QuestionPosition::new)
            .map_err(|_| ParseIdError {
                kind: "QuestionPosition".to_string(),
            })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_id_trims_and_displays() {
        let id = SectionId::new("  leistung ").unwrap();
        assert_eq!(id.to_string(), "leistung");
        assert_eq!(id.as_str(), "leistung");
    }

    #[test]
    fn section_id_rejects_blank_and_inner_whitespace() {
        assert!(SectionId::new("   ").is_err());
        assert!("two words".parse::<SectionId>().is_err());
    }

    #[test]
    fn section_id_deserializes_through_validation() {
        let id: SectionId = serde_json::from_str("\"fuehrung\"").unwrap();
        assert_eq!(id.as_str(), "fuehrung");
        assert!(serde_json::from_str::<SectionId>("\"\"").is_err());
    }

    #[test]
    fn user_id_from_str() {
        let id: UserId = "42".parse().unwrap();
        assert_eq!(id, UserId::new(42));
        assert!("alice".parse::<UserId>().is_err());
    }

    #[test]
    fn position_steps() {
        let first = QuestionPosition::FIRST;
        assert_eq!(first.previous(), None);
        assert_eq!(first.next(), QuestionPosition::new(2));
        assert_eq!(QuestionPosition::new(3).previous(), Some(QuestionPosition::new(2)));
        assert_eq!(QuestionPosition::new(0).index(), None);
        assert_eq!(QuestionPosition::new(4).index(), Some(3));
    }

    #[test]
    fn position_bounds() {
        assert!(QuestionPosition::new(1).is_within(3));
        assert!(QuestionPosition::new(3).is_within(3));
        assert!(!QuestionPosition::new(0).is_within(3));
        assert!(!QuestionPosition::new(4).is_within(3));
        assert!(!QuestionPosition::FIRST.is_within(0));
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answer {value} is outside the range {min}..={max}")]
    InvalidRange { value: i64, min: u8, max: u8 },
}

//
// ─── ANSWER VALUE ─────────────────────────────────────────────────────────────
//

/// A validated response on the five-point agreement scale.
///
/// The only way to obtain one is through [`AnswerValue::new`] (or serde, which
/// routes through the same check), so an out-of-range value never reaches the
/// answer store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct AnswerValue(u8);

impl AnswerValue {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validates a raw submission.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::InvalidRange` if `value` is not within `1..=5`.
    pub fn new(value: i64) -> Result<Self, AnswerError> {
        match u8::try_from(value) {
            Ok(v) if (Self::MIN..=Self::MAX).contains(&v) => Ok(Self(v)),
            _ => Err(AnswerError::InvalidRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            }),
        }
    }

    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Wording for this point of the scale.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.0 {
            1 => "does not apply",
            2 => "rarely applies",
            3 => "partly applies",
            4 => "mostly applies",
            _ => "fully applies",
        }
    }

    /// Every point of the scale, lowest first.
    pub fn scale() -> impl Iterator<Item = AnswerValue> {
        (Self::MIN..=Self::MAX).map(AnswerValue)
    }
}

impl TryFrom<i64> for AnswerValue {
    type Error = AnswerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AnswerValue> for u8 {
    fn from(value: AnswerValue) -> Self {
        value.0
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_point_of_the_scale() {
        for raw in 1..=5 {
            let value = AnswerValue::new(raw).unwrap();
            assert_eq!(i64::from(value.value()), raw);
        }
    }

    #[test]
    fn rejects_out_of_range() {
        for raw in [0, 6, 7, -1, 256, i64::MIN, i64::MAX] {
            let err = AnswerValue::new(raw).unwrap_err();
            assert_eq!(
                err,
                AnswerError::InvalidRange {
                    value: raw,
                    min: 1,
                    max: 5
                }
            );
        }
    }

    #[test]
    fn scale_has_anchored_labels() {
        let labels: Vec<_> = AnswerValue::scale().map(|v| v.label()).collect();
        assert_eq!(labels.len(), 5);
        assert_eq!(labels[0], "does not apply");
        assert_eq!(labels[4], "fully applies");
    }

    #[test]
    fn serde_goes_through_validation() {
        let value: AnswerValue = serde_json::from_str("4").unwrap();
        assert_eq!(value.value(), 4);
        assert!(serde_json::from_str::<AnswerValue>("9").is_err());
        assert_eq!(serde_json::to_string(&value).unwrap(), "4");
    }
}

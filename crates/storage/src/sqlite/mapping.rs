use sqlx::Row;
use survey_core::model::{AnswerValue, QuestionPosition, SectionId, UserId};

use crate::repository::{SavedSectionRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn user_id_to_i64(id: UserId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("user_id overflow".into()))
}

pub(crate) fn section_id_from_str(raw: String) -> Result<SectionId, StorageError> {
    SectionId::new(raw).map_err(ser)
}

pub(crate) fn position_from_i64(v: i64) -> Result<QuestionPosition, StorageError> {
    u32::try_from(v)
        .ok()
        .filter(|p| *p >= 1)
        .map(QuestionPosition::new)
        .ok_or_else(|| StorageError::Serialization(format!("invalid position: {v}")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Stored responses use the same 1..=5 scale as the domain, so this is a
/// validation step rather than a translation.
pub(crate) fn answer_from_i64(v: i64) -> Result<AnswerValue, StorageError> {
    AnswerValue::new(v).map_err(ser)
}

pub(crate) fn map_answer_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<(QuestionPosition, AnswerValue), StorageError> {
    let position = position_from_i64(row.try_get::<i64, _>("position").map_err(ser)?)?;
    let value = answer_from_i64(row.try_get::<i64, _>("response").map_err(ser)?)?;
    Ok((position, value))
}

pub(crate) fn map_saved_section_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SavedSectionRow, StorageError> {
    Ok(SavedSectionRow {
        section_id: section_id_from_str(row.try_get::<String, _>("section_id").map_err(ser)?)?,
        answer_count: u32_from_i64(
            "answer_count",
            row.try_get::<i64, _>("answer_count").map_err(ser)?,
        )?,
        saved_at: row.try_get("saved_at").map_err(ser)?,
    })
}

use survey_core::model::{SectionId, UserId};

use super::SqliteRepository;
use super::mapping::{map_answer_row, map_saved_section_row, ser, user_id_to_i64};
use crate::repository::{
    SavedSectionRow, SectionAnswersRecord, StorageError, SurveyAnswerRepository,
};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl SurveyAnswerRepository for SqliteRepository {
    async fn save_section(&self, record: &SectionAnswersRecord) -> Result<(), StorageError> {
        let user_id = user_id_to_i64(record.user_id)?;
        let section_id = record.section_id.as_str();
        let answer_count = i64::try_from(record.answers.len())
            .map_err(|_| StorageError::Serialization("answer count overflow".into()))?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO section_saves (user_id, section_id, saved_at, answer_count)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(user_id, section_id) DO UPDATE SET
                    saved_at = excluded.saved_at,
                    answer_count = excluded.answer_count
            ",
        )
        .bind(user_id)
        .bind(section_id)
        .bind(record.saved_at)
        .bind(answer_count)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM survey_answers WHERE user_id = ?1 AND section_id = ?2")
            .bind(user_id)
            .bind(section_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, value) in &record.answers {
            sqlx::query(
                r"
                    INSERT INTO survey_answers (user_id, section_id, position, response)
                    VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(user_id)
            .bind(section_id)
            .bind(i64::from(position.get()))
            .bind(i64::from(value.value()))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(
            user_id = %record.user_id,
            section = %record.section_id,
            answers = record.answers.len(),
            "section saved"
        );
        Ok(())
    }

    async fn load_section(
        &self,
        user_id: UserId,
        section_id: &SectionId,
    ) -> Result<SectionAnswersRecord, StorageError> {
        let uid = user_id_to_i64(user_id)?;

        let saved = sqlx::query(
            r"
                SELECT section_id, saved_at, answer_count
                FROM section_saves
                WHERE user_id = ?1 AND section_id = ?2
            ",
        )
        .bind(uid)
        .bind(section_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;
        let saved = map_saved_section_row(&saved)?;

        let rows = sqlx::query(
            r"
                SELECT position, response
                FROM survey_answers
                WHERE user_id = ?1 AND section_id = ?2
                ORDER BY position ASC
            ",
        )
        .bind(uid)
        .bind(section_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut answers = Vec::with_capacity(rows.len());
        for row in rows {
            answers.push(map_answer_row(&row)?);
        }

        if u32::try_from(answers.len()).map_err(ser)? != saved.answer_count {
            return Err(StorageError::Serialization(format!(
                "section {section_id} lists {} answers but {} are stored",
                saved.answer_count,
                answers.len()
            )));
        }

        Ok(SectionAnswersRecord {
            user_id,
            section_id: saved.section_id,
            answers,
            saved_at: saved.saved_at,
        })
    }

    async fn list_saved_sections(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SavedSectionRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT section_id, saved_at, answer_count
                FROM section_saves
                WHERE user_id = ?1
                ORDER BY section_id ASC
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_saved_section_row(&row)?);
        }
        Ok(out)
    }
}

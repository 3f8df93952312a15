use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies schema versions in order, recording each in `schema_migrations`.
///
/// Safe to call on every start-up.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: saved sections and their answers.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS section_saves (
                    user_id INTEGER NOT NULL,
                    section_id TEXT NOT NULL,
                    saved_at TEXT NOT NULL,
                    answer_count INTEGER NOT NULL CHECK (answer_count >= 0),
                    PRIMARY KEY (user_id, section_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS survey_answers (
                    user_id INTEGER NOT NULL,
                    section_id TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 1),
                    response INTEGER NOT NULL CHECK (response BETWEEN 1 AND 5),
                    PRIMARY KEY (user_id, section_id, position),
                    FOREIGN KEY (user_id, section_id)
                        REFERENCES section_saves(user_id, section_id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_section_saves_user_saved_at
                    ON section_saves (user_id, saved_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied sqlite migration");
    }

    Ok(())
}

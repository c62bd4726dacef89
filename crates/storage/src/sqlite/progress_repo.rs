use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::ExamId;
use sqlx::Row;

use crate::repository::{ProgressRepository, StorageError};

use super::SqliteRepository;

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_payload(&self, exam_id: &ExamId) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT payload FROM exam_progress WHERE exam_id = ?1")
            .bind(exam_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|row| row.try_get::<String, _>("payload").map_err(ser))
            .transpose()
    }

    async fn put_payload(
        &self,
        exam_id: &ExamId,
        payload: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO exam_progress (exam_id, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(exam_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            ",
        )
        .bind(exam_id.as_str())
        .bind(payload)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn delete_payload(&self, exam_id: &ExamId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM exam_progress WHERE exam_id = ?1")
            .bind(exam_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_exam_ids(&self) -> Result<Vec<ExamId>, StorageError> {
        let rows = sqlx::query("SELECT exam_id FROM exam_progress ORDER BY exam_id")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("exam_id").map_err(ser)?;
                ExamId::new(raw).map_err(ser)
            })
            .collect()
    }
}

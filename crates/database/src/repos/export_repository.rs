//! Export repository for database operations.

use crate::entities::{CreateExportRequest, Export, ExportStatus};
use crate::types::DatabaseResult;
use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};

#[derive(Clone)]
pub struct ExportRepository {
    pool: SqlitePool,
}

impl ExportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a new export; it starts out in progress
    pub async fn create(&self, request: &CreateExportRequest) -> DatabaseResult<Export> {
        let now = Utc::now().to_rfc3339();
        let status = ExportStatus::InProgress;

        let result = sqlx::query(
            "INSERT INTO exports (study_id, file_name, status, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&request.study_id)
        .bind(&request.file_name)
        .bind(status.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Export {
            id: result.last_insert_rowid(),
            study_id: request.study_id.clone(),
            file_name: request.file_name.clone(),
            status,
            created_at: now,
        })
    }

    pub async fn find_by_study_id(&self, study_id: &str) -> DatabaseResult<Vec<Export>> {
        let rows = sqlx::query(
            "SELECT id, study_id, file_name, status, created_at FROM exports WHERE study_id = ? ORDER BY id",
        )
        .bind(study_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> DatabaseResult<Export> {
                Ok(Export {
                    id: row.try_get("id")?,
                    study_id: row.try_get("study_id")?,
                    file_name: row.try_get("file_name")?,
                    status: ExportStatus::from(row.try_get::<String, _>("status")?.as_str()),
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    pub async fn update_status(&self, id: i64, status: ExportStatus) -> DatabaseResult<bool> {
        let result = sqlx::query("UPDATE exports SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_study_id_in(conn: &mut SqliteConnection, study_id: &str) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM exports WHERE study_id = ?")
            .bind(study_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_study_id(&self, study_id: &str) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM exports WHERE study_id = ?")
            .bind(study_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

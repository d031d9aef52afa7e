//! File metadata repository for database operations.

use crate::entities::{CreateFileRequest, StoredFile};
use crate::types::DatabaseResult;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Clone)]
pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateFileRequest) -> DatabaseResult<StoredFile> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO files (study_id, deployment_id, storage_name, original_name, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&request.study_id)
        .bind(&request.deployment_id)
        .bind(&request.storage_name)
        .bind(&request.original_name)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(StoredFile {
            id: result.last_insert_rowid(),
            study_id: request.study_id.clone(),
            deployment_id: request.deployment_id.clone(),
            storage_name: request.storage_name.clone(),
            original_name: request.original_name.clone(),
            created_at: now,
        })
    }

    /// Delete the metadata of every file uploaded under `study_id`
    pub async fn delete_by_study_id_in(conn: &mut SqliteConnection, study_id: &str) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM files WHERE study_id = ?")
            .bind(study_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_study_id(&self, study_id: &str) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE study_id = ?")
            .bind(study_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

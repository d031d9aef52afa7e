//! Document repository for database operations.

use crate::entities::{CreateDocumentRequest, Document};
use crate::query::{count_where_in, delete_where_in};
use crate::types::DatabaseResult;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

/// Repository for collection document database operations
#[derive(Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateDocumentRequest) -> DatabaseResult<Document> {
        let data = request.data.as_ref().map(serde_json::to_string).transpose()?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO documents (collection_id, name, data, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(request.collection_id)
        .bind(&request.name)
        .bind(&data)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Document {
            id: result.last_insert_rowid(),
            collection_id: request.collection_id,
            name: request.name.clone(),
            data: request.data.clone(),
            created_at: now,
        })
    }

    pub async fn delete_by_collection_ids_in(
        conn: &mut SqliteConnection,
        collection_ids: &[i64],
    ) -> DatabaseResult<u64> {
        delete_where_in(conn, "documents", "collection_id", collection_ids).await
    }

    pub async fn count_by_collection_ids(&self, collection_ids: &[i64]) -> DatabaseResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count_where_in(&mut conn, "documents", "collection_id", collection_ids).await
    }
}

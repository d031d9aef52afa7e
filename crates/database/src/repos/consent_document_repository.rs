//! Consent document repository for database operations.

use crate::entities::{ConsentDocument, CreateConsentDocumentRequest};
use crate::query::{count_where_in, delete_where_in};
use crate::types::DatabaseResult;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Clone)]
pub struct ConsentDocumentRepository {
    pool: SqlitePool,
}

impl ConsentDocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        request: &CreateConsentDocumentRequest,
    ) -> DatabaseResult<ConsentDocument> {
        let data = serde_json::to_string(&request.data)?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO consent_documents (deployment_id, created_by, data, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&request.deployment_id)
        .bind(&request.created_by)
        .bind(&data)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(ConsentDocument {
            id: result.last_insert_rowid(),
            deployment_id: request.deployment_id.clone(),
            created_by: request.created_by.clone(),
            data: request.data.clone(),
            created_at: now,
        })
    }

    pub async fn delete_by_deployment_ids_in(
        conn: &mut SqliteConnection,
        deployment_ids: &[String],
    ) -> DatabaseResult<u64> {
        delete_where_in(conn, "consent_documents", "deployment_id", deployment_ids).await
    }

    pub async fn count_by_deployment_ids(&self, deployment_ids: &[String]) -> DatabaseResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count_where_in(&mut conn, "consent_documents", "deployment_id", deployment_ids).await
    }
}

//! Collection repository for database operations.

use crate::entities::{Collection, CreateCollectionRequest};
use crate::query::{count_where_in, delete_where_in};
use crate::types::DatabaseResult;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

/// Repository for collection database operations
#[derive(Clone)]
pub struct CollectionRepository {
    pool: SqlitePool,
}

impl CollectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new collection
    pub async fn create(&self, request: &CreateCollectionRequest) -> DatabaseResult<Collection> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO collections (study_id, deployment_id, name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&request.study_id)
        .bind(&request.deployment_id)
        .bind(&request.name)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Collection {
            id: result.last_insert_rowid(),
            study_id: request.study_id.clone(),
            deployment_id: request.deployment_id.clone(),
            name: request.name.clone(),
            created_at: now,
        })
    }

    /// Ids of every collection created under `study_id`
    pub async fn find_ids_by_study_id_in(
        conn: &mut SqliteConnection,
        study_id: &str,
    ) -> DatabaseResult<Vec<i64>> {
        let ids = sqlx::query_scalar("SELECT id FROM collections WHERE study_id = ? ORDER BY id")
            .bind(study_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(ids)
    }

    pub async fn delete_by_deployment_ids_in(
        conn: &mut SqliteConnection,
        deployment_ids: &[String],
    ) -> DatabaseResult<u64> {
        delete_where_in(conn, "collections", "deployment_id", deployment_ids).await
    }

    pub async fn count_by_deployment_ids(&self, deployment_ids: &[String]) -> DatabaseResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count_where_in(&mut conn, "collections", "deployment_id", deployment_ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_database;

    #[tokio::test]
    async fn test_collection_ids_by_study_and_scoped_delete() {
        let (pool, _temp_dir) = create_test_database().await;
        let repo = CollectionRepository::new(pool.clone());

        let first = repo
            .create(&CreateCollectionRequest {
                study_id: "S1".to_string(),
                deployment_id: Some("D1".to_string()),
                name: "diary".to_string(),
            })
            .await
            .unwrap();
        let second = repo
            .create(&CreateCollectionRequest {
                study_id: "S1".to_string(),
                deployment_id: None,
                name: "shared".to_string(),
            })
            .await
            .unwrap();
        repo.create(&CreateCollectionRequest {
            study_id: "S2".to_string(),
            deployment_id: Some("D9".to_string()),
            name: "other".to_string(),
        })
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let ids = CollectionRepository::find_ids_by_study_id_in(&mut conn, "S1").await.unwrap();
        assert_eq!(ids, vec![first.id, second.id]);

        let removed =
            CollectionRepository::delete_by_deployment_ids_in(&mut conn, &["D1".to_string()])
                .await
                .unwrap();
        drop(conn);
        assert_eq!(removed, 1);
        assert_eq!(repo.count_by_deployment_ids(&["D9".to_string()]).await.unwrap(), 1);
    }
}

//! Data point repository for database operations.

use crate::entities::{CreateDataPointRequest, DataPoint};
use crate::query::{count_where_in, delete_where_in, push_page, push_predicate, PageRequest};
use crate::types::DatabaseResult;
use chrono::Utc;
use cohort_query::Predicate;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

const COLUMNS: &str =
    "id, deployment_id, created_by, updated_by, carp_header, carp_body, storage_name, created_at, updated_at";

/// Repository for data point database operations
#[derive(Clone)]
pub struct DataPointRepository {
    pool: SqlitePool,
}

impl DataPointRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a new data point
    pub async fn create(&self, request: &CreateDataPointRequest) -> DatabaseResult<DataPoint> {
        let mut conn = self.pool.acquire().await?;
        Self::create_in(&mut conn, request).await
    }

    /// Create a data point on a caller-supplied connection or transaction
    pub async fn create_in(
        conn: &mut SqliteConnection,
        request: &CreateDataPointRequest,
    ) -> DatabaseResult<DataPoint> {
        let header = serde_json::to_string(&request.carp_header)?;
        let body = request
            .carp_body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO datapoints (deployment_id, created_by, updated_by, carp_header, carp_body, storage_name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.deployment_id)
        .bind(&request.created_by)
        .bind(&request.created_by)
        .bind(&header)
        .bind(&body)
        .bind(&request.storage_name)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        Ok(DataPoint {
            id: result.last_insert_rowid(),
            deployment_id: request.deployment_id.clone(),
            created_by: request.created_by.clone(),
            updated_by: request.created_by.clone(),
            carp_header: request.carp_header.clone(),
            carp_body: request.carp_body.clone(),
            storage_name: request.storage_name.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Find data point by ID
    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<DataPoint>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM datapoints WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row).transpose()
    }

    /// One page of the data points matching `predicate`
    pub async fn find_page(
        &self,
        predicate: &Predicate,
        page: &PageRequest,
    ) -> DatabaseResult<Vec<DataPoint>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM datapoints WHERE "));
        push_predicate(&mut builder, predicate);
        push_page(&mut builder, page);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_row).collect()
    }

    /// Number of data points matching `predicate`
    pub async fn count(&self, predicate: &Predicate) -> DatabaseResult<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM datapoints WHERE ");
        push_predicate(&mut builder, predicate);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM datapoints WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_deployment_ids_in(
        conn: &mut SqliteConnection,
        deployment_ids: &[String],
    ) -> DatabaseResult<u64> {
        delete_where_in(conn, "datapoints", "deployment_id", deployment_ids).await
    }

    pub async fn count_by_deployment_ids(&self, deployment_ids: &[String]) -> DatabaseResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count_where_in(&mut conn, "datapoints", "deployment_id", deployment_ids).await
    }
}

fn map_row(row: &SqliteRow) -> DatabaseResult<DataPoint> {
    let header: String = row.try_get("carp_header")?;
    let body: Option<String> = row.try_get("carp_body")?;

    Ok(DataPoint {
        id: row.try_get("id")?,
        deployment_id: row.try_get("deployment_id")?,
        created_by: row.try_get("created_by")?,
        updated_by: row.try_get("updated_by")?,
        carp_header: serde_json::from_str(&header)?,
        carp_body: body.as_deref().map(serde_json::from_str).transpose()?,
        storage_name: row.try_get("storage_name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

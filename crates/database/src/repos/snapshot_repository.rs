//! Snapshot repository for tables holding one JSON document per aggregate.

use crate::entities::{SnapshotRow, SnapshotTable};
use crate::types::{DatabaseError, DatabaseResult};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

/// Repository over a [`SnapshotTable`]. Rows are addressed by the aggregate
/// key embedded in the document, never by the surrogate row id.
#[derive(Clone)]
pub struct SnapshotRepository {
    pool: SqlitePool,
    table: SnapshotTable,
}

impl SnapshotRepository {
    pub fn new(pool: SqlitePool, table: SnapshotTable) -> Self {
        Self { pool, table }
    }

    pub fn table(&self) -> SnapshotTable {
        self.table
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a new document. A second document with the same embedded key
    /// violates the table's unique index and yields [`DatabaseError::Duplicate`].
    pub async fn insert(&self, snapshot: &serde_json::Value) -> DatabaseResult<SnapshotRow> {
        let body = serde_json::to_string(snapshot)?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(&format!(
            "INSERT INTO {} (snapshot, created_at, updated_at) VALUES (?, ?, ?)",
            self.table.name
        ))
        .bind(&body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(table = self.table.name, row_id = result.last_insert_rowid(), "snapshot inserted");
        Ok(SnapshotRow {
            id: result.last_insert_rowid(),
            snapshot: snapshot.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn exists(&self, key: &str) -> DatabaseResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT 1 FROM {} WHERE {} = ? LIMIT 1",
            self.table.name,
            self.table.key_expression()
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    /// Find the document whose embedded key equals `key`
    pub async fn find_by_key(&self, key: &str) -> DatabaseResult<Option<SnapshotRow>> {
        let mut conn = self.pool.acquire().await?;
        self.find_by_key_in(&mut conn, key).await
    }

    /// Same as [`Self::find_by_key`], on a caller-supplied connection or transaction.
    pub async fn find_by_key_in(
        &self,
        conn: &mut SqliteConnection,
        key: &str,
    ) -> DatabaseResult<Option<SnapshotRow>> {
        let row = sqlx::query(&format!(
            "SELECT id, snapshot, created_at, updated_at FROM {} WHERE {} = ?",
            self.table.name,
            self.table.key_expression()
        ))
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;

        row.as_ref().map(map_row).transpose()
    }

    pub async fn find_by_keys(&self, keys: &[String]) -> DatabaseResult<Vec<SnapshotRow>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT id, snapshot, created_at, updated_at FROM ");
        builder
            .push(self.table.name)
            .push(" WHERE ")
            .push(self.table.key_expression())
            .push(" IN (");
        let mut separated = builder.separated(", ");
        for key in keys {
            separated.push_bind(key.clone());
        }
        separated.push_unseparated(") ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_row).collect()
    }

    /// Documents whose embedded owner reference equals `owner`.
    pub async fn find_by_owner(&self, owner: &str) -> DatabaseResult<Vec<SnapshotRow>> {
        let owner_expression = self.table.owner_expression().ok_or_else(|| {
            DatabaseError::ValidationError(format!("table {} has no owner reference", self.table.name))
        })?;

        let rows = sqlx::query(&format!(
            "SELECT id, snapshot, created_at, updated_at FROM {} WHERE {} = ? ORDER BY id",
            self.table.name, owner_expression
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }

    /// Replace the stored document wholesale. Returns false when no document
    /// carries `key`.
    pub async fn replace(&self, key: &str, snapshot: &serde_json::Value) -> DatabaseResult<bool> {
        let body = serde_json::to_string(snapshot)?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(&format!(
            "UPDATE {} SET snapshot = ?, updated_at = ? WHERE {} = ?",
            self.table.name,
            self.table.key_expression()
        ))
        .bind(&body)
        .bind(&now)
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_key(&self, key: &str) -> DatabaseResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Ok(self.delete_by_key_in(&mut conn, key).await? > 0)
    }

    /// Delete on a caller-supplied connection; returns the number of rows removed.
    pub async fn delete_by_key_in(&self, conn: &mut SqliteConnection, key: &str) -> DatabaseResult<u64> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = ?",
            self.table.name,
            self.table.key_expression()
        ))
        .bind(key)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table.name))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn map_row(row: &SqliteRow) -> DatabaseResult<SnapshotRow> {
    let body: String = row.try_get("snapshot")?;
    Ok(SnapshotRow {
        id: row.try_get("id")?,
        snapshot: serde_json::from_str(&body)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

//! Snapshot aggregate store
//!
//! Aggregates are persisted as a single structured document produced from
//! their snapshot. The aggregate key lives inside the document and is backed
//! by a unique expression index, so a lost check-then-insert race still ends
//! in [`StudyError::AlreadyExists`] rather than a second row.

use std::marker::PhantomData;

use async_trait::async_trait;
use cohort_database::{DatabaseError, SnapshotRepository, SnapshotRow, SnapshotTable};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, info, warn};

use crate::codec::{DocumentCodec, JsonCodec};
use crate::error::{StudyError, StudyResult};

/// A domain object persisted through its snapshot.
pub trait Aggregate: Sized + Send + Sync {
    /// Human readable kind used in errors and logs.
    const KIND: &'static str;

    type Snapshot: Serialize + DeserializeOwned + PartialEq + Send + Sync;

    /// Value of the key embedded in the snapshot document.
    fn key(&self) -> String;

    fn snapshot(&self) -> Self::Snapshot;

    fn from_snapshot(snapshot: Self::Snapshot) -> Self;
}

#[async_trait]
pub trait SnapshotStore<A: Aggregate>: Send + Sync {
    /// Persist a new aggregate; fails with `AlreadyExists` when its key is taken.
    async fn add(&self, aggregate: &A) -> StudyResult<()>;

    async fn get_by_id(&self, id: &str) -> StudyResult<Option<A>>;

    /// Replace the stored snapshot; last writer wins.
    async fn update(&self, aggregate: &A) -> StudyResult<()>;

    async fn remove(&self, id: &str) -> StudyResult<bool>;
}

pub struct SqliteSnapshotStore<A, C = JsonCodec> {
    repository: SnapshotRepository,
    codec: C,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A, C: Clone> Clone for SqliteSnapshotStore<A, C> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            codec: self.codec.clone(),
            _aggregate: PhantomData,
        }
    }
}

impl<A: Aggregate> SqliteSnapshotStore<A, JsonCodec> {
    pub fn new(pool: SqlitePool, table: SnapshotTable) -> Self {
        Self::with_codec(pool, table, JsonCodec)
    }
}

impl<A, C> SqliteSnapshotStore<A, C>
where
    A: Aggregate,
    C: DocumentCodec<A::Snapshot>,
{
    pub fn with_codec(pool: SqlitePool, table: SnapshotTable, codec: C) -> Self {
        Self {
            repository: SnapshotRepository::new(pool, table),
            codec,
            _aggregate: PhantomData,
        }
    }

    pub fn table(&self) -> SnapshotTable {
        self.repository.table()
    }

    fn encode(&self, aggregate: &A) -> StudyResult<serde_json::Value> {
        self.codec
            .serialize(&aggregate.snapshot())
            .map_err(|err| StudyError::validation(format!("cannot encode {}: {err}", A::KIND)))
    }

    fn decode(&self, row: SnapshotRow) -> StudyResult<A> {
        let key = row
            .snapshot
            .pointer(&json_pointer(self.repository.table().key_path))
            .map(|value| value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()))
            .unwrap_or_else(|| format!("row {}", row.id));

        match self.codec.deserialize(row.snapshot) {
            Ok(snapshot) => Ok(A::from_snapshot(snapshot)),
            Err(source) => {
                error!(kind = A::KIND, key = %key, error = %source, "stored snapshot could not be decoded");
                Err(StudyError::CorruptSnapshot {
                    kind: A::KIND,
                    id: key,
                    source,
                })
            }
        }
    }

    /// Read on a caller-supplied connection or open transaction.
    pub async fn get_by_id_in(&self, conn: &mut SqliteConnection, id: &str) -> StudyResult<Option<A>> {
        self.repository
            .find_by_key_in(conn, id)
            .await?
            .map(|row| self.decode(row))
            .transpose()
    }

    /// Delete on a caller-supplied connection; returns the number of rows removed.
    pub async fn remove_in(&self, conn: &mut SqliteConnection, id: &str) -> StudyResult<u64> {
        Ok(self.repository.delete_by_key_in(conn, id).await?)
    }

    pub async fn find_by_keys(&self, ids: &[String]) -> StudyResult<Vec<A>> {
        let rows = self.repository.find_by_keys(ids).await?;
        rows.into_iter().map(|row| self.decode(row)).collect()
    }

    pub async fn find_by_owner(&self, owner: &str) -> StudyResult<Vec<A>> {
        let rows = self.repository.find_by_owner(owner).await?;
        rows.into_iter().map(|row| self.decode(row)).collect()
    }
}

#[async_trait]
impl<A, C> SnapshotStore<A> for SqliteSnapshotStore<A, C>
where
    A: Aggregate,
    C: DocumentCodec<A::Snapshot>,
{
    async fn add(&self, aggregate: &A) -> StudyResult<()> {
        let key = aggregate.key();
        if self.repository.exists(&key).await? {
            warn!(kind = A::KIND, key = %key, "rejected duplicate aggregate");
            return Err(StudyError::already_exists(A::KIND, key));
        }

        let document = self.encode(aggregate)?;
        match self.repository.insert(&document).await {
            Ok(_) => {
                info!(kind = A::KIND, key = %key, "aggregate saved");
                Ok(())
            }
            Err(DatabaseError::Duplicate(_)) => {
                warn!(kind = A::KIND, key = %key, "rejected duplicate aggregate after concurrent insert");
                Err(StudyError::already_exists(A::KIND, key))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_by_id(&self, id: &str) -> StudyResult<Option<A>> {
        let Some(row) = self.repository.find_by_key(id).await? else {
            info!(kind = A::KIND, key = %id, "aggregate not found");
            return Ok(None);
        };
        self.decode(row).map(Some)
    }

    async fn update(&self, aggregate: &A) -> StudyResult<()> {
        let key = aggregate.key();
        let document = self.encode(aggregate)?;

        if !self.repository.replace(&key, &document).await? {
            warn!(kind = A::KIND, key = %key, "update of missing aggregate");
            return Err(StudyError::not_found(A::KIND, key));
        }
        info!(kind = A::KIND, key = %key, "aggregate updated");
        Ok(())
    }

    async fn remove(&self, id: &str) -> StudyResult<bool> {
        let removed = self.repository.delete_by_key(id).await?;
        if removed {
            info!(kind = A::KIND, key = %id, "aggregate deleted");
        }
        Ok(removed)
    }
}

/// `$.a.b` to `/a/b`
fn json_pointer(path: &str) -> String {
    path.trim_start_matches('$').replace('.', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_paths_become_pointers() {
        assert_eq!(json_pointer("$.id"), "/id");
        assert_eq!(json_pointer("$.studyId"), "/studyId");
    }
}

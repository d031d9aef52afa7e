//! Cascading removal of a study and everything recruited under it
//!
//! The dependent set is derived at removal time: the study's recruitment
//! names the deployments, and collections are looked up by study id. All
//! deletions share one transaction, so a failing step leaves every store
//! exactly as it was.

use std::sync::Arc;

use async_trait::async_trait;
use cohort_database::{
    CollectionRepository, ConsentDocumentRepository, DataPointRepository, DocumentRepository,
    ExportRepository, FileRepository, RECRUITMENTS, STUDIES,
};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{Recruitment, Study};
use crate::error::{StudyError, StudyResult};
use crate::store::{Aggregate, SqliteSnapshotStore};

/// Resolves the collections created under a study.
#[async_trait]
pub trait CollectionLookup: Send + Sync {
    async fn collection_ids_by_study_id(
        &self,
        conn: &mut SqliteConnection,
        study_id: &str,
    ) -> StudyResult<Vec<i64>>;
}

#[async_trait]
pub trait CollectionScopedDeletion: Send + Sync {
    async fn delete_all_by_collection_ids(
        &self,
        conn: &mut SqliteConnection,
        collection_ids: &[i64],
    ) -> StudyResult<u64>;
}

#[async_trait]
pub trait DeploymentScopedDeletion: Send + Sync {
    async fn delete_all_by_deployment_ids(
        &self,
        conn: &mut SqliteConnection,
        deployment_ids: &[String],
    ) -> StudyResult<u64>;
}

#[async_trait]
pub trait StudyScopedDeletion: Send + Sync {
    async fn delete_by_study_id(&self, conn: &mut SqliteConnection, study_id: &str) -> StudyResult<u64>;
}

#[async_trait]
impl CollectionLookup for CollectionRepository {
    async fn collection_ids_by_study_id(
        &self,
        conn: &mut SqliteConnection,
        study_id: &str,
    ) -> StudyResult<Vec<i64>> {
        Ok(CollectionRepository::find_ids_by_study_id_in(conn, study_id).await?)
    }
}

#[async_trait]
impl CollectionScopedDeletion for DocumentRepository {
    async fn delete_all_by_collection_ids(
        &self,
        conn: &mut SqliteConnection,
        collection_ids: &[i64],
    ) -> StudyResult<u64> {
        Ok(DocumentRepository::delete_by_collection_ids_in(conn, collection_ids).await?)
    }
}

#[async_trait]
impl DeploymentScopedDeletion for CollectionRepository {
    async fn delete_all_by_deployment_ids(
        &self,
        conn: &mut SqliteConnection,
        deployment_ids: &[String],
    ) -> StudyResult<u64> {
        Ok(CollectionRepository::delete_by_deployment_ids_in(conn, deployment_ids).await?)
    }
}

#[async_trait]
impl DeploymentScopedDeletion for ConsentDocumentRepository {
    async fn delete_all_by_deployment_ids(
        &self,
        conn: &mut SqliteConnection,
        deployment_ids: &[String],
    ) -> StudyResult<u64> {
        Ok(ConsentDocumentRepository::delete_by_deployment_ids_in(conn, deployment_ids).await?)
    }
}

#[async_trait]
impl DeploymentScopedDeletion for DataPointRepository {
    async fn delete_all_by_deployment_ids(
        &self,
        conn: &mut SqliteConnection,
        deployment_ids: &[String],
    ) -> StudyResult<u64> {
        Ok(DataPointRepository::delete_by_deployment_ids_in(conn, deployment_ids).await?)
    }
}

#[async_trait]
impl StudyScopedDeletion for FileRepository {
    async fn delete_by_study_id(&self, conn: &mut SqliteConnection, study_id: &str) -> StudyResult<u64> {
        Ok(FileRepository::delete_by_study_id_in(conn, study_id).await?)
    }
}

#[async_trait]
impl StudyScopedDeletion for ExportRepository {
    async fn delete_by_study_id(&self, conn: &mut SqliteConnection, study_id: &str) -> StudyResult<u64> {
        Ok(ExportRepository::delete_by_study_id_in(conn, study_id).await?)
    }
}

/// Studies are keyed by their id and recruitments by their study id, so
/// both stores delete by key.
#[async_trait]
impl<A> StudyScopedDeletion for SqliteSnapshotStore<A>
where
    A: Aggregate,
{
    async fn delete_by_study_id(&self, conn: &mut SqliteConnection, study_id: &str) -> StudyResult<u64> {
        self.remove_in(conn, study_id).await
    }
}

/// The stores a removal touches, in the order it touches them.
#[derive(Clone)]
pub struct RemovalPorts {
    pub collection_lookup: Arc<dyn CollectionLookup>,
    pub documents: Arc<dyn CollectionScopedDeletion>,
    pub collections: Arc<dyn DeploymentScopedDeletion>,
    pub consent_documents: Arc<dyn DeploymentScopedDeletion>,
    pub data_points: Arc<dyn DeploymentScopedDeletion>,
    pub files: Arc<dyn StudyScopedDeletion>,
    pub exports: Arc<dyn StudyScopedDeletion>,
    pub recruitments: Arc<dyn StudyScopedDeletion>,
    pub studies: Arc<dyn StudyScopedDeletion>,
}

impl RemovalPorts {
    /// Wire the SQLite repositories.
    pub fn sqlite(pool: &SqlitePool) -> Self {
        let collections = Arc::new(CollectionRepository::new(pool.clone()));
        Self {
            collection_lookup: collections.clone(),
            documents: Arc::new(DocumentRepository::new(pool.clone())),
            collections,
            consent_documents: Arc::new(ConsentDocumentRepository::new(pool.clone())),
            data_points: Arc::new(DataPointRepository::new(pool.clone())),
            files: Arc::new(FileRepository::new(pool.clone())),
            exports: Arc::new(ExportRepository::new(pool.clone())),
            recruitments: Arc::new(SqliteSnapshotStore::<Recruitment>::new(pool.clone(), RECRUITMENTS)),
            studies: Arc::new(SqliteSnapshotStore::<Study>::new(pool.clone(), STUDIES)),
        }
    }
}

/// Rows removed per store by one study removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemovalReport {
    pub study_id: String,
    pub deployment_ids: Vec<String>,
    pub documents: u64,
    pub collections: u64,
    pub consent_documents: u64,
    pub data_points: u64,
    pub files: u64,
    pub exports: u64,
    pub recruitments: u64,
    pub studies: u64,
}

impl RemovalReport {
    pub fn study_removed(&self) -> bool {
        self.studies > 0
    }
}

#[derive(Clone)]
pub struct StudyRemoval {
    pool: SqlitePool,
    recruitments: SqliteSnapshotStore<Recruitment>,
    ports: RemovalPorts,
}

impl StudyRemoval {
    pub fn new(pool: SqlitePool) -> Self {
        let ports = RemovalPorts::sqlite(&pool);
        Self::with_ports(pool, ports)
    }

    pub fn with_ports(pool: SqlitePool, ports: RemovalPorts) -> Self {
        Self {
            recruitments: SqliteSnapshotStore::new(pool.clone(), RECRUITMENTS),
            pool,
            ports,
        }
    }

    /// Remove a study with its recruitment and every dependent record.
    ///
    /// Returns whether the study row existed. A missing study still sweeps
    /// whatever dependents reference its id.
    pub async fn remove_study(&self, study_id: Uuid) -> StudyResult<bool> {
        Ok(self.remove_study_with_report(study_id).await?.study_removed())
    }

    pub async fn remove_study_with_report(&self, study_id: Uuid) -> StudyResult<RemovalReport> {
        let key = study_id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| StudyError::cascade(&key, "begin", err.into()))?;

        let report = match self.cascade(&mut tx, &key).await {
            Ok(report) => report,
            Err(err) => {
                error!(study_id = %key, error = %err, "study removal rolled back");
                if let Err(rollback) = tx.rollback().await {
                    warn!(study_id = %key, error = %rollback, "rollback after failed removal reported an error");
                }
                return Err(err);
            }
        };

        tx.commit()
            .await
            .map_err(|err| StudyError::cascade(&key, "commit", err.into()))?;

        info!(
            study_id = %key,
            deployments = report.deployment_ids.len(),
            documents = report.documents,
            collections = report.collections,
            consent_documents = report.consent_documents,
            data_points = report.data_points,
            files = report.files,
            exports = report.exports,
            recruitments = report.recruitments,
            studies = report.studies,
            "study removed"
        );
        Ok(report)
    }

    async fn cascade(&self, conn: &mut SqliteConnection, study_id: &str) -> StudyResult<RemovalReport> {
        let step = |name: &'static str| move |err: StudyError| StudyError::cascade(study_id, name, err);

        let deployment_ids = self
            .recruitments
            .get_by_id_in(conn, study_id)
            .await
            .map_err(step("resolve_deployments"))?
            .map(|recruitment| recruitment.deployment_ids())
            .unwrap_or_default();

        let collection_ids = self
            .ports
            .collection_lookup
            .collection_ids_by_study_id(conn, study_id)
            .await
            .map_err(step("resolve_collections"))?;

        let mut report = RemovalReport {
            study_id: study_id.to_string(),
            ..RemovalReport::default()
        };

        report.documents = self
            .ports
            .documents
            .delete_all_by_collection_ids(conn, &collection_ids)
            .await
            .map_err(step("documents"))?;
        report.collections = self
            .ports
            .collections
            .delete_all_by_deployment_ids(conn, &deployment_ids)
            .await
            .map_err(step("collections"))?;
        report.consent_documents = self
            .ports
            .consent_documents
            .delete_all_by_deployment_ids(conn, &deployment_ids)
            .await
            .map_err(step("consent_documents"))?;
        report.data_points = self
            .ports
            .data_points
            .delete_all_by_deployment_ids(conn, &deployment_ids)
            .await
            .map_err(step("data_points"))?;
        report.files = self
            .ports
            .files
            .delete_by_study_id(conn, study_id)
            .await
            .map_err(step("files"))?;
        report.exports = self
            .ports
            .exports
            .delete_by_study_id(conn, study_id)
            .await
            .map_err(step("exports"))?;
        report.recruitments = self
            .ports
            .recruitments
            .delete_by_study_id(conn, study_id)
            .await
            .map_err(step("recruitment"))?;
        report.studies = self
            .ports
            .studies
            .delete_by_study_id(conn, study_id)
            .await
            .map_err(step("study"))?;

        report.deployment_ids = deployment_ids;
        Ok(report)
    }
}

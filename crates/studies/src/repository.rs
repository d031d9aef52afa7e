//! Study and participant repositories built on the snapshot store

use cohort_database::{RECRUITMENTS, STUDIES};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Recruitment, Study};
use crate::error::StudyResult;
use crate::store::{SnapshotStore, SqliteSnapshotStore};

/// Repository for studies and the deployments recruited for them
#[derive(Clone)]
pub struct StudyRepository {
    studies: SqliteSnapshotStore<Study>,
    recruitments: SqliteSnapshotStore<Recruitment>,
}

impl StudyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            studies: SqliteSnapshotStore::new(pool.clone(), STUDIES),
            recruitments: SqliteSnapshotStore::new(pool, RECRUITMENTS),
        }
    }

    pub fn store(&self) -> &SqliteSnapshotStore<Study> {
        &self.studies
    }

    /// Store a new study. Its invitation's application data is bound to the study id.
    pub async fn add(&self, mut study: Study) -> StudyResult<Study> {
        study.bind_invitation();
        self.studies.add(&study).await?;
        Ok(study)
    }

    pub async fn get_by_id(&self, study_id: Uuid) -> StudyResult<Option<Study>> {
        self.studies.get_by_id(&study_id.to_string()).await
    }

    pub async fn get_for_owner(&self, owner_id: Uuid) -> StudyResult<Vec<Study>> {
        self.studies.find_by_owner(&owner_id.to_string()).await
    }

    pub async fn find_all_by_study_ids(&self, study_ids: &[Uuid]) -> StudyResult<Vec<Study>> {
        let keys: Vec<String> = study_ids.iter().map(Uuid::to_string).collect();
        self.studies.find_by_keys(&keys).await
    }

    pub async fn update(&self, study: &Study) -> StudyResult<()> {
        self.studies.update(study).await
    }

    /// Deployment ids recruited for `study_id`; empty without a recruitment.
    pub async fn get_deployment_ids(&self, study_id: Uuid) -> StudyResult<Vec<String>> {
        let deployment_ids = self
            .recruitments
            .get_by_id(&study_id.to_string())
            .await?
            .map(|recruitment| recruitment.deployment_ids())
            .unwrap_or_default();

        debug!(study_id = %study_id, count = deployment_ids.len(), "resolved deployment ids");
        Ok(deployment_ids)
    }
}

/// Repository for the recruitment of each study
#[derive(Clone)]
pub struct ParticipantRepository {
    recruitments: SqliteSnapshotStore<Recruitment>,
}

impl ParticipantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            recruitments: SqliteSnapshotStore::new(pool, RECRUITMENTS),
        }
    }

    pub fn store(&self) -> &SqliteSnapshotStore<Recruitment> {
        &self.recruitments
    }

    /// Store a recruitment; a study has at most one.
    pub async fn add_recruitment(&self, recruitment: &Recruitment) -> StudyResult<()> {
        self.recruitments.add(recruitment).await
    }

    pub async fn get_recruitment(&self, study_id: Uuid) -> StudyResult<Option<Recruitment>> {
        self.recruitments.get_by_id(&study_id.to_string()).await
    }

    pub async fn update_recruitment(&self, recruitment: &Recruitment) -> StudyResult<()> {
        self.recruitments.update(recruitment).await
    }

    pub async fn remove_recruitment(&self, study_id: Uuid) -> StudyResult<bool> {
        self.recruitments.remove(&study_id.to_string()).await
    }
}

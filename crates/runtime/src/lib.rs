use std::sync::Arc;

use anyhow::{Context, Result};
use cohort_config::AppConfig;
use cohort_database::initialize_database;
use cohort_studies::{
    CreationCounter, DataPointService, ParticipantRepository, StudyRemoval, StudyRepository,
};
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    /// Install the global subscriber. `RUST_LOG` wins over the configured filter.
    pub fn init_tracing(default_filter: &str) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_env_filter(env_filter)
            .with_target(false)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub studies: StudyRepository,
    pub participants: ParticipantRepository,
    pub removal: StudyRemoval,
    pub data_points: DataPointService,
    pub creations: Arc<CreationCounter>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let creations = Arc::new(CreationCounter::new());
        let data_points = DataPointService::new(db_pool.clone(), &config.query, creations.clone());

        info!(
            max_page_size = config.query.max_page_size,
            max_filter_length = config.query.max_filter_length,
            "backend services ready"
        );

        Ok(Self {
            studies: StudyRepository::new(db_pool.clone()),
            participants: ParticipantRepository::new(db_pool.clone()),
            removal: StudyRemoval::new(db_pool.clone()),
            data_points,
            creations,
            db_pool,
        })
    }

    pub async fn close(self) {
        self.db_pool.close().await;
    }
}

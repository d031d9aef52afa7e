//! Cohort Database Crate
//!
//! This crate provides database functionality for the Cohort backend,
//! including connection management, migrations, predicate rendering and
//! repository implementations.

use cohort_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod query;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;
pub use query::{PageRequest, Sort};

pub use repos::{
    CollectionRepository, ConsentDocumentRepository, DataPointRepository, DocumentRepository,
    ExportRepository, FileRepository, SnapshotRepository,
};

pub use entities::{
    Collection, ConsentDocument, CreateCollectionRequest, CreateConsentDocumentRequest,
    CreateDataPointRequest, CreateDocumentRequest, CreateExportRequest, CreateFileRequest,
    DataPoint, Document, Export, ExportStatus, SnapshotRow, SnapshotTable, StoredFile,
    DATA_POINT_SCHEMA, RECRUITMENTS, STUDIES,
};

pub use types::{DatabaseError, DatabaseResult};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

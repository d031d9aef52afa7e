#![allow(dead_code)]

use cohort_config::DatabaseConfig;
use cohort_database::initialize_database;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub struct TestDatabase {
    pub pool: SqlitePool,
    _temp_dir: TempDir,
}

pub async fn test_database() -> TestDatabase {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite:{}", temp_dir.path().join("studies.db").display()),
        max_connections: 4,
    };
    let pool = initialize_database(&config).await.unwrap();
    TestDatabase {
        pool,
        _temp_dir: temp_dir,
    }
}

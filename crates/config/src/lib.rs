use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "cohort.toml",
    "config/cohort.toml",
    "crates/config/cohort.toml",
    "../cohort.toml",
    "../config/cohort.toml",
    "../crates/config/cohort.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://cohort.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Limits applied to caller-supplied filter expressions and pagination.
///
/// ```
/// use cohort_config::QueryConfig;
///
/// let query = QueryConfig::default();
/// assert_eq!(query.default_page_size, 50);
/// assert_eq!(query.max_page_size, 1000);
/// assert_eq!(query.max_filter_length, 2048);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "QueryConfig::default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "QueryConfig::default_max_page_size")]
    pub max_page_size: u32,
    #[serde(default = "QueryConfig::default_max_filter_length")]
    pub max_filter_length: usize,
}

impl QueryConfig {
    const fn default_page_size() -> u32 {
        50
    }

    const fn default_max_page_size() -> u32 {
        1000
    }

    const fn default_max_filter_length() -> usize {
        2048
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: Self::default_page_size(),
            max_page_size: Self::default_max_page_size(),
            max_filter_length: Self::default_max_filter_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_filter")]
    pub filter: String,
}

impl LoggingConfig {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use cohort_config::load;
///
/// std::env::remove_var("COHORT_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.database.url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let page_size = i64::from(defaults.query.default_page_size);
    let max_page_size = i64::from(defaults.query.max_page_size);
    let max_filter_length = i64::try_from(defaults.query.max_filter_length).unwrap_or(i64::MAX);

    let mut builder = config::Config::builder()
        .set_default("database.url", defaults.database.url.clone())
        .context("invalid default for database.url")?
        .set_default("database.max_connections", i64::from(defaults.database.max_connections))
        .context("invalid default for database.max_connections")?
        .set_default("query.default_page_size", page_size)
        .context("invalid default for query.default_page_size")?
        .set_default("query.max_page_size", max_page_size)
        .context("invalid default for query.max_page_size")?
        .set_default("query.max_filter_length", max_filter_length)
        .context("invalid default for query.max_filter_length")?
        .set_default("logging.filter", defaults.logging.filter.clone())
        .context("invalid default for logging.filter")?;

    let environment_overrides = config::Environment::with_prefix("COHORT").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("COHORT_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via COHORT_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.query.default_page_size > config.query.max_page_size {
        config.query.default_page_size = config.query.max_page_size;
    }

    debug!(?config, "loaded backend configuration");
    Ok(config)
}

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use cohort_backend_runtime::{telemetry, BackendServices};
use cohort_config::{load as load_config, AppConfig};
use cohort_query::{Caller, Role};
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "cohort-backend")]
#[command(about = "Cohort research data administration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Remove a study together with its recruitment and all dependent records
    RemoveStudy {
        study_id: Uuid,
    },
    /// Count the data points of a deployment visible to a caller
    CountDataPoints {
        deployment_id: String,
        /// Filter expression, e.g. "carp_header.data_format.name==steps"
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        caller: Option<Uuid>,
        #[arg(long, default_value = "researcher")]
        role: String,
    },
    /// Print one page of a deployment's data points as JSON
    ListDataPoints {
        deployment_id: String,
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        caller: Option<Uuid>,
        #[arg(long, default_value = "researcher")]
        role: String,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
        /// Sort field; prefix with '-' for descending
        #[arg(long)]
        sort: Option<String>,
    },
    /// Import a JSON array of data points into a deployment
    ImportDataPoints {
        deployment_id: String,
        file: PathBuf,
        #[arg(long)]
        caller: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config().context("failed to load configuration")?;
    telemetry::init_tracing(&config.logging.filter).context("failed to initialise tracing")?;

    match cli.command {
        Commands::Migrate => migrate(&config).await,
        Commands::RemoveStudy { study_id } => remove_study(&config, study_id).await,
        Commands::CountDataPoints {
            deployment_id,
            query,
            caller,
            role,
        } => {
            let caller = caller_from_args(caller, &role);
            count_data_points(&config, &caller, &deployment_id, query.as_deref()).await
        }
        Commands::ListDataPoints {
            deployment_id,
            query,
            caller,
            role,
            page,
            size,
            sort,
        } => {
            let caller = caller_from_args(caller, &role);
            let paging = Paging { page, size, sort };
            list_data_points(&config, &caller, &deployment_id, query.as_deref(), paging).await
        }
        Commands::ImportDataPoints {
            deployment_id,
            file,
            caller,
        } => {
            let caller = Caller::new(caller, Role::Participant);
            import_data_points(&config, &caller, &deployment_id, &file).await
        }
    }
}

/// An anonymous caller gets a fresh id, so below-researcher roles see nothing
/// they did not author.
fn caller_from_args(caller: Option<Uuid>, role: &str) -> Caller {
    Caller::new(caller.unwrap_or_else(Uuid::new_v4), Role::from(role))
}

struct Paging {
    page: Option<u32>,
    size: Option<u32>,
    sort: Option<String>,
}

async fn services(config: &AppConfig) -> anyhow::Result<BackendServices> {
    BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    // Initialisation applies any pending migrations.
    let services = services(config).await?;
    println!("Database at {} is up to date", config.database.url);
    services.close().await;
    Ok(())
}

async fn remove_study(config: &AppConfig, study_id: Uuid) -> anyhow::Result<()> {
    let services = services(config).await?;

    let report = services
        .removal
        .remove_study_with_report(study_id)
        .await
        .with_context(|| format!("failed to remove study {study_id}"))?;

    if report.study_removed() {
        println!("Removed study {study_id}");
    } else {
        println!("Study {study_id} did not exist; swept remaining dependents");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    services.close().await;
    Ok(())
}

async fn count_data_points(
    config: &AppConfig,
    caller: &Caller,
    deployment_id: &str,
    query: Option<&str>,
) -> anyhow::Result<()> {
    let services = services(config).await?;

    let count = services
        .data_points
        .count(caller, deployment_id, query)
        .await
        .context("failed to count data points")?;
    info!(deployment_id, role = %caller.role, count, "counted data points");
    println!("{count}");

    services.close().await;
    Ok(())
}

async fn list_data_points(
    config: &AppConfig,
    caller: &Caller,
    deployment_id: &str,
    query: Option<&str>,
    paging: Paging,
) -> anyhow::Result<()> {
    let services = services(config).await?;

    let request = services
        .data_points
        .page_request(paging.page, paging.size, paging.sort.as_deref())
        .context("invalid paging parameters")?;
    let page = services
        .data_points
        .get_page(caller, deployment_id, request, query)
        .await
        .context("failed to list data points")?;
    println!("{}", serde_json::to_string_pretty(&page)?);

    services.close().await;
    Ok(())
}

async fn import_data_points(
    config: &AppConfig,
    caller: &Caller,
    deployment_id: &str,
    file: &Path,
) -> anyhow::Result<()> {
    let batch = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let services = services(config).await?;
    let created = services
        .data_points
        .create_many(caller, deployment_id, &batch)
        .await
        .context("failed to import data points")?;
    println!("Imported {} data points into {deployment_id}", created.len());

    services.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn count_defaults_to_the_researcher_role() {
        let cli = Cli::try_parse_from(["cohort-backend", "count-data-points", "D1"]).unwrap();
        match cli.command {
            Commands::CountDataPoints { role, caller, query, .. } => {
                assert_eq!(Role::from(role.as_str()), Role::Researcher);
                assert!(caller.is_none());
                assert!(query.is_none());
            }
            _ => panic!("expected count-data-points"),
        }
    }

    #[test]
    fn import_requires_a_caller() {
        assert!(Cli::try_parse_from(["cohort-backend", "import-data-points", "D1", "batch.json"]).is_err());
        let study = Uuid::new_v4().to_string();
        assert!(Cli::try_parse_from(["cohort-backend", "remove-study", study.as_str()]).is_ok());
        assert!(Cli::try_parse_from(["cohort-backend", "remove-study", "not-a-uuid"]).is_err());
    }
}

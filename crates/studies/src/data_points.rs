//! Scoped data point queries and ingestion

use std::sync::Arc;

use cohort_config::QueryConfig;
use cohort_database::{
    CreateDataPointRequest, DataPoint, DataPointRepository, PageRequest, Sort, DATA_POINT_SCHEMA,
};
use cohort_query::{Caller, CompiledPredicate, FilterBuilder};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{StudyError, StudyResult};
use crate::observer::{CreationObserver, DATA_POINTS_CREATED};

const KIND: &str = "data point";

/// Data point as submitted by a client; ownership comes from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDataPoint {
    pub carp_header: serde_json::Value,
    #[serde(default)]
    pub carp_body: Option<serde_json::Value>,
    #[serde(default)]
    pub storage_name: Option<String>,
}

/// One page of a listing with the total matching the same predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPointPage {
    pub items: Vec<DataPoint>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
}

#[derive(Clone)]
pub struct DataPointService {
    repository: DataPointRepository,
    filters: FilterBuilder,
    default_page_size: u32,
    max_page_size: u32,
    observer: Arc<dyn CreationObserver>,
}

impl DataPointService {
    pub fn new(pool: SqlitePool, config: &QueryConfig, observer: Arc<dyn CreationObserver>) -> Self {
        Self {
            repository: DataPointRepository::new(pool),
            filters: FilterBuilder::new(config.max_filter_length),
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            observer,
        }
    }

    /// Build a page request from optional caller parameters.
    pub fn page_request(
        &self,
        page: Option<u32>,
        size: Option<u32>,
        sort: Option<&str>,
    ) -> StudyResult<PageRequest> {
        let mut request = PageRequest::new(page.unwrap_or(0), size.unwrap_or(self.default_page_size));
        if let Some(sort) = sort.map(str::trim).filter(|sort| !sort.is_empty()) {
            request = request.with_sort(Sort::parse(sort, &DATA_POINT_SCHEMA)?);
        }
        Ok(request.clamped(self.max_page_size))
    }

    /// Compile the caller's filter for one deployment.
    pub fn compile(
        &self,
        caller: &Caller,
        deployment_id: &str,
        query: Option<&str>,
    ) -> StudyResult<CompiledPredicate> {
        Ok(self
            .filters
            .build(query, caller, deployment_id, &DATA_POINT_SCHEMA)?)
    }

    pub async fn get_all(
        &self,
        caller: &Caller,
        deployment_id: &str,
        page: PageRequest,
        query: Option<&str>,
    ) -> StudyResult<Vec<DataPoint>> {
        let compiled = self.compile(caller, deployment_id, query)?;
        self.list_compiled(&compiled, page).await
    }

    pub async fn count(
        &self,
        caller: &Caller,
        deployment_id: &str,
        query: Option<&str>,
    ) -> StudyResult<i64> {
        let compiled = self.compile(caller, deployment_id, query)?;
        Ok(self.repository.count(compiled.predicate()).await?)
    }

    /// List and count with a single compiled predicate.
    pub async fn get_page(
        &self,
        caller: &Caller,
        deployment_id: &str,
        page: PageRequest,
        query: Option<&str>,
    ) -> StudyResult<DataPointPage> {
        let compiled = self.compile(caller, deployment_id, query)?;
        let page = page.clamped(self.max_page_size);
        let (page_number, size) = (page.page, page.size);
        let items = self.list_compiled(&compiled, page).await?;
        let total = self.repository.count(compiled.predicate()).await?;

        Ok(DataPointPage {
            items,
            total,
            page: page_number,
            size,
        })
    }

    async fn list_compiled(
        &self,
        compiled: &CompiledPredicate,
        page: PageRequest,
    ) -> StudyResult<Vec<DataPoint>> {
        let page = page.clamped(self.max_page_size);
        let items = self.repository.find_page(compiled.predicate(), &page).await?;
        debug!(predicate = %compiled, count = items.len(), "listed data points");
        Ok(items)
    }

    pub async fn get_one(&self, id: i64) -> StudyResult<DataPoint> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| StudyError::not_found(KIND, id.to_string()))
    }

    pub async fn delete(&self, id: i64) -> StudyResult<()> {
        if !self.repository.delete(id).await? {
            return Err(StudyError::not_found(KIND, id.to_string()));
        }
        info!(data_point_id = id, "data point deleted");
        Ok(())
    }

    pub async fn create(
        &self,
        caller: &Caller,
        deployment_id: &str,
        data_point: NewDataPoint,
    ) -> StudyResult<DataPoint> {
        let request = creation_request(caller, deployment_id, data_point)?;
        let created = self.repository.create(&request).await?;
        self.observer.increment(DATA_POINTS_CREATED);
        info!(data_point_id = created.id, deployment_id, "data point created");
        Ok(created)
    }

    /// Import a JSON array of data points; either all are stored or none.
    pub async fn create_many(
        &self,
        caller: &Caller,
        deployment_id: &str,
        batch_json: &str,
    ) -> StudyResult<Vec<DataPoint>> {
        let batch: Vec<NewDataPoint> = serde_json::from_str(batch_json)
            .map_err(|err| StudyError::validation(format!("malformed data point batch: {err}")))?;
        let requests = batch
            .into_iter()
            .map(|data_point| creation_request(caller, deployment_id, data_point))
            .collect::<StudyResult<Vec<_>>>()?;

        let mut tx = self.repository.pool().begin().await?;
        let mut created = Vec::with_capacity(requests.len());
        for request in &requests {
            created.push(DataPointRepository::create_in(&mut tx, request).await?);
        }
        tx.commit().await?;

        for _ in &created {
            self.observer.increment(DATA_POINTS_CREATED);
        }
        info!(deployment_id, count = created.len(), "data point batch imported");
        Ok(created)
    }
}

fn creation_request(
    caller: &Caller,
    deployment_id: &str,
    data_point: NewDataPoint,
) -> StudyResult<CreateDataPointRequest> {
    if !data_point.carp_header.is_object() {
        return Err(StudyError::validation("carp_header must be a JSON object"));
    }
    if deployment_id.trim().is_empty() {
        return Err(StudyError::validation("deployment id must not be empty"));
    }

    Ok(CreateDataPointRequest {
        deployment_id: deployment_id.to_string(),
        created_by: caller.id.to_string(),
        carp_header: data_point.carp_header,
        carp_body: data_point.carp_body,
        storage_name: data_point.storage_name,
    })
}

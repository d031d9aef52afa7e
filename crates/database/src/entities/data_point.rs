//! Data point entity definitions

use cohort_query::QuerySchema;
use serde::{Deserialize, Serialize};

/// Fields of the `datapoints` table callers may filter and sort on.
pub const DATA_POINT_SCHEMA: QuerySchema = QuerySchema::new(
    &[
        "id",
        "deployment_id",
        "created_by",
        "updated_by",
        "storage_name",
        "created_at",
        "updated_at",
    ],
    &["carp_header", "carp_body"],
    "deployment_id",
    "created_by",
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: i64,
    pub deployment_id: String,
    pub created_by: String,
    pub updated_by: String,
    pub carp_header: serde_json::Value,
    pub carp_body: Option<serde_json::Value>,
    pub storage_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDataPointRequest {
    pub deployment_id: String,
    pub created_by: String,
    pub carp_header: serde_json::Value,
    pub carp_body: Option<serde_json::Value>,
    pub storage_name: Option<String>,
}

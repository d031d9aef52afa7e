//! Document entity definitions

use serde::{Deserialize, Serialize};

/// A JSON document stored inside a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub collection_id: i64,
    pub name: String,
    pub data: Option<serde_json::Value>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocumentRequest {
    pub collection_id: i64,
    pub name: String,
    pub data: Option<serde_json::Value>,
}

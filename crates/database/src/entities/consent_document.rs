//! Consent document entity definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentDocument {
    pub id: i64,
    pub deployment_id: String,
    pub created_by: String,
    pub data: serde_json::Value,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConsentDocumentRequest {
    pub deployment_id: String,
    pub created_by: String,
    pub data: serde_json::Value,
}

//! Stored file metadata

use serde::{Deserialize, Serialize};

/// Metadata of an uploaded file; the content itself lives in external storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: i64,
    pub study_id: String,
    pub deployment_id: Option<String>,
    pub storage_name: String,
    pub original_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileRequest {
    pub study_id: String,
    pub deployment_id: Option<String>,
    pub storage_name: String,
    pub original_name: String,
}

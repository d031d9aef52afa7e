//! Export entity definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
    pub id: i64,
    pub study_id: String,
    pub file_name: String,
    pub status: ExportStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExportRequest {
    pub study_id: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExportStatus {
    InProgress,
    Available,
    Error,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::InProgress => "in_progress",
            ExportStatus::Available => "available",
            ExportStatus::Error => "error",
        }
    }
}

impl From<&str> for ExportStatus {
    fn from(s: &str) -> Self {
        match s {
            "available" => ExportStatus::Available,
            "error" => ExportStatus::Error,
            _ => ExportStatus::InProgress,
        }
    }
}

impl ToString for ExportStatus {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

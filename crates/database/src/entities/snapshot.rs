//! Snapshot document rows and the tables that hold them

use serde::{Deserialize, Serialize};

/// Describes a table whose rows hold one JSON snapshot document per aggregate.
///
/// The aggregate key and the optional owner reference live inside the
/// document and are addressed with JSON paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotTable {
    pub name: &'static str,
    pub key_path: &'static str,
    pub owner_path: Option<&'static str>,
}

impl SnapshotTable {
    /// SQL expression selecting the aggregate key; matches the unique index.
    pub fn key_expression(&self) -> String {
        format!("json_extract(snapshot, '{}')", self.key_path)
    }

    pub fn owner_expression(&self) -> Option<String> {
        self.owner_path
            .map(|path| format!("json_extract(snapshot, '{}')", path))
    }
}

pub const STUDIES: SnapshotTable = SnapshotTable {
    name: "studies",
    key_path: "$.id",
    owner_path: Some("$.ownerId"),
};

pub const RECRUITMENTS: SnapshotTable = SnapshotTable {
    name: "recruitments",
    key_path: "$.studyId",
    owner_path: None,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub id: i64,
    pub snapshot: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_expressions_match_indexed_paths() {
        assert_eq!(STUDIES.key_expression(), "json_extract(snapshot, '$.id')");
        assert_eq!(
            RECRUITMENTS.key_expression(),
            "json_extract(snapshot, '$.studyId')"
        );
        assert_eq!(
            STUDIES.owner_expression().as_deref(),
            Some("json_extract(snapshot, '$.ownerId')")
        );
        assert!(RECRUITMENTS.owner_expression().is_none());
    }
}

//! Row entities for the database layer

pub mod collection;
pub mod consent_document;
pub mod data_point;
pub mod document;
pub mod export;
pub mod file;
pub mod snapshot;

pub use collection::{Collection, CreateCollectionRequest};
pub use consent_document::{ConsentDocument, CreateConsentDocumentRequest};
pub use data_point::{CreateDataPointRequest, DataPoint, DATA_POINT_SCHEMA};
pub use document::{CreateDocumentRequest, Document};
pub use export::{CreateExportRequest, Export, ExportStatus};
pub use file::{CreateFileRequest, StoredFile};
pub use snapshot::{SnapshotRow, SnapshotTable, RECRUITMENTS, STUDIES};

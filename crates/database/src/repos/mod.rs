//! Database repository implementations

pub mod collection_repository;
pub mod consent_document_repository;
pub mod data_point_repository;
pub mod document_repository;
pub mod export_repository;
pub mod file_repository;
pub mod snapshot_repository;

pub use collection_repository::*;
pub use consent_document_repository::*;
pub use data_point_repository::*;
pub use document_repository::*;
pub use export_repository::*;
pub use file_repository::*;
pub use snapshot_repository::*;

//! Cohort Studies Crate
//!
//! Study and recruitment aggregates persisted as snapshot documents, the
//! cascading removal of a study with everything recruited under it, and
//! role-scoped data point queries.

pub mod codec;
pub mod data_points;
pub mod domain;
pub mod error;
pub mod observer;
pub mod removal;
pub mod repository;
pub mod store;

pub use codec::{CodecError, Document, DocumentCodec, JsonCodec};
pub use data_points::{DataPointPage, DataPointService, NewDataPoint};
pub use domain::{
    Participant, Recruitment, RecruitmentSnapshot, StagedParticipantGroup, Study, StudyInvitation,
    StudySnapshot,
};
pub use error::{StudyError, StudyResult};
pub use observer::{CreationCounter, CreationObserver, NoopObserver, DATA_POINTS_CREATED};
pub use removal::{
    CollectionLookup, CollectionScopedDeletion, DeploymentScopedDeletion, RemovalPorts,
    RemovalReport, StudyRemoval, StudyScopedDeletion,
};
pub use repository::{ParticipantRepository, StudyRepository};
pub use store::{Aggregate, SnapshotStore, SqliteSnapshotStore};

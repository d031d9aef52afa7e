//! Study and recruitment aggregates

pub mod recruitment;
pub mod study;

pub use recruitment::{Participant, Recruitment, RecruitmentSnapshot, StagedParticipantGroup};
pub use study::{Study, StudyInvitation, StudySnapshot};

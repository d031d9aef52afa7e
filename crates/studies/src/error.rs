//! Error types for study operations.

use cohort_database::DatabaseError;
use cohort_query::QueryError;
use thiserror::Error;

use crate::codec::CodecError;

/// Result type alias for study operations
pub type StudyResult<T> = Result<T, StudyError>;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Stored {kind} {id} could not be decoded")]
    CorruptSnapshot {
        kind: &'static str,
        id: String,
        #[source]
        source: CodecError,
    },

    #[error("Removal of study {study_id} failed at step {step}")]
    CascadeFailure {
        study_id: String,
        step: &'static str,
        #[source]
        source: Box<StudyError>,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl StudyError {
    pub fn already_exists(kind: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists { kind, id: id.into() }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Wrap a failure of one removal step.
    pub fn cascade(study_id: impl Into<String>, step: &'static str, source: StudyError) -> Self {
        Self::CascadeFailure {
            study_id: study_id.into(),
            step,
            source: Box::new(source),
        }
    }

    /// Whether the caller can correct the request. Everything else is an
    /// integrity or infrastructure fault for the host to alert on.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuery(_)
                | Self::AlreadyExists { .. }
                | Self::NotFound { .. }
                | Self::Validation { .. }
        )
    }
}

impl From<sqlx::Error> for StudyError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DatabaseError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_are_classified() {
        assert!(StudyError::not_found("study", "s").is_caller_error());
        assert!(StudyError::already_exists("recruitment", "s").is_caller_error());
        assert!(StudyError::validation("bad").is_caller_error());
        assert!(StudyError::InvalidQuery(QueryError::UnknownField {
            field: "password".to_string()
        })
        .is_caller_error());

        let corrupt = StudyError::CorruptSnapshot {
            kind: "study",
            id: "s".to_string(),
            source: CodecError::new("missing field `name`"),
        };
        assert!(!corrupt.is_caller_error());
        assert!(!StudyError::cascade("s", "data_points", corrupt).is_caller_error());
    }

    #[test]
    fn cascade_failure_keeps_step_and_source() {
        let error = StudyError::cascade(
            "S1",
            "files",
            StudyError::Database(DatabaseError::QueryError("disk I/O error".to_string())),
        );
        assert_eq!(error.to_string(), "Removal of study S1 failed at step files");
        let source = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Database error: Database query error: disk I/O error"));
    }
}

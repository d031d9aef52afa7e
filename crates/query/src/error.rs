//! Error types for filter expression handling

use thiserror::Error;

pub type QueryResult<T> = Result<T, QueryError>;

/// Every variant describes an invalid caller query and carries the offending fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Invalid query at position {position} near '{fragment}': {message}")]
    Syntax {
        position: usize,
        fragment: String,
        message: String,
    },

    #[error("Invalid query: unknown field '{field}'")]
    UnknownField { field: String },

    #[error("Invalid query: value '{value}' is not supported for field '{field}'")]
    UnsupportedValue { field: String, value: String },

    #[error("Invalid query: expression length {length} exceeds the maximum of {max}")]
    TooLong { length: usize, max: usize },
}

impl QueryError {
    pub(crate) fn syntax(input: &str, position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            fragment: fragment_at(input, position),
            message: message.into(),
        }
    }

    /// The part of the caller's input this error refers to.
    pub fn fragment(&self) -> &str {
        match self {
            Self::Syntax { fragment, .. } => fragment,
            Self::UnknownField { field } => field,
            Self::UnsupportedValue { value, .. } => value,
            Self::TooLong { .. } => "",
        }
    }
}

const FRAGMENT_WIDTH: usize = 24;

fn fragment_at(input: &str, position: usize) -> String {
    let start = position.min(input.len());
    input
        .get(start..)
        .unwrap_or_default()
        .chars()
        .take(FRAGMENT_WIDTH)
        .collect()
}

//! Document codecs for aggregate snapshots

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Structured document form of a snapshot as it is persisted.
pub type Document = serde_json::Value;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct CodecError {
    message: String,
}

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Converts snapshots to and from their persisted document form.
pub trait DocumentCodec<S>: Send + Sync {
    fn serialize(&self, snapshot: &S) -> Result<Document, CodecError>;

    fn deserialize(&self, document: Document) -> Result<S, CodecError>;
}

/// serde_json based codec; the document is the snapshot's serde representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<S> DocumentCodec<S> for JsonCodec
where
    S: Serialize + DeserializeOwned,
{
    fn serialize(&self, snapshot: &S) -> Result<Document, CodecError> {
        Ok(serde_json::to_value(snapshot)?)
    }

    fn deserialize(&self, document: Document) -> Result<S, CodecError> {
        Ok(serde_json::from_value(document)?)
    }
}

//! Errores de persistencia.

use flow_core::CoreEngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupted event log at line {line}: {reason}")]
    Corrupted { line: usize, reason: String },
}

impl From<PersistenceError> for CoreEngineError {
    fn from(err: PersistenceError) -> Self {
        CoreEngineError::Store(err.to_string())
    }
}

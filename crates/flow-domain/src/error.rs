// error.rs
use thiserror::Error;

/// Errores del dominio del pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Error de validación: {0}")]
    ValidationError(String),

    #[error("Faltan campos de configuración: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("URI inválida: {0}")]
    InvalidUri(String),

    #[error("Error de serialización: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::SerializationError(e.to_string())
    }
}

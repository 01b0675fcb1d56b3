//! Tipado fuerte opcional para `Artifact` manteniendo el núcleo agnóstico.
//! Los reportes concretos (sensor, job, archivado) viven en los adapters y
//! sólo implementan `ArtifactSpec`.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{Artifact, ArtifactKind};

/// Errores posibles al (de)codificar un artifact tipado.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact kind mismatch: expected {expected:?}, found {found:?}")]
    KindMismatch { expected: ArtifactKind, found: ArtifactKind },
    #[error("schema version mismatch: expected {expected}, found {found:?}")]
    VersionMismatch { expected: u32, found: Option<u32> },
    #[error("artifact serde: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("artifact payload must be a JSON object")]
    NotAnObject,
}

/// Especificación de un artifact tipado.
pub trait ArtifactSpec: Sized + Serialize + DeserializeOwned {
    /// Kind asociado (permite distinguir en runtime).
    const KIND: ArtifactKind;
    /// Versión de esquema (incrementar en cambios incompatibles).
    const SCHEMA_VERSION: u32 = 1;

    /// Serializa a `Artifact` sin hash, insertando `schema_version`.
    fn to_artifact(&self) -> Result<Artifact, ArtifactError> {
        let mut value = serde_json::to_value(self)?;
        match &mut value {
            Value::Object(map) => {
                map.insert("schema_version".to_string(), Value::from(Self::SCHEMA_VERSION));
            }
            _ => return Err(ArtifactError::NotAnObject),
        }
        Ok(Artifact::new_unhashed(Self::KIND, value, None))
    }

    /// Decodifica verificando kind y versión.
    fn from_artifact(a: &Artifact) -> Result<Self, ArtifactError> {
        if a.kind != Self::KIND {
            return Err(ArtifactError::KindMismatch { expected: Self::KIND,
                                                     found: a.kind.clone() });
        }
        let found = a.payload.get("schema_version").and_then(Value::as_u64).map(|v| v as u32);
        if found != Some(Self::SCHEMA_VERSION) {
            return Err(ArtifactError::VersionMismatch { expected: Self::SCHEMA_VERSION,
                                                        found });
        }
        Ok(serde_json::from_value(a.payload.clone())?)
    }
}

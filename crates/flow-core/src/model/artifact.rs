//! Artifact neutral del flujo.
//!
//! Un `Artifact` es el reporte que deja cada step al terminar (objetos
//! encontrados, job enviado, archivos movidos). Ningún step consume el output
//! del anterior como dato; el encadenamiento es sólo por éxito.
//! - `payload` es JSON genérico; el motor no interpreta su semántica.
//! - `hash` lo calcula el engine sobre el JSON canonicalizado.
//! - `metadata` no entra al hash.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tipos neutrales de artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// JSON genérico sin semántica.
    GenericJson,
    /// Listado de objetos detectados por un sensor.
    ObjectListing,
    /// Recibo de un job remoto (id + estado final).
    JobReceipt,
    /// Resultado de un comando (archivado, movimientos).
    CommandReport,
}

/// Artifact neutral producido por Steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub hash: String,            // asignado por engine
    pub payload: Value,
    pub metadata: Option<Value>, // no entra al hash
}

impl Artifact {
    /// Artifact sin hash; el engine lo completa al almacenarlo.
    pub fn new_unhashed(kind: ArtifactKind, payload: Value, metadata: Option<Value>) -> Self {
        Self { kind,
               hash: String::new(),
               payload,
               metadata }
    }
}

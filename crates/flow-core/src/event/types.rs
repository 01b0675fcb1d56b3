//! Tipos de evento del flujo y estructura `FlowEvent`.
//!
//! Rol en el flujo:
//! - Cada ejecución del `FlowEngine` emite eventos a un `EventStore`
//!   append-only.
//! - Estos eventos permiten reconstruir el estado del `FlowRepository` (replay)
//!   sin depender de estructuras mutables.
//! - El enum `FlowEventKind` define el contrato observable y estable del motor.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreEngineError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FlowEventKind {
    /// Emisión inicial de un flujo: fija nombre, `definition_hash` y cantidad
    /// de steps. Invariante: Debe ser el primer evento de un `flow_id`.
    FlowInitialized {
        flow_name: String,
        definition_hash: String,
        step_count: usize,
    },
    /// Un step comenzó su ejecución. No implica éxito.
    StepStarted { step_index: usize, step_id: String },
    /// Un step terminó correctamente, con sus outputs (hashes) y fingerprint.
    StepFinished {
        step_index: usize,
        step_id: String,
        outputs: Vec<String>,
        fingerprint: String,
    },
    /// Un step terminó con error terminal. El flujo no continúa
    /// (stop-on-failure).
    StepFailed {
        step_index: usize,
        step_id: String,
        error: CoreEngineError,
        fingerprint: String,
    },
    /// Señal ligera de un step (no altera estado principal).
    StepSignal {
        step_index: usize,
        step_id: String,
        signal: String,
        data: serde_json::Value,
    },
    /// Cierre exitoso con fingerprint agregado (fingerprints de steps en orden).
    FlowCompleted { flow_fingerprint: String },
    /// Cierre fallido: apunta al step que detuvo la cadena.
    FlowFailed { step_index: usize, step_id: String },
}

impl FlowEventKind {
    /// Letra compacta usada en logs y tests.
    pub fn variant_code(&self) -> &'static str {
        match self {
            FlowEventKind::FlowInitialized { .. } => "I",
            FlowEventKind::StepStarted { .. } => "S",
            FlowEventKind::StepFinished { .. } => "F",
            FlowEventKind::StepFailed { .. } => "X",
            FlowEventKind::StepSignal { .. } => "G",
            FlowEventKind::FlowCompleted { .. } => "C",
            FlowEventKind::FlowFailed { .. } => "E",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowEvent {
    pub seq: u64, // asignado por el EventStore (orden append)
    pub flow_id: Uuid,
    pub kind: FlowEventKind,
    pub ts: DateTime<Utc>, // metadato (no entra en fingerprint)
}

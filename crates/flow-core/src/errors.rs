//! Errores del core.
//!
//! `CoreEngineError` viaja dentro de los eventos `StepFailed`, por eso es
//! `Clone + Serialize`. Las variantes de fallo de step siguen la taxonomía del
//! pipeline: timeout del sensor, fallo de job remoto, fallo de comando y
//! configuración de ejecución incompleta.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreEngineError {
    #[error("flow already completed")] FlowCompleted,
    #[error("flow has failed previously (stop-on-failure invariant)")] FlowHasFailed,
    #[error("invalid step index")] InvalidStepIndex,
    #[error("flow definition has no steps")] EmptyDefinition,
    #[error("duplicate step id: {0}")] DuplicateStepId(String),
    #[error("missing run configuration: {0}")] MissingConfiguration(String),
    #[error("sensor timed out after {waited_secs}s (timeout {timeout_secs}s)")]
    SensorTimeout { waited_secs: u64, timeout_secs: u64 },
    #[error("object store: {0}")] Storage(String),
    #[error("remote job failed: {0}")] RemoteJob(String),
    #[error("command failed: {0}")] Command(String),
    #[error("event store: {0}")] Store(String),
    #[error("internal: {0}")] Internal(String),
}

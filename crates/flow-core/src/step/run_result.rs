use serde_json::Value;

use crate::{errors::CoreEngineError, model::Artifact};

/// Resultado abstracto de ejecutar un step.
#[derive(Debug)]
pub enum StepRunResult {
    Success { outputs: Vec<Artifact> },
    SuccessWithSignals { outputs: Vec<Artifact>, signals: Vec<StepSignal> },
    Failure { error: CoreEngineError },
}

/// Hito ligero emitido por un step (p.ej. cada poke del sensor). No altera el
/// estado del flujo, sólo queda registrado como evento.
#[derive(Debug, Clone)]
pub struct StepSignal {
    pub signal: String,
    pub data: Value,
}

impl StepRunResult {
    pub fn failure(error: CoreEngineError) -> Self {
        Self::Failure { error }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }
}

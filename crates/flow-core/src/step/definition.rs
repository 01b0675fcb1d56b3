use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::run_result::StepRunResult;
use crate::model::ExecutionContext;

/// Tipo general del step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    /// Espera activa sobre una condición externa (poke hasta timeout).
    Sensor,
    /// Envía un job a un servicio remoto y espera su estado final.
    RemoteJob,
    /// Ejecuta un comando externo.
    ShellCommand,
}

/// Trait que define un Step del pipeline.
///
/// Un step no ve el output de otros steps; el motor sólo avanza al siguiente
/// cuando éste devuelve `Success`.
pub trait StepDefinition {
    /// Identificador estable y único dentro del Flow.
    fn id(&self) -> &str;

    /// Nombre opcional amigable.
    fn name(&self) -> &str {
        self.id()
    }

    /// Tipo general del step.
    fn kind(&self) -> StepKind;

    /// Parámetros base (bucket, query, comando...). Los inyectores del engine
    /// se fusionan encima antes de `run`.
    fn base_params(&self) -> Value;

    /// Ejecuta el step con los params efectivos.
    fn run(&self, ctx: &ExecutionContext) -> StepRunResult;

    /// Hash estable de la definición (id + kind + params base).
    fn definition_hash(&self) -> String {
        crate::hashing::hash_value(&json!({
            "id": self.id(),
            "kind": format!("{:?}", self.kind()),
            "base_params": self.base_params(),
        }))
    }
}

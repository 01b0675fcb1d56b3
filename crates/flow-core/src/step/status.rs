use serde::{Deserialize, Serialize};

/// Estado de un Step en tiempo de ejecución.
///
/// Las transiciones válidas son:
/// - `Pending` -> `Running`
/// - `Running` -> `FinishedOk`
/// - `Running` -> `Failed`
/// - `Pending` -> `UpstreamFailed` (un step previo falló)
///
/// No se permiten reversiones o saltos arbitrarios entre estados.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// El paso está pendiente de ejecución.
    Pending,
    /// El paso está en ejecución.
    Running,
    /// El paso finalizó correctamente.
    FinishedOk,
    /// El paso falló.
    Failed,
    /// Nunca se ejecutará: un paso anterior falló.
    UpstreamFailed,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::FinishedOk | Self::Failed | Self::UpstreamFailed)
    }
}

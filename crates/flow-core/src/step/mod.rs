//! Definiciones relacionadas a Steps.
//!
//! Un Step es una unidad del pipeline que delega en un servicio externo
//! (sensor, job remoto, comando) y reporta éxito o fallo. Este módulo define:
//! - `StepDefinition`: interfaz neutral usada por el engine.
//! - `StepRunResult` y señales (`StepSignal`).
//! - `StepStatus`: estados observables tras el replay.

pub mod definition;
mod run_result;
mod status;

pub use definition::{StepDefinition, StepKind};
pub use run_result::{StepRunResult, StepSignal};
pub use status::StepStatus;

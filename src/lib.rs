//! hiveflow
//!
//! Pipeline diario `batch_hive_job`: espera el archivo de entrada en GCS,
//! crea la base y las tablas Hive, carga la tabla particionada y archiva el
//! archivo procesado.
//!
//! - `config`: `Settings` desde `HIVEFLOW_*` / `.env`.
//! - `workflow`: definición del DAG, runner y registro de runs.
//! - `telemetry`: inicialización de `tracing`.

pub mod config;
pub mod errors;
pub mod telemetry;
pub mod workflow;

pub use config::Settings;
pub use errors::AppError;

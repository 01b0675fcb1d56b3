//! flow-adapters: capa de adaptación entre el core y los servicios externos.
//!
//! Este crate provee:
//! - Los contratos de servicio (`ObjectStore`, `HiveJobSubmitter`, `Clock`).
//! - Adapters sobre `gsutil`/`gcloud` vía `CommandRunner`.
//! - Los steps concretos del pipeline (sensor, job de Hive, archivado) y sus
//!   reportes tipados.
//! - `RunConfigInjector`, que entrega cluster/región/proyecto a los jobs.
//! - Stores de variables (entorno, archivo JSON, memoria) y fakes en memoria.

pub mod artifacts;
pub mod command;
pub mod error;
pub mod fakes;
pub mod gcloud;
pub mod injectors;
pub mod services;
pub mod steps;
pub mod variables;

pub use error::ServiceError;
pub use injectors::RunConfigInjector;
pub use services::{Clock, HiveJobSubmitter, ManualClock, ObjectStore, SystemClock};
pub use steps::{ArchiveStep, HiveJobStep, ObjectPrefixSensorStep};
pub use variables::{EnvVariableStore, InMemoryVariableStore, JsonFileVariableStore, VariableStore};

//! Steps concretos del pipeline: sensor de objetos, job de Hive y archivado.

pub mod archive;
pub mod hive_job;
pub mod sensor;

pub use archive::ArchiveStep;
pub use hive_job::HiveJobStep;
pub use sensor::ObjectPrefixSensorStep;

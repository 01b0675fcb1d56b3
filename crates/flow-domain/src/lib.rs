// flow-domain library entry point
pub mod error;
pub mod run_config;
pub mod schedule;
pub mod storage;
pub mod warehouse;
pub use error::DomainError;
pub use run_config::RunConfiguration;
pub use schedule::Schedule;
pub use storage::{glob_match, GcsUri};
pub use warehouse::{split_statements, Column, HiveType, LogisticsWarehouse, PartitionedTable, StagingTable};

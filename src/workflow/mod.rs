pub mod dag;
pub mod history;
pub mod runner;

pub use dag::{build_definition, build_steps, plan, DagPlan, DagSpec, Services, DAG_ID};
pub use history::RunLedger;
pub use runner::{cli_services, dry_run_services, resolve_run_config, PipelineRunner, RunReport, RunStatus, StepReport};

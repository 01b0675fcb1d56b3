//! Definición del DAG `batch_hive_job`.
//!
//! Seis steps en cadena estricta:
//! sense_logistics_file → create_hive_database → create_hive_table →
//! create_partitioned_table → set_hive_properties_and_load_partitioned →
//! archive_processed_file.
//!
//! Los steps son datos (id, kind, params); los servicios que usan llegan en
//! `Services` y la configuración del cluster se inyecta al ejecutar.
use std::sync::Arc;

use chrono::NaiveDate;
use flow_adapters::{ArchiveStep, Clock, HiveJobStep, HiveJobSubmitter, ObjectPrefixSensorStep, ObjectStore};
use flow_core::{build_flow_definition, FlowDefinition, StepDefinition, StepKind};
use flow_domain::{LogisticsWarehouse, Schedule};
use serde::Serialize;
use serde_json::Value;

use crate::config::Settings;
use crate::errors::AppError;

pub const DAG_ID: &str = "batch_hive_job";

pub mod step_ids {
    pub const SENSE_FILE: &str = "sense_logistics_file";
    pub const CREATE_DATABASE: &str = "create_hive_database";
    pub const CREATE_TABLE: &str = "create_hive_table";
    pub const CREATE_PARTITIONED_TABLE: &str = "create_partitioned_table";
    pub const LOAD_PARTITIONED: &str = "set_hive_properties_and_load_partitioned";
    pub const ARCHIVE_FILE: &str = "archive_processed_file";

    /// Orden de ejecución.
    pub const ALL: [&str; 6] = [SENSE_FILE,
                                CREATE_DATABASE,
                                CREATE_TABLE,
                                CREATE_PARTITIONED_TABLE,
                                LOAD_PARTITIONED,
                                ARCHIVE_FILE];
}

/// Argumentos por defecto de las tareas. `retries = 0`: un fallo termina el run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultArgs {
    pub owner: String,
    pub depends_on_past: bool,
    pub email_on_failure: bool,
    pub email_on_retry: bool,
    pub retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for DefaultArgs {
    fn default() -> Self {
        Self { owner: "airflow".to_string(),
               depends_on_past: false,
               email_on_failure: false,
               email_on_retry: false,
               retries: 0,
               retry_delay_secs: 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DagSpec {
    pub dag_id: String,
    pub description: String,
    pub schedule: Schedule,
    pub tags: Vec<String>,
    pub default_args: DefaultArgs,
}

impl DagSpec {
    pub fn batch_hive_job() -> Self {
        let start = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap_or_default();
        Self { dag_id: DAG_ID.to_string(),
               description: "A DAG to run Hive Job on Dataproc".to_string(),
               schedule: Schedule::daily(start),
               tags: vec!["dev_hive".to_string()],
               default_args: DefaultArgs::default() }
    }
}

/// Servicios externos que usan los steps.
#[derive(Clone)]
pub struct Services {
    pub object_store: Arc<dyn ObjectStore>,
    pub jobs: Arc<dyn HiveJobSubmitter>,
    pub clock: Arc<dyn Clock>,
}

/// Un step como dato plano.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepPlan {
    pub id: String,
    pub kind: StepKind,
    pub params: Value,
    pub upstream: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DagPlan {
    pub dag: DagSpec,
    pub definition_hash: String,
    pub steps: Vec<StepPlan>,
}

/// Construye los seis steps en orden.
pub fn build_steps(settings: &Settings, services: &Services) -> Result<Vec<Box<dyn StepDefinition>>, AppError> {
    let warehouse = LogisticsWarehouse::logistics(settings.input_dir()?);
    let jobs = &services.jobs;

    let sensor = ObjectPrefixSensorStep::new(step_ids::SENSE_FILE,
                                             settings.bucket.clone(),
                                             settings.input_prefix.clone(),
                                             services.object_store.clone(),
                                             services.clock.clone()).with_poke_interval(settings.poke_interval)
                                                                    .with_timeout(settings.sensor_timeout);

    let steps: Vec<Box<dyn StepDefinition>> =
        vec![Box::new(sensor),
             Box::new(HiveJobStep::new(step_ids::CREATE_DATABASE, warehouse.create_database_sql(), jobs.clone())),
             Box::new(HiveJobStep::new(step_ids::CREATE_TABLE, warehouse.create_staging_table_sql(), jobs.clone())),
             Box::new(HiveJobStep::new(step_ids::CREATE_PARTITIONED_TABLE,
                                       warehouse.create_partitioned_table_sql(),
                                       jobs.clone())),
             Box::new(HiveJobStep::new(step_ids::LOAD_PARTITIONED, warehouse.load_partitioned_sql(), jobs.clone())),
             Box::new(ArchiveStep::new(step_ids::ARCHIVE_FILE,
                                       settings.input_pattern()?,
                                       settings.archive_dir()?,
                                       services.object_store.clone()))];
    Ok(steps)
}

pub fn build_definition(settings: &Settings, services: &Services) -> Result<FlowDefinition, AppError> {
    Ok(build_flow_definition(DAG_ID, build_steps(settings, services)?)?)
}

/// Vista de datos de una definición: steps, params base y dependencia.
pub fn plan(dag: &DagSpec, definition: &FlowDefinition) -> DagPlan {
    let mut upstream: Option<String> = None;
    let mut steps = Vec::with_capacity(definition.len());
    for s in &definition.steps {
        steps.push(StepPlan { id: s.id().to_string(),
                              kind: s.kind(),
                              params: s.base_params(),
                              upstream: upstream.take() });
        upstream = Some(s.id().to_string());
    }
    DagPlan { dag: dag.clone(),
              definition_hash: definition.definition_hash.clone(),
              steps }
}

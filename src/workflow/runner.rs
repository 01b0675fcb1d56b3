//! Ejecución de un run del DAG para una fecha lógica.
//!
//! `PipelineRunner` envuelve un `FlowEngine` con la definición del DAG y el
//! inyector de configuración. Un step fallido no es un error del runner: el
//! run termina `Failed` y el `RunReport` indica dónde y por qué.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use flow_adapters::command::ProcessCommandRunner;
use flow_adapters::fakes::{FakeHiveWarehouse, InMemoryObjectStore};
use flow_adapters::gcloud::{DataprocHiveSubmitter, GsutilObjectStore};
use flow_adapters::{ManualClock, RunConfigInjector, SystemClock, VariableStore};
use flow_core::{CoreEngineError, EventStore, FlowDefinition, FlowEngine, InMemoryFlowRepository, StepStatus};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::errors::AppError;
use crate::workflow::dag::{DagSpec, Services};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step_id: String,
    pub status: StepStatus,
    pub error: Option<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub flow_id: Uuid,
    pub dag_id: String,
    pub logical_date: NaiveDate,
    pub status: RunStatus,
    pub steps: Vec<StepReport>,
    pub failed_step: Option<String>,
    pub error: Option<String>,
    pub flow_fingerprint: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// 0 si el run terminó bien, 1 si falló en algún step.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Success => 0,
            RunStatus::Failed => 1,
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}

pub struct PipelineRunner<E: EventStore> {
    engine: FlowEngine<E, InMemoryFlowRepository>,
    definition: FlowDefinition,
    dag: DagSpec,
}

impl<E: EventStore> PipelineRunner<E> {
    pub fn new(event_store: E, definition: FlowDefinition, injector: RunConfigInjector) -> Self {
        let mut engine = FlowEngine::new_with_stores(event_store, InMemoryFlowRepository::new());
        engine.add_injector(Box::new(injector));
        Self { engine,
               definition,
               dag: DagSpec::batch_hive_job() }
    }

    pub fn definition(&self) -> &FlowDefinition {
        &self.definition
    }

    pub fn event_store(&self) -> &E {
        self.engine.event_store()
    }

    /// Ejecuta un run completo para `logical_date`.
    ///
    /// # Errores
    /// Sólo fallas del event store; los fallos de step quedan en el reporte.
    pub fn run(&mut self, logical_date: NaiveDate) -> Result<RunReport, AppError> {
        let flow_id = Uuid::new_v4();
        let span = info_span!("dag_run", dag_id = %self.dag.dag_id, %logical_date, %flow_id);
        let _guard = span.enter();
        let started_at = Utc::now();
        info!("run started");

        let error = match self.engine.run_flow_to_completion(flow_id, &self.definition) {
            Ok(_) => None,
            Err(e @ CoreEngineError::Store(_)) => return Err(e.into()),
            Err(e) => Some(e),
        };

        let instance = self.engine.instance(flow_id, &self.definition)?;
        let steps: Vec<StepReport> = instance.steps
                                             .iter()
                                             .map(|s| StepReport { step_id: s.step_id.clone(),
                                                                   status: s.status,
                                                                   error: s.error.as_ref().map(|e| e.to_string()),
                                                                   outputs: s.outputs.clone() })
                                             .collect();
        let flow_fingerprint = self.engine.flow_fingerprint(flow_id)?;
        let failed_step = instance.failed_at
                                  .and_then(|i| instance.steps.get(i))
                                  .map(|s| s.step_id.clone());
        let status = if error.is_none() && instance.completed {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };

        match (&status, &failed_step) {
            (RunStatus::Success, _) => info!("run succeeded"),
            (RunStatus::Failed, step) => warn!(failed_step = ?step, "run failed"),
        }

        Ok(RunReport { flow_id,
                       dag_id: self.dag.dag_id.clone(),
                       logical_date,
                       status,
                       steps,
                       failed_step,
                       error: error.map(|e| e.to_string()),
                       flow_fingerprint,
                       started_at,
                       finished_at: Utc::now() })
    }
}

/// Lee `cluster_details` una vez y arma el inyector. Una variable ausente o
/// incompleta no aborta: los jobs remotos fallarán sin enviarse.
pub fn resolve_run_config(store: &dyn VariableStore, key: &str) -> Result<RunConfigInjector, AppError> {
    let value = store.get_json(key)?;
    if value.is_none() {
        warn!(variable = key, "run configuration variable not found");
    }
    let injector = RunConfigInjector::from_variable(value.as_ref());
    if value.is_some() && !injector.is_complete() {
        warn!(variable = key, "run configuration variable is incomplete");
    }
    Ok(injector)
}

/// Servicios reales: `gsutil`, `gcloud` y el reloj del sistema.
pub fn cli_services(settings: &Settings) -> Services {
    let runner = Arc::new(ProcessCommandRunner);
    Services { object_store: Arc::new(GsutilObjectStore::new(runner.clone()).with_program(settings.gsutil.clone())),
               jobs: Arc::new(DataprocHiveSubmitter::new(runner).with_program(settings.gcloud.clone())),
               clock: Arc::new(SystemClock::default()) }
}

/// Servicios en memoria para `--dry-run`, con un archivo de entrada de
/// ejemplo para la fecha lógica.
pub struct DryRunServices {
    pub services: Services,
    pub storage: Arc<InMemoryObjectStore>,
    pub warehouse: Arc<FakeHiveWarehouse>,
}

pub fn dry_run_services(settings: &Settings, logical_date: NaiveDate) -> DryRunServices {
    let storage = Arc::new(InMemoryObjectStore::new());
    let day = logical_date.format("%Y-%m-%d");
    let sample = format!("delivery_id,date,origin_state,destination_state,delivery_status,delivery_time\n\
                          1,{day},CA,NY,Delivered,2h\n\
                          2,{day},TX,FL,In Transit,5h\n\
                          3,{day},WA,OR,Delivered,1h\n");
    storage.put_object(&settings.bucket,
                       &format!("{}{}.csv", settings.input_prefix, logical_date.format("%Y%m%d")),
                       &sample);
    let warehouse = Arc::new(FakeHiveWarehouse::new(storage.clone()));
    DryRunServices { services: Services { object_store: storage.clone(),
                                          jobs: warehouse.clone(),
                                          clock: Arc::new(ManualClock::new()) },
                     storage,
                     warehouse }
}

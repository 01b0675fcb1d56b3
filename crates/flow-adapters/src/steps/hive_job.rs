//! HiveJobStep
//!
//! Envía un script HiveQL fijo al cluster indicado por la configuración de
//! la ejecución y espera su estado final. El destino (cluster, región,
//! proyecto) no forma parte de la definición: llega por los params que
//! inyecta `RunConfigInjector`. Si falta algún campo el step falla sin
//! enviar nada.

use std::sync::Arc;

use flow_core::{ArtifactSpec, CoreEngineError, ExecutionContext, StepDefinition, StepKind, StepRunResult};
use flow_domain::{split_statements, RunConfiguration};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::artifacts::JobReceiptArtifact;
use crate::services::{HiveJobRequest, HiveJobSubmitter, JobState};

pub struct HiveJobStep {
    id: String,
    query: String,
    submitter: Arc<dyn HiveJobSubmitter>,
}

impl HiveJobStep {
    pub fn new(id: impl Into<String>, query: impl Into<String>, submitter: Arc<dyn HiveJobSubmitter>) -> Self {
        Self { id: id.into(),
               query: query.into(),
               submitter }
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl std::fmt::Debug for HiveJobStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HiveJobStep").field("id", &self.id).field("query", &self.query).finish()
    }
}

impl StepDefinition for HiveJobStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StepKind {
        StepKind::RemoteJob
    }

    /// Los campos de destino vacíos son placeholders a completar por
    /// inyección.
    fn base_params(&self) -> Value {
        json!({
            "query": self.query,
            "cluster_name": "",
            "region": "",
            "project_id": "",
        })
    }

    fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        let target = match RunConfiguration::from_params(&ctx.params) {
            Ok(t) => t,
            Err(e) => {
                warn!(flow_id = %ctx.flow_id, step = %self.id, error = %e, "run configuration incomplete; job not submitted");
                return StepRunResult::failure(CoreEngineError::MissingConfiguration(e.to_string()));
            }
        };

        let request = HiveJobRequest { step_id: self.id.clone(),
                                       query: self.query.clone(),
                                       target };
        let outcome = match self.submitter.submit_and_wait(&request) {
            Ok(o) => o,
            Err(e) => return StepRunResult::failure(CoreEngineError::RemoteJob(e.to_string())),
        };
        if outcome.state != JobState::Done {
            let details = outcome.details.as_deref().unwrap_or("no details");
            return StepRunResult::failure(CoreEngineError::RemoteJob(format!("job {} finished in state {:?}: {}",
                                                                             outcome.job_id, outcome.state, details)));
        }
        info!(step = %self.id, job_id = %outcome.job_id, "hive job done");

        let receipt = JobReceiptArtifact { job_id: outcome.job_id,
                                           state: outcome.state,
                                           cluster_name: request.target.cluster_name().to_string(),
                                           region: request.target.region().to_string(),
                                           project_id: request.target.project_id().to_string(),
                                           statements: split_statements(&self.query).len() };
        match receipt.to_artifact() {
            Ok(art) => StepRunResult::Success { outputs: vec![art] },
            Err(e) => StepRunResult::failure(CoreEngineError::Internal(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::RecordingJobSubmitter;
    use uuid::Uuid;

    fn ctx(params: Value) -> ExecutionContext {
        ExecutionContext { flow_id: Uuid::nil(),
                           step_index: 1,
                           params }
    }

    #[test]
    fn missing_project_fails_without_submitting() {
        let submitter = Arc::new(RecordingJobSubmitter::new());
        let step = HiveJobStep::new("create_hive_database", "CREATE DATABASE IF NOT EXISTS x;", submitter.clone());
        let mut params = step.base_params();
        params["cluster_name"] = json!("c");
        params["region"] = json!("r");
        match step.run(&ctx(params)) {
            StepRunResult::Failure { error: CoreEngineError::MissingConfiguration(msg) } => {
                assert!(msg.contains("PROJECT_ID"))
            }
            other => panic!("expected missing configuration, got {other:?}"),
        }
        assert!(submitter.requests().is_empty());
    }

    #[test]
    fn submits_with_injected_target() {
        let submitter = Arc::new(RecordingJobSubmitter::new());
        let step = HiveJobStep::new("create_hive_database", "CREATE DATABASE IF NOT EXISTS x;", submitter.clone());
        let params = json!({"query": step.query(), "cluster_name": "c", "region": "r", "project_id": "p"});
        let res = step.run(&ctx(params));
        assert!(res.is_success());
        let reqs = submitter.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].target.project_id(), "p");
    }

    #[test]
    fn job_error_state_fails_step() {
        let submitter = Arc::new(RecordingJobSubmitter::new());
        submitter.fail_step("create_hive_database");
        let step = HiveJobStep::new("create_hive_database", "SELECT 1;", submitter);
        let params = json!({"cluster_name": "c", "region": "r", "project_id": "p"});
        assert!(matches!(step.run(&ctx(params)),
                         StepRunResult::Failure { error: CoreEngineError::RemoteJob(_) }));
    }
}

//! ArchiveStep: `gsutil -m mv <input pattern> <archive dir>`.
//!
//! Mueve los archivos de entrada ya cargados al directorio de archivo. Si no
//! hay objetos que coincidan el comando falla y el run queda fallido.

use std::sync::Arc;

use flow_core::{ArtifactSpec, CoreEngineError, ExecutionContext, StepDefinition, StepKind, StepRunResult};
use flow_domain::GcsUri;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::artifacts::CommandReportArtifact;
use crate::command::render_command;
use crate::gcloud::GsutilObjectStore;
use crate::services::ObjectStore;

pub struct ArchiveStep {
    id: String,
    source: GcsUri,
    destination: GcsUri,
    store: Arc<dyn ObjectStore>,
}

impl ArchiveStep {
    pub fn new(id: impl Into<String>, source: GcsUri, destination: GcsUri, store: Arc<dyn ObjectStore>) -> Self {
        Self { id: id.into(),
               source,
               destination,
               store }
    }

    /// Comando equivalente, tal como se ejecutaría en una shell.
    pub fn command(&self) -> String {
        render_command("gsutil", &GsutilObjectStore::move_args(&self.source, &self.destination))
    }
}

impl std::fmt::Debug for ArchiveStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStep").field("id", &self.id).field("command", &self.command()).finish()
    }
}

impl StepDefinition for ArchiveStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StepKind {
        StepKind::ShellCommand
    }

    fn base_params(&self) -> Value {
        json!({
            "command": self.command(),
            "source": self.source.to_string(),
            "destination": self.destination.to_string(),
        })
    }

    fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        let moved = match self.store.move_matching(&self.source, &self.destination) {
            Ok(m) => m,
            Err(e) => {
                warn!(flow_id = %ctx.flow_id, step = %self.id, error = %e, "archive command failed");
                return StepRunResult::failure(CoreEngineError::Command(e.to_string()));
            }
        };
        info!(step = %self.id, moved = moved.len(), destination = %self.destination, "input files archived");
        let report = CommandReportArtifact { command: self.command(),
                                             moved };
        match report.to_artifact() {
            Ok(art) => StepRunResult::Success { outputs: vec![art] },
            Err(e) => StepRunResult::failure(CoreEngineError::Internal(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::InMemoryObjectStore;
    use uuid::Uuid;

    fn step(store: Arc<InMemoryObjectStore>) -> ArchiveStep {
        ArchiveStep::new("archive_processed_file",
                         "gs://logistic-bucket/input-delta-data/logistics_*.csv".parse().unwrap(),
                         "gs://logistic-bucket/archive-delta-file/".parse().unwrap(),
                         store)
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext { flow_id: Uuid::nil(),
                           step_index: 5,
                           params: Value::Null }
    }

    #[test]
    fn command_matches_gsutil_invocation() {
        let s = step(Arc::new(InMemoryObjectStore::new()));
        assert_eq!(s.command(),
                   "gsutil -m mv gs://logistic-bucket/input-delta-data/logistics_*.csv \
                    gs://logistic-bucket/archive-delta-file/");
    }

    #[test]
    fn moves_matching_csv_files_only() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put_object("logistic-bucket", "input-delta-data/logistics_1.csv", "h\n");
        store.put_object("logistic-bucket", "input-delta-data/logistics_1.json", "{}");
        let res = step(store.clone()).run(&ctx());
        assert!(res.is_success());
        let names = store.object_names("logistic-bucket");
        assert!(names.contains(&"archive-delta-file/logistics_1.csv".to_string()));
        assert!(names.contains(&"input-delta-data/logistics_1.json".to_string()));
        assert!(!names.contains(&"input-delta-data/logistics_1.csv".to_string()));
    }

    #[test]
    fn nothing_to_move_fails() {
        let res = step(Arc::new(InMemoryObjectStore::new())).run(&ctx());
        assert!(matches!(res, StepRunResult::Failure { error: CoreEngineError::Command(_) }));
    }
}

//! Adapters sobre las CLIs `gsutil` y `gcloud`.
//!
//! Ambos reciben un `CommandRunner` para poder probar el armado de argumentos
//! y el parseo de salidas sin binarios instalados.

use std::sync::Arc;

use flow_domain::GcsUri;
use serde_json::Value;
use tracing::{info, warn};

use crate::command::{render_command, CommandRunner};
use crate::services::{HiveJobRequest, HiveJobSubmitter, JobOutcome, JobState, MovedObject, ObjectInfo, ObjectStore};
use crate::ServiceError;

/// Texto que gsutil imprime cuando un `ls` no encuentra nada (exit 1).
const NO_MATCH_MARKERS: [&str; 2] = ["matched no objects", "No URLs matched"];

pub struct GsutilObjectStore {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl GsutilObjectStore {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner,
               program: "gsutil".to_string() }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Argumentos de `gsutil -m mv <pattern> <destination>`.
    pub fn move_args(pattern: &GcsUri, destination: &GcsUri) -> Vec<String> {
        vec!["-m".into(), "mv".into(), pattern.to_string(), destination.to_string()]
    }
}

impl std::fmt::Debug for GsutilObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GsutilObjectStore").field("program", &self.program).finish()
    }
}

impl ObjectStore for GsutilObjectStore {
    fn list_with_prefix(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>, ServiceError> {
        // `**` para que el prefijo cruce "directorios" como en la API de GCS.
        let args = vec!["ls".to_string(), format!("gs://{bucket}/{prefix}**")];
        let out = self.runner.run(&self.program, &args)?;
        if !out.success() {
            if NO_MATCH_MARKERS.iter().any(|m| out.stderr.contains(m)) {
                return Ok(Vec::new());
            }
            return Err(ServiceError::NonZeroExit { command: render_command(&self.program, &args),
                                                   code: out.status_code,
                                                   stderr: out.stderr.trim().to_string() });
        }
        let mut objects = Vec::new();
        for line in out.stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let uri: GcsUri = line.parse()
                                  .map_err(|_| ServiceError::MalformedOutput(format!("gsutil ls: '{line}'")))?;
            if uri.object().ends_with('/') {
                continue;
            }
            objects.push(ObjectInfo { bucket: uri.bucket().to_string(),
                                      name: uri.object().to_string() });
        }
        Ok(objects)
    }

    fn move_matching(&self, pattern: &GcsUri, destination: &GcsUri) -> Result<Vec<MovedObject>, ServiceError> {
        // Listado previo para poder reportar qué se movió.
        let dir = pattern.parent_dir();
        let matched: Vec<ObjectInfo> = self.list_with_prefix(dir.bucket(), dir.object())?
                                           .into_iter()
                                           .filter(|o| pattern.matches(&o.bucket, &o.name))
                                           .collect();
        let args = Self::move_args(pattern, destination);
        let command = render_command(&self.program, &args);
        info!(%command, matched = matched.len(), "archiving objects");
        self.runner.run(&self.program, &args)?.into_result(&command)?;

        Ok(matched.into_iter()
                  .map(|o| {
                      let base = o.name.rsplit('/').next().unwrap_or(&o.name).to_string();
                      MovedObject { from: o.uri(),
                                    to: destination.join(&base).to_string() }
                  })
                  .collect())
    }
}

/// `gcloud dataproc jobs submit hive`: gcloud espera el estado final del job
/// y termina con código distinto de cero si el job falla.
pub struct DataprocHiveSubmitter {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl DataprocHiveSubmitter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner,
               program: "gcloud".to_string() }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn submit_args(request: &HiveJobRequest) -> Vec<String> {
        let t = &request.target;
        vec!["dataproc".into(),
             "jobs".into(),
             "submit".into(),
             "hive".into(),
             format!("--cluster={}", t.cluster_name()),
             format!("--region={}", t.region()),
             format!("--project={}", t.project_id()),
             format!("--labels=task={}", request.step_id.replace('_', "-")),
             "--format=json".into(),
             format!("--execute={}", request.query)]
    }
}

impl std::fmt::Debug for DataprocHiveSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataprocHiveSubmitter").field("program", &self.program).finish()
    }
}

fn parse_state(raw: &str) -> JobState {
    match raw {
        "DONE" => JobState::Done,
        "CANCELLED" | "CANCEL_PENDING" => JobState::Cancelled,
        _ => JobState::Error,
    }
}

impl HiveJobSubmitter for DataprocHiveSubmitter {
    fn submit_and_wait(&self, request: &HiveJobRequest) -> Result<JobOutcome, ServiceError> {
        let args = Self::submit_args(request);
        info!(step = %request.step_id,
              cluster = request.target.cluster_name(),
              region = request.target.region(),
              project = request.target.project_id(),
              "submitting hive job");
        let out = self.runner
                      .run(&self.program, &args)?
                      .into_result(&format!("{} dataproc jobs submit hive", self.program))?;

        let job: Value = match serde_json::from_str(out.stdout.trim()) {
            Ok(v) => v,
            Err(e) => {
                warn!(step = %request.step_id, error = %e, "could not parse gcloud job output; trusting exit code");
                let first_line = out.stdout.lines().map(str::trim).find(|l| !l.is_empty());
                return Ok(JobOutcome { job_id: "unknown".into(),
                                       state: JobState::Done,
                                       details: first_line.map(str::to_string) });
            }
        };
        let job_id = job.pointer("/reference/jobId").and_then(Value::as_str).unwrap_or("unknown").to_string();
        let state = job.pointer("/status/state").and_then(Value::as_str).map(parse_state).unwrap_or(JobState::Done);
        let details = job.pointer("/status/details").and_then(Value::as_str).map(str::to_string);
        Ok(JobOutcome { job_id, state, details })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedCommandRunner;
    use flow_domain::RunConfiguration;

    fn request() -> HiveJobRequest {
        HiveJobRequest { step_id: "create_hive_database".into(),
                         query: "CREATE DATABASE IF NOT EXISTS logistics_db;".into(),
                         target: RunConfiguration::new("c", "us-central1", "p").unwrap() }
    }

    #[test]
    fn listing_skips_directory_placeholders() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_ok("gs://logistic-bucket/input-delta-data/\ngs://logistic-bucket/input-delta-data/logistics_1.csv\n");
        let store = GsutilObjectStore::new(runner.clone());
        let objs = store.list_with_prefix("logistic-bucket", "input-delta-data/").unwrap();
        assert_eq!(objs,
                   vec![ObjectInfo { bucket: "logistic-bucket".into(),
                                     name: "input-delta-data/logistics_1.csv".into() }]);
        assert_eq!(runner.calls()[0], "gsutil ls gs://logistic-bucket/input-delta-data/**");
    }

    #[test]
    fn empty_listing_is_not_an_error() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push(1, "", "CommandException: One or more URLs matched no objects.");
        let store = GsutilObjectStore::new(runner);
        assert!(store.list_with_prefix("b", "p").unwrap().is_empty());
    }

    #[test]
    fn listing_failure_is_reported() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push(1, "", "AccessDeniedException: 403");
        let store = GsutilObjectStore::new(runner);
        assert!(matches!(store.list_with_prefix("b", "p"), Err(ServiceError::NonZeroExit { code: 1, .. })));
    }

    #[test]
    fn submit_args_target_the_configured_cluster() {
        let args = DataprocHiveSubmitter::submit_args(&request());
        assert!(args.contains(&"--cluster=c".to_string()));
        assert!(args.contains(&"--region=us-central1".to_string()));
        assert!(args.contains(&"--project=p".to_string()));
        assert_eq!(args.last().unwrap(), "--execute=CREATE DATABASE IF NOT EXISTS logistics_db;");
    }

    #[test]
    fn submit_parses_job_reference_and_state() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_ok(r#"{"reference": {"jobId": "job-123"}, "status": {"state": "DONE"}}"#);
        let outcome = DataprocHiveSubmitter::new(runner).submit_and_wait(&request()).unwrap();
        assert_eq!(outcome.job_id, "job-123");
        assert_eq!(outcome.state, JobState::Done);
    }

    #[test]
    fn failed_job_surfaces_exit_code() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push(1, "", "ERROR: (gcloud.dataproc.jobs.submit.hive) Job [x] failed");
        let err = DataprocHiveSubmitter::new(runner).submit_and_wait(&request()).unwrap_err();
        assert!(err.to_string().contains("Job [x] failed"));
    }

    #[test]
    fn plain_text_output_is_kept_in_details() {
        let runner = Arc::new(ScriptedCommandRunner::new());
        runner.push_ok("\nJob [job-9] submitted.\nWaiting for job output...\n");
        let outcome = DataprocHiveSubmitter::new(runner).submit_and_wait(&request()).unwrap();
        assert_eq!(outcome.job_id, "unknown");
        assert_eq!(outcome.state, JobState::Done);
        assert_eq!(outcome.details.as_deref(), Some("Job [job-9] submitted."));
    }
}

use flow_domain::DomainError;
use thiserror::Error;

/// Errores de los servicios externos (CLI de gcloud/gsutil, variables,
/// object store y warehouse).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("command not found: {0}")]
    CommandNotFound(String),
    #[error("`{command}` exited with code {code}: {stderr}")]
    NonZeroExit { command: String, code: i32, stderr: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected command output: {0}")]
    MalformedOutput(String),
    #[error("no objects matched {0}")]
    NoMatches(String),
    #[error("job {job_id} finished in state {state}")]
    JobFailed { job_id: String, state: String },
    #[error("hive: {0}")]
    Hive(String),
    #[error("variable '{key}': {reason}")]
    Variable { key: String, reason: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
}

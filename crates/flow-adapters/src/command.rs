//! Ejecución de comandos externos.
//!
//! Los adapters de gsutil/gcloud no llaman a `std::process::Command`
//! directamente sino a un `CommandRunner`, que en tests se reemplaza por un
//! runner con respuestas fijas.

use std::process::Command;

use tracing::debug;

use crate::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }

    /// Convierte un código distinto de cero en `ServiceError::NonZeroExit`.
    pub fn into_result(self, command: &str) -> Result<CommandOutput, ServiceError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ServiceError::NonZeroExit { command: command.to_string(),
                                            code: self.status_code,
                                            stderr: self.stderr.trim().to_string() })
        }
    }
}

pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ServiceError>;
}

/// Runner real sobre `std::process::Command`; bloquea hasta que el proceso
/// termina.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ServiceError> {
        debug!(program, ?args, "spawning command");
        let output = Command::new(program).args(args).output().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ServiceError::CommandNotFound(program.to_string()),
            _ => ServiceError::Io(e),
        })?;
        Ok(CommandOutput { status_code: output.status.code().unwrap_or(-1),
                           stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                           stderr: String::from_utf8_lossy(&output.stderr).to_string() })
    }
}

/// Línea de comando legible (para logs y reportes).
pub fn render_command(program: &str, args: &[String]) -> String {
    let mut parts = vec![program.to_string()];
    for a in args {
        if a.is_empty() || a.contains(char::is_whitespace) {
            parts.push(format!("'{}'", a.replace('\'', "'\\''")));
        } else {
            parts.push(a.clone());
        }
    }
    parts.join(" ")
}

//! Registro de runs (`runs.jsonl`): un `RunReport` por línea.
//!
//! Los eventos del engine no llevan la fecha lógica; este registro la guarda
//! junto al resultado de cada run.
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::errors::AppError;
use crate::workflow::runner::RunReport;

pub const RUNS_FILE: &str = "runs.jsonl";

#[derive(Debug, Clone)]
pub struct RunLedger {
    path: PathBuf,
}

impl RunLedger {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(RUNS_FILE) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, report: &RunReport) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut line = serde_json::to_string(report)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Todos los runs registrados, en orden de ejecución. Sin archivo: vacío.
    pub fn load(&self) -> Result<Vec<RunReport>, AppError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut reports = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            reports.push(serde_json::from_str(&line)?);
        }
        Ok(reports)
    }

    pub fn find(&self, flow_id: Uuid) -> Result<Option<RunReport>, AppError> {
        Ok(self.load()?.into_iter().find(|r| r.flow_id == flow_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::runner::RunStatus;
    use chrono::{NaiveDate, Utc};

    fn report(status: RunStatus) -> RunReport {
        RunReport { flow_id: Uuid::new_v4(),
                    dag_id: "batch_hive_job".into(),
                    logical_date: NaiveDate::from_ymd_opt(2023, 9, 2).unwrap(),
                    status,
                    steps: vec![],
                    failed_step: None,
                    error: None,
                    flow_fingerprint: None,
                    started_at: Utc::now(),
                    finished_at: Utc::now() }
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RunLedger::in_dir(dir.path()).load().unwrap().is_empty());
    }

    #[test]
    fn append_then_load_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = RunLedger::in_dir(dir.path().join("state"));
        let (a, b) = (report(RunStatus::Success), report(RunStatus::Failed));
        ledger.append(&a).unwrap();
        ledger.append(&b).unwrap();
        let loaded = ledger.load().unwrap();
        assert_eq!(loaded, vec![a.clone(), b]);
        assert_eq!(ledger.find(a.flow_id).unwrap(), Some(a));
    }
}

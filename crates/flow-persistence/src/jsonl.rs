//! Event store durable sobre un archivo JSON-lines.
//!
//! - Append-only: una línea por `FlowEvent`, nunca se reescribe.
//! - `seq` es contiguo por `flow_id`, igual que en el backend en memoria.
//! - Al abrir se relee el archivo completo; una línea corrupta aborta la
//!   apertura con `PersistenceError::Corrupted` (no se descarta en silencio).
//! - Excepción: una última línea sin `\n` es un append cortado a la mitad. Se
//!   descarta con un `warn!` y el archivo se trunca hasta la última línea
//!   completa.
//! - El replay se delega en `InMemoryFlowRepository` para mantener paridad
//!   exacta con el backend en memoria.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use flow_core::{CoreEngineError, EventStore, FlowEvent, FlowEventKind};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EVENTS_FILE;
use crate::error::PersistenceError;

#[derive(Debug)]
pub struct JsonlEventStore {
    path: PathBuf,
    file: File,
    events: HashMap<Uuid, Vec<FlowEvent>>,
    order: Vec<Uuid>,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io { path: path.display().to_string(),
                                         source }
}

impl JsonlEventStore {
    /// Abre (o crea) el log en `path`, cargando los eventos existentes.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let mut events: HashMap<Uuid, Vec<FlowEvent>> = HashMap::new();
        let mut order = Vec::new();
        if path.exists() {
            let raw = fs::read(&path).map_err(io_err(&path))?;
            let complete = raw.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
            for (i, line) in (&raw[..complete]).lines().enumerate() {
                let line = line.map_err(io_err(&path))?;
                if line.trim().is_empty() {
                    continue;
                }
                let ev: FlowEvent = serde_json::from_str(&line).map_err(|e| PersistenceError::Corrupted { line: i + 1,
                                                                                                       reason: e.to_string() })?;
                let list = events.entry(ev.flow_id).or_default();
                if list.is_empty() {
                    order.push(ev.flow_id);
                }
                if ev.seq != list.len() as u64 {
                    return Err(PersistenceError::Corrupted { line: i + 1,
                                                             reason: format!("seq gap for flow {}: expected {}, found {}",
                                                                             ev.flow_id,
                                                                             list.len(),
                                                                             ev.seq) });
                }
                list.push(ev);
            }
            if complete < raw.len() {
                warn!(path = %path.display(),
                      dropped_bytes = raw.len() - complete,
                      "event log ends in a partial line; truncating");
                OpenOptions::new().write(true)
                                  .open(&path)
                                  .and_then(|f| f.set_len(complete as u64))
                                  .map_err(io_err(&path))?;
            }
        }
        let file = OpenOptions::new().create(true)
                                     .append(true)
                                     .open(&path)
                                     .map_err(io_err(&path))?;
        info!(path = %path.display(), flows = order.len(), "event log opened");
        Ok(Self { path,
                  file,
                  events,
                  order })
    }

    /// `<dir>/events.jsonl`.
    pub fn open_in_dir(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Self::open(dir.as_ref().join(EVENTS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, flow_id: Uuid, kind: FlowEventKind) -> Result<FlowEvent, PersistenceError> {
        let seq = self.events.get(&flow_id).map(|v| v.len()).unwrap_or(0) as u64;
        let ev = FlowEvent { seq,
                             flow_id,
                             kind,
                             ts: Utc::now() };
        let mut line = serde_json::to_string(&ev)?;
        line.push('\n');
        self.file.write_all(line.as_bytes()).map_err(io_err(&self.path))?;
        self.file.flush().map_err(io_err(&self.path))?;

        let list = self.events.entry(flow_id).or_default();
        if list.is_empty() {
            self.order.push(flow_id);
        }
        list.push(ev.clone());
        debug!(%flow_id, seq, event = ev.kind.variant_code(), "event appended");
        Ok(ev)
    }
}

impl EventStore for JsonlEventStore {
    fn append_kind(&mut self, flow_id: Uuid, kind: FlowEventKind) -> Result<FlowEvent, CoreEngineError> {
        Ok(self.append(flow_id, kind)?)
    }

    fn list(&self, flow_id: Uuid) -> Result<Vec<FlowEvent>, CoreEngineError> {
        Ok(self.events.get(&flow_id).cloned().unwrap_or_default())
    }

    fn flow_ids(&self) -> Result<Vec<Uuid>, CoreEngineError> {
        Ok(self.order.clone())
    }
}

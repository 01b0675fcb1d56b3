//! Contratos con los servicios externos del pipeline.
//!
//! Cada step del flujo delega en uno de estos traits: el sensor en
//! `ObjectStore::list_with_prefix`, los jobs de Hive en `HiveJobSubmitter` y
//! el archivado en `ObjectStore::move_matching`. Las implementaciones reales
//! viven en [`crate::gcloud`], las de prueba en [`crate::fakes`].

use std::sync::Mutex;
use std::time::{Duration, Instant};

use flow_domain::{GcsUri, RunConfiguration};
use serde::{Deserialize, Serialize};

use crate::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub bucket: String,
    pub name: String,
}

impl ObjectInfo {
    pub fn uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.name)
    }
}

/// Par origen/destino de un objeto movido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovedObject {
    pub from: String,
    pub to: String,
}

pub trait ObjectStore: Send + Sync {
    /// Objetos cuyo nombre empieza con `prefix` (sin comodines).
    fn list_with_prefix(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>, ServiceError>;

    /// Mueve los objetos que cumplen `pattern` bajo el "directorio"
    /// `destination`, conservando el nombre base. Sin coincidencias es error.
    fn move_matching(&self, pattern: &GcsUri, destination: &GcsUri) -> Result<Vec<MovedObject>, ServiceError>;
}

/// Job de Hive listo para enviar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiveJobRequest {
    pub step_id: String,
    pub query: String,
    pub target: RunConfiguration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Done,
    Error,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub state: JobState,
    pub details: Option<String>,
}

/// Envía un script HiveQL al cluster y bloquea hasta su estado final.
pub trait HiveJobSubmitter: Send + Sync {
    fn submit_and_wait(&self, request: &HiveJobRequest) -> Result<JobOutcome, ServiceError>;
}

/// Reloj monotónico inyectable; el sensor lo usa para medir el timeout y
/// esperar entre pokes.
pub trait Clock: Send + Sync {
    /// Tiempo transcurrido desde un origen fijo del reloj.
    fn elapsed(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Reloj manual: `sleep` sólo avanza el tiempo. Registra cada espera.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.lock().map(|n| *n).unwrap_or_default()
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut s) = self.sleeps.lock() {
            s.push(duration);
        }
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_only_on_sleep() {
        let c = ManualClock::new();
        assert_eq!(c.elapsed(), Duration::ZERO);
        c.sleep(Duration::from_secs(30));
        c.sleep(Duration::from_secs(30));
        assert_eq!(c.elapsed(), Duration::from_secs(60));
        assert_eq!(c.sleeps().len(), 2);
    }
}

//! ObjectPrefixSensorStep
//!
//! Espera activa (modo poke) hasta que exista al menos un objeto con el
//! prefijo dado. Entre pokes duerme `poke_interval` sobre el `Clock`
//! inyectado; si tras un poke vacío ya pasó `timeout`, el step falla con
//! `SensorTimeout`. Un run sin archivo falla, por lo tanto, antes de
//! `timeout + poke_interval`.

use std::sync::Arc;
use std::time::Duration;

use flow_core::{ArtifactSpec, CoreEngineError, ExecutionContext, StepDefinition, StepKind, StepRunResult, StepSignal};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::artifacts::ObjectListingArtifact;
use crate::services::{Clock, ObjectStore};

pub struct ObjectPrefixSensorStep {
    id: String,
    bucket: String,
    prefix: String,
    poke_interval: Duration,
    timeout: Duration,
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
}

impl ObjectPrefixSensorStep {
    pub fn new(id: impl Into<String>,
               bucket: impl Into<String>,
               prefix: impl Into<String>,
               store: Arc<dyn ObjectStore>,
               clock: Arc<dyn Clock>)
               -> Self {
        Self { id: id.into(),
               bucket: bucket.into(),
               prefix: prefix.into(),
               poke_interval: Duration::from_secs(30),
               timeout: Duration::from_secs(300),
               store,
               clock }
    }

    pub fn with_poke_interval(mut self, interval: Duration) -> Self {
        self.poke_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ObjectPrefixSensorStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPrefixSensorStep")
         .field("id", &self.id)
         .field("bucket", &self.bucket)
         .field("prefix", &self.prefix)
         .field("poke_interval", &self.poke_interval)
         .field("timeout", &self.timeout)
         .finish()
    }
}

impl StepDefinition for ObjectPrefixSensorStep {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StepKind {
        StepKind::Sensor
    }

    fn base_params(&self) -> Value {
        json!({
            "bucket": self.bucket,
            "prefix": self.prefix,
            "mode": "poke",
            "poke_interval_secs": self.poke_interval.as_secs(),
            "timeout_secs": self.timeout.as_secs(),
        })
    }

    fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        let started = self.clock.elapsed();
        let mut signals = Vec::new();
        let mut pokes: u32 = 0;
        loop {
            pokes += 1;
            let found = match self.store.list_with_prefix(&self.bucket, &self.prefix) {
                Ok(objs) => objs,
                Err(e) => {
                    warn!(flow_id = %ctx.flow_id, step = %self.id, error = %e, "sensor poke failed");
                    return StepRunResult::failure(CoreEngineError::Storage(e.to_string()));
                }
            };
            let waited = self.clock.elapsed().saturating_sub(started);
            debug!(step = %self.id, poke = pokes, found = found.len(), waited_secs = waited.as_secs(), "sensor poke");
            signals.push(StepSignal { signal: "SENSOR_POKE".to_string(),
                                      data: json!({ "poke": pokes, "found": found.len(), "waited_secs": waited.as_secs() }) });

            if !found.is_empty() {
                info!(step = %self.id, objects = found.len(), pokes, "sensor condition met");
                let listing = ObjectListingArtifact { bucket: self.bucket.clone(),
                                                      prefix: self.prefix.clone(),
                                                      objects: found.into_iter().map(|o| o.name).collect(),
                                                      pokes };
                return match listing.to_artifact() {
                    Ok(art) => StepRunResult::SuccessWithSignals { outputs: vec![art],
                                                                   signals },
                    Err(e) => StepRunResult::failure(CoreEngineError::Internal(e.to_string())),
                };
            }

            // Cota inclusiva: el poke que cae justo en `timeout` es el último,
            // así que la espera total nunca pasa de `timeout`.
            if waited >= self.timeout {
                warn!(step = %self.id, waited_secs = waited.as_secs(), timeout_secs = self.timeout.as_secs(),
                      "sensor timed out");
                return StepRunResult::failure(CoreEngineError::SensorTimeout { waited_secs: waited.as_secs(),
                                                                               timeout_secs: self.timeout.as_secs() });
            }
            self.clock.sleep(self.poke_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::InMemoryObjectStore;
    use crate::services::ManualClock;
    use uuid::Uuid;

    fn ctx() -> ExecutionContext {
        ExecutionContext { flow_id: Uuid::nil(),
                           step_index: 0,
                           params: Value::Null }
    }

    #[test]
    fn times_out_within_timeout_plus_one_interval() {
        let store = Arc::new(InMemoryObjectStore::new());
        let clock = Arc::new(ManualClock::new());
        let step = ObjectPrefixSensorStep::new("sense", "b", "in/logistics_", store, clock.clone());
        match step.run(&ctx()) {
            StepRunResult::Failure { error: CoreEngineError::SensorTimeout { waited_secs, timeout_secs } } => {
                assert_eq!(timeout_secs, 300);
                assert!(waited_secs >= 300 && waited_secs <= 330);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(clock.elapsed() <= Duration::from_secs(330));
        assert!(clock.sleeps().iter().all(|d| *d == Duration::from_secs(30)));
    }

    #[test]
    fn succeeds_when_object_appears_later() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put_object_after("b", "in/logistics_1.csv", "h\n", 3);
        store.put_object("b", "in/other.csv", "x");
        let clock = Arc::new(ManualClock::new());
        let step = ObjectPrefixSensorStep::new("sense", "b", "in/logistics_", store, clock.clone());
        match step.run(&ctx()) {
            StepRunResult::SuccessWithSignals { outputs, signals } => {
                let listing = ObjectListingArtifact::from_artifact(&outputs[0]).unwrap();
                assert_eq!(listing.objects, vec!["in/logistics_1.csv".to_string()]);
                assert_eq!(listing.pokes, 3);
                assert_eq!(signals.len(), 3);
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(clock.elapsed(), Duration::from_secs(60));
    }

    #[test]
    fn poke_landing_on_the_timeout_is_the_last_one() {
        let store = Arc::new(InMemoryObjectStore::new());
        let clock = Arc::new(ManualClock::new());
        let step = ObjectPrefixSensorStep::new("sense", "b", "in/logistics_", store, clock.clone());
        match step.run(&ctx()) {
            StepRunResult::Failure { error: CoreEngineError::SensorTimeout { waited_secs, .. } } => {
                assert_eq!(waited_secs, 300)
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(clock.sleeps().len(), 10);
        assert_eq!(clock.elapsed(), Duration::from_secs(300));
    }
}

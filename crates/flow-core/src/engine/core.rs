//! Core FlowEngine implementation

use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::CoreEngineError;
use crate::event::{EventStore, FlowEvent, FlowEventKind};
use crate::hashing::hash_value;
use crate::injection::{CompositeInjector, ParamInjector};
use crate::model::{Artifact, ExecutionContext, StepFingerprintInput};
use crate::repo::{FlowDefinition, FlowInstance, FlowRepository};
use crate::step::{StepDefinition, StepRunResult, StepSignal, StepStatus};

/// Motor de ejecución lineal.
///
/// Ejecuta los pasos de una `FlowDefinition` en orden estricto: el paso n+1
/// sólo corre si el paso n terminó con éxito. El estado se reconstruye en
/// cada avance a partir del `EventStore` (replay), de modo que un flujo
/// fallido no puede avanzar aunque se invoque `next_with` de nuevo.
#[derive(Debug)]
pub struct FlowEngine<E, R>
    where E: EventStore,
          R: FlowRepository
{
    event_store: E,
    repository: R,
    injectors: Vec<Box<dyn ParamInjector>>,
}

impl<E, R> FlowEngine<E, R>
    where E: EventStore,
          R: FlowRepository
{
    /// Crea un nuevo motor con los stores proporcionados
    pub fn new_with_stores(event_store: E, repository: R) -> Self {
        Self { event_store,
               repository,
               injectors: Vec::new() }
    }

    /// Añade un inyector de parámetros
    pub fn add_injector(&mut self, injector: Box<dyn ParamInjector>) {
        self.injectors.push(injector);
    }

    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    /// Garantiza el evento `FlowInitialized` y devuelve los eventos actuales.
    fn load_or_init(&mut self, flow_id: Uuid, definition: &FlowDefinition) -> Result<Vec<FlowEvent>, CoreEngineError> {
        let mut events = self.event_store.list(flow_id)?;
        let has_init = events.iter().any(|e| matches!(e.kind, FlowEventKind::FlowInitialized { .. }));
        if !has_init {
            let ev = self.event_store
                         .append_kind(flow_id,
                                      FlowEventKind::FlowInitialized { flow_name: definition.name.clone(),
                                                                       definition_hash: definition.definition_hash.clone(),
                                                                       step_count: definition.len() })?;
            info!(%flow_id, flow = %definition.name, steps = definition.len(), "flow initialized");
            events.push(ev);
        }
        Ok(events)
    }

    fn hash_outputs(outputs: &mut [Artifact]) -> Vec<String> {
        outputs.iter_mut()
               .map(|o| {
                   o.hash = hash_value(&o.payload);
                   o.hash.clone()
               })
               .collect()
    }

    /// Ejecuta un flujo específico hasta su finalización o primer fallo.
    pub fn run_flow_to_completion(&mut self, flow_id: Uuid, definition: &FlowDefinition) -> Result<Uuid, CoreEngineError> {
        loop {
            match self.next_with(flow_id, definition) {
                Ok(()) => continue,
                Err(CoreEngineError::FlowCompleted) => return Ok(flow_id),
                Err(e) => return Err(e),
            }
        }
    }

    /// Estado reconstruido de un flujo.
    pub fn instance(&self, flow_id: Uuid, definition: &FlowDefinition) -> Result<FlowInstance, CoreEngineError> {
        let events = self.event_store.list(flow_id)?;
        Ok(self.repository.load(flow_id, &events, definition))
    }

    /// Ejecuta el siguiente paso pendiente del flujo.
    ///
    /// Devuelve `FlowCompleted` cuando no quedan pasos y `FlowHasFailed` si
    /// un paso anterior falló: ningún paso posterior a un fallo se ejecuta.
    /// Un step con `StepStarted` sin resultado registrado (corte a mitad de
    /// ejecución) bloquea el flujo con `Internal`.
    pub fn next_with(&mut self, flow_id: Uuid, definition: &FlowDefinition) -> Result<(), CoreEngineError> {
        let events = self.load_or_init(flow_id, definition)?;
        let instance = self.repository.load(flow_id, &events, definition);

        if instance.is_failed() {
            return Err(CoreEngineError::FlowHasFailed);
        }
        if instance.completed || instance.cursor >= definition.len() {
            return Err(CoreEngineError::FlowCompleted);
        }

        let cursor = instance.cursor;
        let step_def = definition.steps[cursor].as_ref();
        if instance.steps[cursor].status == StepStatus::Running {
            warn!(%flow_id, step = step_def.id(), index = cursor, "step started without a recorded outcome");
            return Err(CoreEngineError::Internal(format!("step {cursor} ({}) has no outcome", step_def.id())));
        }

        let base = step_def.base_params();
        let mut ctx = ExecutionContext { flow_id,
                                         step_index: cursor,
                                         params: base.clone() };
        ctx.params = CompositeInjector::apply_injectors(&self.injectors, &base, &ctx);

        self.event_store.append_kind(flow_id,
                                     FlowEventKind::StepStarted { step_index: cursor,
                                                                  step_id: step_def.id().to_string() })?;
        info!(%flow_id, step = step_def.id(), index = cursor, kind = ?step_def.kind(), "step started");

        match step_def.run(&ctx) {
            StepRunResult::Success { outputs } => {
                self.handle_step_success(flow_id, cursor, step_def, outputs, Vec::new(), &ctx, definition)
            }
            StepRunResult::SuccessWithSignals { outputs, signals } => {
                self.handle_step_success(flow_id, cursor, step_def, outputs, signals, &ctx, definition)
            }
            StepRunResult::Failure { error } => self.handle_step_failure(flow_id, cursor, step_def, error, &ctx),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_step_success(&mut self,
                           flow_id: Uuid,
                           cursor: usize,
                           step_def: &dyn StepDefinition,
                           mut outputs: Vec<Artifact>,
                           signals: Vec<StepSignal>,
                           ctx: &ExecutionContext,
                           definition: &FlowDefinition)
                           -> Result<(), CoreEngineError> {
        let output_hashes = Self::hash_outputs(&mut outputs);

        for s in signals {
            self.event_store.append_kind(flow_id,
                                         FlowEventKind::StepSignal { step_index: cursor,
                                                                     step_id: step_def.id().to_string(),
                                                                     signal: s.signal,
                                                                     data: s.data })?;
        }

        let fp = self.calculate_step_fingerprint(cursor, step_def, &output_hashes, ctx, definition);
        self.event_store.append_kind(flow_id,
                                     FlowEventKind::StepFinished { step_index: cursor,
                                                                   step_id: step_def.id().to_string(),
                                                                   outputs: output_hashes,
                                                                   fingerprint: fp })?;
        info!(%flow_id, step = step_def.id(), index = cursor, "step finished");

        if cursor + 1 == definition.len() {
            self.complete_flow(flow_id, definition)?;
        }
        Ok(())
    }

    fn handle_step_failure(&mut self,
                           flow_id: Uuid,
                           cursor: usize,
                           step_def: &dyn StepDefinition,
                           error: CoreEngineError,
                           ctx: &ExecutionContext)
                           -> Result<(), CoreEngineError> {
        let fp = hash_value(&json!({
            "engine_version": crate::constants::ENGINE_VERSION,
            "definition_hash": step_def.definition_hash(),
            "step_index": cursor,
            "params": ctx.params,
        }));

        self.event_store.append_kind(flow_id,
                                     FlowEventKind::StepFailed { step_index: cursor,
                                                                 step_id: step_def.id().to_string(),
                                                                 error: error.clone(),
                                                                 fingerprint: fp })?;
        self.event_store.append_kind(flow_id,
                                     FlowEventKind::FlowFailed { step_index: cursor,
                                                                 step_id: step_def.id().to_string() })?;
        warn!(%flow_id, step = step_def.id(), index = cursor, %error, "step failed; halting flow");

        Err(error)
    }

    fn calculate_step_fingerprint(&self,
                                  cursor: usize,
                                  step_def: &dyn StepDefinition,
                                  output_hashes: &[String],
                                  ctx: &ExecutionContext,
                                  definition: &FlowDefinition)
                                  -> String {
        let input = StepFingerprintInput { engine_version: crate::constants::ENGINE_VERSION,
                                           definition_hash: &definition.definition_hash,
                                           step_index: cursor,
                                           step_id: step_def.id(),
                                           output_hashes,
                                           params: &ctx.params };
        match serde_json::to_value(&input) {
            Ok(v) => hash_value(&v),
            // StepFingerprintInput sólo contiene strings y JSON ya válido.
            Err(_) => hash_value(&json!({ "step_id": step_def.id(), "step_index": cursor })),
        }
    }

    fn complete_flow(&mut self, flow_id: Uuid, definition: &FlowDefinition) -> Result<(), CoreEngineError> {
        let events = self.event_store.list(flow_id)?;
        let step_fps: Vec<String> = events.iter()
                                          .filter_map(|e| match &e.kind {
                                              FlowEventKind::StepFinished { fingerprint, .. } => Some(fingerprint.clone()),
                                              _ => None,
                                          })
                                          .collect();

        let flow_fp = hash_value(&json!({
                                     "engine_version": crate::constants::ENGINE_VERSION,
                                     "definition_hash": definition.definition_hash,
                                     "step_fingerprints": step_fps
                                 }));

        self.event_store
            .append_kind(flow_id, FlowEventKind::FlowCompleted { flow_fingerprint: flow_fp.clone() })?;
        debug!(%flow_id, fingerprint = %flow_fp, "flow completed");
        Ok(())
    }

    /// Eventos de un flujo cualquiera.
    pub fn events_for(&self, flow_id: Uuid) -> Result<Vec<FlowEvent>, CoreEngineError> {
        self.event_store.list(flow_id)
    }

    /// Fingerprint de un flujo completado; `None` si no terminó con éxito.
    pub fn flow_fingerprint(&self, flow_id: Uuid) -> Result<Option<String>, CoreEngineError> {
        Ok(self.events_for(flow_id)?
               .into_iter()
               .rev()
               .find_map(|e| match e.kind {
                   FlowEventKind::FlowCompleted { flow_fingerprint } => Some(flow_fingerprint),
                   _ => None,
               }))
    }
}

//! Tipos de repositorio: estado reconstruido (FlowInstance) y definición
//! (FlowDefinition).
//!
//! El repositorio aplica un replay lineal: consume eventos en orden y
//! actualiza un `FlowInstance`. No almacena artifacts completos (sólo hashes).
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashSet;
use uuid::Uuid;

use crate::errors::CoreEngineError;
use crate::event::{FlowEvent, FlowEventKind};
use crate::step::{StepDefinition, StepStatus};

#[derive(Debug, Clone)]
pub struct FlowInstance {
    pub id: Uuid,
    pub steps: Vec<StepSlot>,
    /// Índice del primer step sin resultado, `Pending` o `Running`
    /// (== len si no queda ninguno).
    pub cursor: usize,
    pub completed: bool,
    /// Índice del step que falló, si lo hubo.
    pub failed_at: Option<usize>,
}

impl FlowInstance {
    pub fn is_failed(&self) -> bool {
        self.failed_at.is_some()
    }

    pub fn slot(&self, step_id: &str) -> Option<&StepSlot> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}

/// Estado de un step en la instancia.
#[derive(Debug, Clone)]
pub struct StepSlot {
    pub step_id: String,
    pub status: StepStatus,
    pub fingerprint: Option<String>,
    pub outputs: Vec<String>,
    pub error: Option<CoreEngineError>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub attempts: u32,
}

/// Trait para reconstruir (`replay`) estado de un flow a partir de eventos.
pub trait FlowRepository {
    fn load(&self, flow_id: Uuid, events: &[FlowEvent], definition: &FlowDefinition) -> FlowInstance;
}

/// Definición inmutable del Flow: pasos en orden estricto.
pub struct FlowDefinition {
    pub name: String,
    pub steps: Vec<Box<dyn StepDefinition>>,
    pub definition_hash: String,
}

impl FlowDefinition {
    pub fn new(name: String, steps: Vec<Box<dyn StepDefinition>>, definition_hash: String) -> Self {
        Self { name,
               steps,
               definition_hash }
    }
    pub fn len(&self) -> usize {
        self.steps.len()
    }
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id()).collect()
    }
    pub fn position(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id() == step_id)
    }
}

impl std::fmt::Debug for FlowDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowDefinition")
         .field("name", &self.name)
         .field("steps", &self.step_ids())
         .field("definition_hash", &self.definition_hash)
         .finish()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFlowRepository;

impl InMemoryFlowRepository {
    pub fn new() -> Self {
        Self
    }
}

impl FlowRepository for InMemoryFlowRepository {
    fn load(&self, flow_id: Uuid, events: &[FlowEvent], definition: &FlowDefinition) -> FlowInstance {
        let mut steps: Vec<StepSlot> = definition.steps
                                                 .iter()
                                                 .map(|s| StepSlot { step_id: s.id().to_string(),
                                                                     status: StepStatus::Pending,
                                                                     fingerprint: None,
                                                                     outputs: vec![],
                                                                     error: None,
                                                                     started_at: None,
                                                                     finished_at: None,
                                                                     attempts: 0 })
                                                 .collect();
        let mut completed = false;
        let mut failed_at = None;
        for ev in events {
            match &ev.kind {
                FlowEventKind::FlowInitialized { .. } | FlowEventKind::StepSignal { .. } => {}
                FlowEventKind::StepStarted { step_index, .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::Running;
                        slot.started_at = Some(ev.ts);
                        slot.attempts += 1;
                    }
                }
                FlowEventKind::StepFinished { step_index,
                                              fingerprint,
                                              outputs,
                                              .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::FinishedOk;
                        slot.fingerprint = Some(fingerprint.clone());
                        slot.outputs = outputs.clone();
                        slot.finished_at = Some(ev.ts);
                    }
                }
                FlowEventKind::StepFailed { step_index,
                                            fingerprint,
                                            error,
                                            .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::Failed;
                        slot.fingerprint = Some(fingerprint.clone());
                        slot.error = Some(error.clone());
                        slot.finished_at = Some(ev.ts);
                    }
                    failed_at.get_or_insert(*step_index);
                }
                FlowEventKind::FlowCompleted { .. } => completed = true,
                FlowEventKind::FlowFailed { step_index, .. } => {
                    failed_at.get_or_insert(*step_index);
                }
            }
        }
        if let Some(idx) = failed_at {
            for slot in steps.iter_mut().skip(idx + 1) {
                if slot.status == StepStatus::Pending {
                    slot.status = StepStatus::UpstreamFailed;
                }
            }
        }
        let cursor = steps.iter()
                          .position(|s| matches!(s.status, StepStatus::Pending | StepStatus::Running))
                          .unwrap_or(steps.len());
        FlowInstance { id: flow_id,
                       steps,
                       cursor,
                       completed,
                       failed_at }
    }
}

/// Construye una definición validando ids únicos y no vacía. El hash combina
/// nombre, orden de ids y el `definition_hash` de cada step, por lo que un
/// cambio de parámetros base produce otra definición.
pub fn build_flow_definition(name: &str, steps: Vec<Box<dyn StepDefinition>>) -> Result<FlowDefinition, CoreEngineError> {
    if steps.is_empty() {
        return Err(CoreEngineError::EmptyDefinition);
    }
    let mut seen = HashSet::new();
    for s in &steps {
        if !seen.insert(s.id().to_string()) {
            return Err(CoreEngineError::DuplicateStepId(s.id().to_string()));
        }
    }
    let step_hashes: Vec<serde_json::Value> =
        steps.iter()
             .map(|s| json!({ "id": s.id(), "hash": s.definition_hash() }))
             .collect();
    let definition_hash = crate::hashing::hash_value(&json!({ "name": name, "steps": step_hashes }));
    Ok(FlowDefinition::new(name.to_string(), steps, definition_hash))
}

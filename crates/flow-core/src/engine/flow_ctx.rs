//! Avance manual de un flujo concreto.

use uuid::Uuid;

use crate::engine::FlowEngine;
use crate::errors::CoreEngineError;
use crate::event::EventStore;
use crate::repo::{FlowDefinition, FlowRepository};
use crate::step::StepStatus;

/// Un flujo (`flow_id` + definición) ligado a un `FlowEngine`, para avanzar
/// hasta un step dado e inspeccionar el estado intermedio.
pub struct FlowCtx<'a, E: EventStore, R: FlowRepository> {
    pub engine: &'a mut FlowEngine<E, R>,
    pub flow_id: Uuid,
    pub definition: &'a FlowDefinition,
}

impl<'a, E: EventStore, R: FlowRepository> FlowCtx<'a, E, R> {
    pub fn new(engine: &'a mut FlowEngine<E, R>, flow_id: Uuid, definition: &'a FlowDefinition) -> Self {
        Self { engine,
               flow_id,
               definition }
    }

    #[inline]
    pub fn step(&mut self) -> Result<(), CoreEngineError> {
        self.engine.next_with(self.flow_id, self.definition)
    }

    /// Avanza hasta que `step_id` quede en un estado terminal y lo devuelve.
    /// Los steps posteriores quedan `Pending`; si un step previo falla, el
    /// resultado es `UpstreamFailed`.
    ///
    /// # Errores
    /// `InvalidStepIndex` si `step_id` no está en la definición.
    pub fn run_through(&mut self, step_id: &str) -> Result<StepStatus, CoreEngineError> {
        loop {
            let status = self.status(step_id)?;
            if status.is_terminal() {
                return Ok(status);
            }
            if let Err(e) = self.step() {
                let status = self.status(step_id)?;
                return if status.is_terminal() { Ok(status) } else { Err(e) };
            }
        }
    }

    pub fn status(&self, step_id: &str) -> Result<StepStatus, CoreEngineError> {
        let instance = self.engine.instance(self.flow_id, self.definition)?;
        instance.slot(step_id).map(|s| s.status).ok_or(CoreEngineError::InvalidStepIndex)
    }
}

//! flow-core: motor lineal de pipelines con stop-on-failure.
//!
//! Un flujo es una lista ordenada de `StepDefinition`. El motor ejecuta un
//! paso por vez, registra cada transición en un `EventStore` append-only y
//! reconstruye el estado por replay (`FlowRepository`).
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod injection;
pub mod model;
pub mod repo;
pub mod step;

pub use engine::{FlowCtx, FlowEngine};
pub use errors::CoreEngineError;
pub use event::{EventStore, FlowEvent, FlowEventKind, InMemoryEventStore};
pub use injection::{CompositeInjector, ParamInjector};
pub use model::{Artifact, ArtifactKind, ArtifactSpec, ExecutionContext};
pub use repo::{build_flow_definition, FlowDefinition, FlowInstance, FlowRepository, InMemoryFlowRepository};
pub use step::{StepDefinition, StepKind, StepRunResult, StepSignal, StepStatus};

use flow_core::model::ExecutionContext;
use flow_core::{build_flow_definition, EventStore, FlowEngine, FlowEventKind, InMemoryEventStore, InMemoryFlowRepository,
                ParamInjector, StepDefinition, StepKind, StepRunResult, StepStatus};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

#[derive(Debug)]
struct RegionInjector;

impl ParamInjector for RegionInjector {
    fn inject(&self, _base: &Value, _ctx: &ExecutionContext) -> Value {
        json!({ "region": "europe-west1" })
    }
}

// Registra los params efectivos que recibe.
#[derive(Debug)]
struct Recorder {
    id: &'static str,
    seen: Rc<RefCell<Vec<Value>>>,
}

impl StepDefinition for Recorder {
    fn id(&self) -> &str {
        self.id
    }
    fn kind(&self) -> StepKind {
        StepKind::RemoteJob
    }
    fn base_params(&self) -> Value {
        json!({ "query": format!("SELECT '{}'", self.id), "region": "" })
    }
    fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
        self.seen.borrow_mut().push(ctx.params.clone());
        StepRunResult::Success { outputs: vec![] }
    }
}

#[test]
fn injected_params_override_base_params() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let def = build_flow_definition("inject",
                                    vec![Box::new(Recorder { id: "one", seen: seen.clone() }),
                                         Box::new(Recorder { id: "two", seen: seen.clone() })])
        .expect("definition");
    let mut engine = FlowEngine::new_with_stores(InMemoryEventStore::default(), InMemoryFlowRepository::new());
    engine.add_injector(Box::new(RegionInjector));

    engine.run_flow_to_completion(Uuid::new_v4(), &def).expect("completes");
    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], json!({ "query": "SELECT 'one'", "region": "europe-west1" }));
    assert_eq!(seen[1]["query"], "SELECT 'two'");
}

#[test]
fn replay_from_store_rebuilds_state_for_another_engine() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let def = build_flow_definition("replay",
                                    vec![Box::new(Recorder { id: "one", seen: seen.clone() }),
                                         Box::new(Recorder { id: "two", seen: seen.clone() })])
        .unwrap();
    let flow_id = Uuid::new_v4();

    let mut engine = FlowEngine::new_with_stores(InMemoryEventStore::default(), InMemoryFlowRepository::new());
    engine.next_with(flow_id, &def).expect("first step");

    let events = engine.events_for(flow_id).unwrap();
    assert!(matches!(&events[0].kind, FlowEventKind::FlowInitialized { flow_name, step_count: 2, .. } if flow_name == "replay"));

    // Copiar eventos a otro store y continuar allí: sólo corre el paso restante.
    let mut copy = InMemoryEventStore::default();
    for ev in events {
        copy.append_kind(flow_id, ev.kind).unwrap();
    }
    let mut resumed = FlowEngine::new_with_stores(copy, InMemoryFlowRepository::new());
    resumed.run_flow_to_completion(flow_id, &def).expect("resume");
    assert_eq!(seen.borrow().len(), 2);

    let instance = resumed.instance(flow_id, &def).unwrap();
    assert!(instance.completed);
    assert_eq!(instance.slot("two").map(|s| s.status), Some(StepStatus::FinishedOk));
}

#[test]
fn definition_hash_changes_with_params() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let a = build_flow_definition("h", vec![Box::new(Recorder { id: "one", seen: seen.clone() })]).unwrap();
    let b = build_flow_definition("h", vec![Box::new(Recorder { id: "uno", seen: seen.clone() })]).unwrap();
    let c = build_flow_definition("h", vec![Box::new(Recorder { id: "one", seen })]).unwrap();
    assert_ne!(a.definition_hash, b.definition_hash);
    assert_eq!(a.definition_hash, c.definition_hash);
}

use flow_core::model::ExecutionContext;
use flow_core::{build_flow_definition, CoreEngineError, EventStore, FlowEngine, FlowEventKind, InMemoryFlowRepository,
                StepDefinition, StepKind, StepRunResult, StepStatus};
use flow_persistence::JsonlEventStore;
use serde_json::{json, Value};

#[derive(Debug)]
struct Fixed {
    id: &'static str,
    fail: bool,
}

impl StepDefinition for Fixed {
    fn id(&self) -> &str {
        self.id
    }
    fn kind(&self) -> StepKind {
        StepKind::RemoteJob
    }
    fn base_params(&self) -> Value {
        json!({ "id": self.id })
    }
    fn run(&self, _ctx: &ExecutionContext) -> StepRunResult {
        if self.fail {
            StepRunResult::failure(CoreEngineError::RemoteJob(format!("{} failed", self.id)))
        } else {
            StepRunResult::Success { outputs: vec![] }
        }
    }
}

fn steps(fail_second: bool) -> Vec<Box<dyn StepDefinition>> {
    vec![Box::new(Fixed { id: "a", fail: false }),
         Box::new(Fixed { id: "b", fail: fail_second }),
         Box::new(Fixed { id: "c", fail: false })]
}

#[test]
fn completed_run_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let def = build_flow_definition("durable", steps(false)).unwrap();
    let store = JsonlEventStore::open_in_dir(dir.path()).unwrap();
    let mut engine = FlowEngine::new_with_stores(store, InMemoryFlowRepository::new());
    let flow_id = engine.run_flow_to_completion(uuid::Uuid::new_v4(), &def).unwrap();
    let fp = engine.flow_fingerprint(flow_id).unwrap().expect("completed flow has a fingerprint");
    drop(engine);

    let reopened = JsonlEventStore::open_in_dir(dir.path()).unwrap();
    let events = reopened.list(flow_id).unwrap();
    assert!(matches!(events.first().map(|e| &e.kind), Some(FlowEventKind::FlowInitialized { .. })));
    match &events.last().unwrap().kind {
        FlowEventKind::FlowCompleted { flow_fingerprint } => assert_eq!(flow_fingerprint, &fp),
        other => panic!("expected FlowCompleted, got {other:?}"),
    }
}

#[test]
fn failed_run_stays_failed_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let def = build_flow_definition("durable", steps(true)).unwrap();
    let flow_id = uuid::Uuid::new_v4();
    {
        let store = JsonlEventStore::open_in_dir(dir.path()).unwrap();
        let mut engine = FlowEngine::new_with_stores(store, InMemoryFlowRepository::new());
        let err = engine.run_flow_to_completion(flow_id, &def).unwrap_err();
        assert_eq!(err, CoreEngineError::RemoteJob("b failed".into()));
    }

    // Un engine nuevo sobre el mismo log no puede avanzar el flujo fallido.
    let store = JsonlEventStore::open_in_dir(dir.path()).unwrap();
    let mut engine = FlowEngine::new_with_stores(store, InMemoryFlowRepository::new());
    assert_eq!(engine.next_with(flow_id, &def), Err(CoreEngineError::FlowHasFailed));

    let instance = engine.instance(flow_id, &def).unwrap();
    let statuses: Vec<StepStatus> = instance.steps.iter().map(|s| s.status).collect();
    assert_eq!(statuses, vec![StepStatus::FinishedOk, StepStatus::Failed, StepStatus::UpstreamFailed]);
}

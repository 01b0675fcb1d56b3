use flow_core::{ExecutionContext, ParamInjector};
use flow_domain::run_config::{PARAM_KEYS, VARIABLE_KEYS};
use flow_domain::RunConfiguration;
use serde_json::{Map, Value};

/// Inyecta el destino de los jobs remotos (cluster, región, proyecto) en los
/// steps que lo declaran en sus params base.
///
/// Se construye desde la variable `cluster_details` tal cual llegó: los
/// campos ausentes o vacíos no se inyectan y el step correspondiente falla
/// con `MissingConfiguration` antes de enviar nada.
#[derive(Debug, Clone, Default)]
pub struct RunConfigInjector {
    values: Map<String, Value>,
}

impl RunConfigInjector {
    pub fn new(config: &RunConfiguration) -> Self {
        match config.to_params() {
            Value::Object(values) => Self { values },
            _ => Self::default(),
        }
    }

    /// Desde la variable `cluster_details` sin validar.
    pub fn from_variable(variable: Option<&Value>) -> Self {
        let mut values = Map::new();
        if let Some(Value::Object(vars)) = variable {
            for (var_key, param_key) in VARIABLE_KEYS.iter().zip(PARAM_KEYS.iter()) {
                if let Some(s) = vars.get(*var_key).and_then(Value::as_str) {
                    if !s.trim().is_empty() {
                        values.insert(param_key.to_string(), Value::String(s.trim().to_string()));
                    }
                }
            }
        }
        Self { values }
    }

    pub fn is_complete(&self) -> bool {
        PARAM_KEYS.iter().all(|k| self.values.contains_key(*k))
    }
}

impl ParamInjector for RunConfigInjector {
    fn inject(&self, base: &Value, _ctx: &ExecutionContext) -> Value {
        let wants_target = PARAM_KEYS.iter().any(|k| base.get(*k).is_some());
        if !wants_target {
            return Value::Object(Map::new());
        }
        Value::Object(self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::CompositeInjector;
    use serde_json::json;
    use uuid::Uuid;

    fn ctx() -> ExecutionContext {
        ExecutionContext { flow_id: Uuid::nil(),
                           step_index: 0,
                           params: Value::Null }
    }

    #[test]
    fn only_steps_with_target_placeholders_receive_values() {
        let inj = RunConfigInjector::new(&RunConfiguration::new("c", "r", "p").unwrap());
        let sensor = json!({"bucket": "b"});
        assert_eq!(inj.inject(&sensor, &ctx()), json!({}));

        let job = json!({"query": "q", "cluster_name": "", "region": "", "project_id": ""});
        let merged = CompositeInjector::with_injectors(vec![Box::new(inj)]).apply(&job, &ctx());
        assert_eq!(merged, json!({"query": "q", "cluster_name": "c", "region": "r", "project_id": "p"}));
    }

    #[test]
    fn partial_variable_leaves_placeholders_empty() {
        let var = json!({"CLUSTER_NAME": "c", "REGION": "r", "PROJECT_ID": " "});
        let inj = RunConfigInjector::from_variable(Some(&var));
        assert!(!inj.is_complete());
        let job = json!({"cluster_name": "", "region": "", "project_id": ""});
        let out = inj.inject(&job, &ctx());
        assert!(out.get("project_id").is_none());
        assert!(RunConfigInjector::from_variable(None).inject(&job, &ctx()).as_object().unwrap().is_empty());
    }
}

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

/// Contexto de ejecución entregado a `StepDefinition::run`.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub flow_id: Uuid,
    pub step_index: usize,
    pub params: Value, // base params + inyectores
}

impl ExecutionContext {
    /// Decodifica los params efectivos a un tipo concreto.
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.params.clone())
    }

    /// Lee un parámetro string; vacío o ausente devuelve `None`.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

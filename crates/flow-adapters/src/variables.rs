//! Stores de variables clave/valor (p.ej. `cluster_details`).
//!
//! Las variables se guardan como JSON y se devuelven ya deserializadas. Una
//! variable ausente es `Ok(None)`; un valor que no es JSON válido es error.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use crate::ServiceError;

pub const ENV_PREFIX: &str = "HIVEFLOW_VAR_";

pub trait VariableStore: Send + Sync {
    fn get_json(&self, key: &str) -> Result<Option<Value>, ServiceError>;
}

/// Variables en el entorno: `cluster_details` → `HIVEFLOW_VAR_CLUSTER_DETAILS`.
#[derive(Debug, Clone)]
pub struct EnvVariableStore {
    prefix: String,
}

impl Default for EnvVariableStore {
    fn default() -> Self {
        Self { prefix: ENV_PREFIX.to_string() }
    }
}

impl EnvVariableStore {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn env_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_ascii_uppercase())
    }
}

impl VariableStore for EnvVariableStore {
    fn get_json(&self, key: &str) -> Result<Option<Value>, ServiceError> {
        let name = self.env_name(key);
        match std::env::var(&name) {
            Ok(raw) => {
                debug!(variable = key, env = %name, "variable read from environment");
                parse_variable(key, &raw).map(Some)
            }
            Err(_) => Ok(None),
        }
    }
}

/// Archivo JSON con un objeto `{ "<variable>": <valor> }`. Se relee en cada
/// `get_json`.
#[derive(Debug, Clone)]
pub struct JsonFileVariableStore {
    path: PathBuf,
}

impl JsonFileVariableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VariableStore for JsonFileVariableStore {
    fn get_json(&self, key: &str) -> Result<Option<Value>, ServiceError> {
        let raw = fs::read_to_string(&self.path)?;
        let doc = parse_variable(key, &raw)?;
        match doc {
            Value::Object(mut vars) => Ok(vars.remove(key)),
            _ => Err(ServiceError::Variable { key: key.to_string(),
                                              reason: format!("{} must contain a JSON object", self.path.display()) }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryVariableStore {
    vars: HashMap<String, Value>,
}

impl InMemoryVariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.vars.insert(key.into(), value);
        self
    }
}

impl VariableStore for InMemoryVariableStore {
    fn get_json(&self, key: &str) -> Result<Option<Value>, ServiceError> {
        Ok(self.vars.get(key).cloned())
    }
}

fn parse_variable(key: &str, raw: &str) -> Result<Value, ServiceError> {
    serde_json::from_str(raw).map_err(|e| ServiceError::Variable { key: key.to_string(),
                                                                   reason: format!("invalid JSON: {e}") })
}

// run_config.rs
use serde::Serialize;
use serde_json::{json, Value};

use crate::DomainError;

/// Destino de los jobs remotos de una ejecución: cluster, región y proyecto.
///
/// Se resuelve una vez por ejecución desde la variable `cluster_details`, un
/// objeto JSON con las claves `CLUSTER_NAME`, `REGION` y `PROJECT_ID`. Los
/// tres campos deben existir y no estar vacíos; de lo contrario ningún job
/// remoto se envía.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfiguration {
    #[serde(rename = "CLUSTER_NAME")]
    cluster_name: String,
    #[serde(rename = "REGION")]
    region: String,
    #[serde(rename = "PROJECT_ID")]
    project_id: String,
}

/// Claves de la variable externa, en orden.
pub const VARIABLE_KEYS: [&str; 3] = ["CLUSTER_NAME", "REGION", "PROJECT_ID"];
/// Claves con que la configuración viaja en los params de un step.
pub const PARAM_KEYS: [&str; 3] = ["cluster_name", "region", "project_id"];

impl RunConfiguration {
    /// Crea una configuración validada.
    ///
    /// # Errores
    /// `DomainError::MissingFields` con los nombres de variable vacíos.
    pub fn new(cluster_name: impl Into<String>,
               region: impl Into<String>,
               project_id: impl Into<String>)
               -> Result<Self, DomainError> {
        let cfg = Self { cluster_name: cluster_name.into().trim().to_string(),
                         region: region.into().trim().to_string(),
                         project_id: project_id.into().trim().to_string() };
        let missing: Vec<String> = VARIABLE_KEYS.iter()
                                                .zip(cfg.fields())
                                                .filter(|(_, v)| v.is_empty())
                                                .map(|(k, _)| k.to_string())
                                                .collect();
        if missing.is_empty() {
            Ok(cfg)
        } else {
            Err(DomainError::MissingFields(missing))
        }
    }

    /// Lee la variable `cluster_details` ya deserializada.
    pub fn from_variable(value: &Value) -> Result<Self, DomainError> {
        Self::from_keys(value, &VARIABLE_KEYS)
    }

    /// Lee la configuración inyectada en los params de un step. Los campos
    /// faltantes se reportan con el nombre de la variable externa, que es lo
    /// que el operador corrige.
    pub fn from_params(params: &Value) -> Result<Self, DomainError> {
        Self::from_keys(params, &PARAM_KEYS)
    }

    fn from_keys(value: &Value, keys: &[&str; 3]) -> Result<Self, DomainError> {
        if !value.is_object() {
            return Err(DomainError::ValidationError("cluster_details debe ser un objeto JSON".into()));
        }
        let read = |k: &str| value.get(k).and_then(Value::as_str).unwrap_or_default().to_string();
        Self::new(read(keys[0]), read(keys[1]), read(keys[2]))
    }

    /// Representación como params de step (`cluster_name`, `region`, `project_id`).
    pub fn to_params(&self) -> Value {
        json!({
            "cluster_name": self.cluster_name,
            "region": self.region,
            "project_id": self.project_id,
        })
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn fields(&self) -> [&str; 3] {
        [&self.cluster_name, &self.region, &self.project_id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_with_all_fields_is_accepted() {
        let v = json!({"CLUSTER_NAME": "hive-cluster", "REGION": "us-central1", "PROJECT_ID": "logistics-prj"});
        let cfg = RunConfiguration::from_variable(&v).unwrap();
        assert_eq!(cfg.cluster_name(), "hive-cluster");
        assert_eq!(cfg.to_params()["project_id"], "logistics-prj");
    }

    #[test]
    fn missing_and_blank_fields_are_reported_by_variable_name() {
        let v = json!({"CLUSTER_NAME": "c", "REGION": "  "});
        let err = RunConfiguration::from_variable(&v).unwrap_err();
        assert_eq!(err, DomainError::MissingFields(vec!["REGION".into(), "PROJECT_ID".into()]));
    }

    #[test]
    fn params_errors_use_variable_names() {
        let p = json!({"cluster_name": "c", "region": "r"});
        let err = RunConfiguration::from_params(&p).unwrap_err();
        assert_eq!(err, DomainError::MissingFields(vec!["PROJECT_ID".into()]));
    }

    #[test]
    fn non_object_variable_is_a_validation_error() {
        assert!(matches!(RunConfiguration::from_variable(&json!("x")), Err(DomainError::ValidationError(_))));
    }
}

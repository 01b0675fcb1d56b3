//! Contrato para inyectores de parámetros.
//!
//! Un `ParamInjector` recibe los `base` params del step y el `ExecutionContext`
//! y devuelve un `Value` que será mergeado sobre los params actuales. Así se
//! entrega la configuración de la ejecución (cluster, región, proyecto) a los
//! steps sin fijarla en la definición.

use crate::model::ExecutionContext;
use serde_json::Value;

/// Trait para inyectores de parámetros.
pub trait ParamInjector: std::fmt::Debug {
    /// Devuelve una estructura JSON que será mergeada sobre `base`.
    fn inject(&self, base: &Value, ctx: &ExecutionContext) -> Value;
}

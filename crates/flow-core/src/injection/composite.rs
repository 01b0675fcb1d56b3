//! `CompositeInjector`: aplica una secuencia de `ParamInjector` en orden y
//! devuelve los params resultantes.

use crate::model::ExecutionContext;
use serde_json::Value;

use super::merge::merge_json;
use super::param_injector::ParamInjector;

/// El orden de merge es: base -> injectors (en orden).
#[derive(Debug, Default)]
pub struct CompositeInjector {
    pub injectors: Vec<Box<dyn ParamInjector>>,
}

impl CompositeInjector {
    pub fn with_injectors(inj: Vec<Box<dyn ParamInjector>>) -> Self {
        Self { injectors: inj }
    }

    pub fn apply(&self, base: &Value, ctx: &ExecutionContext) -> Value {
        Self::apply_injectors(&self.injectors, base, ctx)
    }

    /// Versión sin ownership, usada por `FlowEngine`.
    pub fn apply_injectors(injectors: &[Box<dyn ParamInjector>], base: &Value, ctx: &ExecutionContext) -> Value {
        let mut accumulated = base.clone();
        for inj in injectors.iter() {
            let v = inj.inject(&accumulated, ctx);
            accumulated = merge_json(&accumulated, &v);
        }
        accumulated
    }
}

//! Fusión de parámetros JSON.

use serde_json::Value;

/// Merge shallow: las claves de `b` reemplazan a las de `a` cuando ambos son
/// objetos. Si alguno no es objeto, `b` tiene precedencia salvo que sea `null`.
pub fn merge_json(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            let mut out = ma.clone();
            for (k, v) in mb.iter() {
                out.insert(k.clone(), v.clone());
            }
            Value::Object(out)
        }
        (_, Value::Null) => a.clone(),
        (_, other) => other.clone(),
    }
}

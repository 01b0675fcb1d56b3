//! Inyección de parámetros determinista.

pub mod composite;
pub mod merge;
pub mod param_injector;

pub use composite::CompositeInjector;
pub use merge::merge_json;
pub use param_injector::ParamInjector;

//! Constantes del motor core.
//!
//! `ENGINE_VERSION` forma parte del input de los fingerprints: cambiarla
//! invalida los fingerprints de steps y flujos aunque la definición no cambie.

/// Versión lógica del motor. Mantener estable mientras no haya cambios
/// incompatibles en el formato de eventos o en el cálculo de fingerprints.
pub const ENGINE_VERSION: &str = "P1.0";

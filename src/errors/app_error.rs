use flow_adapters::ServiceError;
use flow_core::CoreEngineError;
use flow_domain::DomainError;
use flow_persistence::PersistenceError;
use thiserror::Error;

/// Errores de la aplicación (CLI y runner).
///
/// Un step fallido no es un `AppError`: queda en el `RunReport`. Estos
/// errores cubren configuración, arranque y el event store.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error de serialización: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Error del motor: {0}")]
    Engine(#[from] CoreEngineError),
    #[error("Error de dominio: {0}")]
    Domain(#[from] DomainError),
    #[error("Error de servicio: {0}")]
    Service(#[from] ServiceError),
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Error de telemetría: {0}")]
    Telemetry(String),
}

/// Código de salida para errores de configuración / arranque.
pub const EXIT_STARTUP_ERROR: i32 = 2;

/// Código de salida del proceso: el que devolvió el comando, o
/// `EXIT_STARTUP_ERROR` si el comando no llegó a terminar.
pub fn exit_code(outcome: &Result<i32, AppError>) -> i32 {
    match outcome {
        Ok(code) => *code,
        Err(_) => EXIT_STARTUP_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_variant_format() {
        let err = AppError::Config("mala configuración".into());
        assert_eq!(err.to_string(), "Error de configuración: mala configuración");
    }

    #[test]
    fn test_io_variant_from() {
        let io_err = std::io::Error::other("falló IO");
        let err: AppError = io_err.into();
        assert_eq!(err.to_string(), "Error en IO: falló IO");
    }

    #[test]
    fn test_domain_variant_from() {
        let err: AppError = DomainError::MissingFields(vec!["PROJECT_ID".into()]).into();
        assert!(err.to_string().contains("PROJECT_ID"));
    }

    #[test]
    fn test_invalid_settings_exit_with_startup_code() {
        let outcome = crate::Settings::from_lookup(|k| (k == "HIVEFLOW_POKE_INTERVAL_SECS").then(|| "soon".to_string()))
            .map(|_| 0);
        assert!(matches!(outcome, Err(AppError::Config(_))));
        assert_eq!(exit_code(&outcome), EXIT_STARTUP_ERROR);
        assert_eq!(exit_code(&Ok(0)), 0);
        assert_eq!(exit_code(&Ok(1)), 1);
    }
}

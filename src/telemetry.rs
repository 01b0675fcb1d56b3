//! Inicialización de logging estructurado (`tracing`).
//!
//! Filtro desde `RUST_LOG` (por defecto `info`); `LogFormat::Json` emite una
//! línea JSON por evento.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::errors::AppError;

pub fn init_telemetry(format: LogFormat) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer()
                                            .json()
                                            .with_current_span(true)
                                            .with_writer(std::io::stderr))
                                   .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().with_target(false)
                                                                            .with_writer(std::io::stderr))
                                     .try_init(),
    };
    result.map_err(|e| AppError::Telemetry(e.to_string()))?;
    tracing::debug!(?format, "telemetry initialized");
    Ok(())
}

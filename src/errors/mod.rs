pub mod app_error;

pub use app_error::{exit_code, AppError, EXIT_STARTUP_ERROR};

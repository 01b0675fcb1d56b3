//! Ubicación del estado durable y carga de `.env`.
//! `HIVEFLOW_STATE_DIR` (por defecto `.hiveflow`) contiene `events.jsonl`.

use dotenvy::dotenv;
use once_cell::sync::Lazy;

pub const STATE_DIR_VAR: &str = "HIVEFLOW_STATE_DIR";
pub const DEFAULT_STATE_DIR: &str = ".hiveflow";
pub const EVENTS_FILE: &str = "events.jsonl";

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Carga `.env` (una sola vez por proceso) antes de leer el entorno.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

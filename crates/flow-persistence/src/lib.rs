//! flow-persistence
//!
//! Backend durable del `EventStore` del core: un log JSON-lines append-only
//! bajo el directorio de estado (`HIVEFLOW_STATE_DIR`). El replay de estado
//! se hace con `InMemoryFlowRepository`, igual que con el backend en memoria.
//!
//! Módulos:
//! - `jsonl`: `JsonlEventStore`.
//! - `config`: carga de configuración desde .env.
//! - `error`: `PersistenceError`.

pub mod config;
pub mod error;
pub mod jsonl;

pub use config::init_dotenv;
pub use error::PersistenceError;
pub use jsonl::JsonlEventStore;

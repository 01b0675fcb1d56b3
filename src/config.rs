//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y expone `Settings`, cuyos
//! valores por defecto son los del DAG `batch_hive_job`.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use flow_domain::GcsUri;

use crate::errors::AppError;

pub const DEFAULT_BUCKET: &str = "logistic-bucket";
pub const DEFAULT_INPUT_PREFIX: &str = "input-delta-data/logistics_";
pub const DEFAULT_ARCHIVE_PREFIX: &str = "archive-delta-file/";
pub const DEFAULT_CLUSTER_VARIABLE: &str = "cluster_details";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Parámetros de una instalación del pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Bucket de entrada y de archivo.
    pub bucket: String,
    /// Prefijo que debe tener el archivo de entrada (sensor).
    pub input_prefix: String,
    /// "Directorio" de destino del archivado.
    pub archive_prefix: String,
    pub poke_interval: Duration,
    pub sensor_timeout: Duration,
    /// Nombre de la variable con cluster/región/proyecto.
    pub cluster_variable: String,
    pub state_dir: PathBuf,
    /// Si está presente, las variables se leen de este JSON en lugar del entorno.
    pub variables_file: Option<PathBuf>,
    pub gsutil: String,
    pub gcloud: String,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self { bucket: DEFAULT_BUCKET.to_string(),
               input_prefix: DEFAULT_INPUT_PREFIX.to_string(),
               archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
               poke_interval: Duration::from_secs(30),
               sensor_timeout: Duration::from_secs(300),
               cluster_variable: DEFAULT_CLUSTER_VARIABLE.to_string(),
               state_dir: PathBuf::from(flow_persistence::config::DEFAULT_STATE_DIR),
               variables_file: None,
               gsutil: "gsutil".to_string(),
               gcloud: "gcloud".to_string(),
               log_format: LogFormat::Pretty }
    }
}

impl Settings {
    /// Lee `HIVEFLOW_*` del entorno (previo `.env`).
    pub fn from_env() -> Result<Self, AppError> {
        flow_persistence::init_dotenv();
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Igual que `from_env` pero con una función de lookup arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
        where F: Fn(&str) -> Option<String>
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let secs = |k: &str, default: Duration| -> Result<Duration, AppError> {
            match get(k) {
                Some(v) => v.parse::<u64>()
                            .map(Duration::from_secs)
                            .map_err(|_| AppError::Config(format!("{k} debe ser un entero de segundos, no '{v}'"))),
                None => Ok(default),
            }
        };

        let d = Settings::default();
        let log_format = match get("HIVEFLOW_LOG_FORMAT").as_deref() {
            None | Some("pretty") | Some("text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(AppError::Config(format!("HIVEFLOW_LOG_FORMAT desconocido: '{other}'"))),
        };
        let settings = Self { bucket: get("HIVEFLOW_BUCKET").unwrap_or(d.bucket),
                              input_prefix: get("HIVEFLOW_INPUT_PREFIX").unwrap_or(d.input_prefix),
                              archive_prefix: get("HIVEFLOW_ARCHIVE_PREFIX").unwrap_or(d.archive_prefix),
                              poke_interval: secs("HIVEFLOW_POKE_INTERVAL_SECS", d.poke_interval)?,
                              sensor_timeout: secs("HIVEFLOW_SENSOR_TIMEOUT_SECS", d.sensor_timeout)?,
                              cluster_variable: get("HIVEFLOW_CLUSTER_VARIABLE").unwrap_or(d.cluster_variable),
                              state_dir: get(flow_persistence::config::STATE_DIR_VAR).map(PathBuf::from)
                                                                                      .unwrap_or(d.state_dir),
                              variables_file: get("HIVEFLOW_VARIABLES_FILE").map(PathBuf::from),
                              gsutil: get("HIVEFLOW_GSUTIL").unwrap_or(d.gsutil),
                              gcloud: get("HIVEFLOW_GCLOUD").unwrap_or(d.gcloud),
                              log_format };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.poke_interval.is_zero() {
            return Err(AppError::Config("el intervalo de poke debe ser mayor a 0".into()));
        }
        self.input_dir()?;
        self.archive_dir()?;
        Ok(())
    }

    /// Directorio de los archivos de entrada (ubicación de la tabla staging).
    pub fn input_dir(&self) -> Result<GcsUri, AppError> {
        Ok(GcsUri::new(self.bucket.clone(), self.input_prefix.clone())?.parent_dir())
    }

    /// Patrón de los archivos a archivar: `<input_prefix>*.csv`.
    pub fn input_pattern(&self) -> Result<GcsUri, AppError> {
        Ok(GcsUri::new(self.bucket.clone(), format!("{}*.csv", self.input_prefix))?)
    }

    pub fn archive_dir(&self) -> Result<GcsUri, AppError> {
        let mut prefix = self.archive_prefix.clone();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Ok(GcsUri::new(self.bucket.clone(), prefix)?)
    }
}

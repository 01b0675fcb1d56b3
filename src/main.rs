//! CLI de hiveflow.
//!
//! `hiveflow run` ejecuta el DAG para una fecha lógica y sale con 0 (éxito),
//! 1 (el run falló en un step) o 2 (error de configuración / arranque).
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use flow_adapters::{EnvVariableStore, JsonFileVariableStore, RunConfigInjector, VariableStore};
use flow_core::{EventStore, InMemoryEventStore};
use flow_domain::RunConfiguration;
use flow_persistence::JsonlEventStore;
use hiveflow::errors::{exit_code, AppError};
use hiveflow::telemetry::init_telemetry;
use hiveflow::workflow::{build_definition, cli_services, dry_run_services, plan, resolve_run_config, DagSpec,
                         PipelineRunner, RunLedger, RunReport, Services};
use hiveflow::Settings;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "hiveflow", version, about = "Carga diaria de logística en Hive sobre Dataproc")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ejecuta un run del DAG.
    Run {
        /// Fecha lógica (YYYY-MM-DD). Por defecto, la última fecha vencida.
        #[arg(long)]
        logical_date: Option<NaiveDate>,
        /// Usa servicios en memoria; no toca GCS ni Dataproc.
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        state_dir: Option<PathBuf>,
        /// JSON con las variables (`cluster_details`, ...).
        #[arg(long)]
        variables_file: Option<PathBuf>,
    },
    /// Imprime la definición del DAG como JSON.
    Plan,
    /// Lista los runs registrados o los eventos de uno.
    History {
        #[arg(long)]
        flow: Option<Uuid>,
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
    /// Lista las fechas lógicas vencidas hasta `--until`.
    Schedule {
        #[arg(long)]
        until: NaiveDate,
    },
}

fn main() {
    let cli = Cli::parse();
    let outcome = load_settings().and_then(|settings| dispatch(cli.command, settings));
    if let Err(e) = &outcome {
        error!(error = %e, "startup failed");
        eprintln!("{e}");
    }
    std::process::exit(exit_code(&outcome));
}

fn load_settings() -> Result<Settings, AppError> {
    let settings = Settings::from_env()?;
    init_telemetry(settings.log_format)?;
    Ok(settings)
}

fn dispatch(command: Command, mut settings: Settings) -> Result<i32, AppError> {
    match command {
        Command::Run { logical_date,
                       dry_run,
                       state_dir,
                       variables_file, } => {
            if let Some(dir) = state_dir {
                settings.state_dir = dir;
            }
            if variables_file.is_some() {
                settings.variables_file = variables_file;
            }
            let logical_date = match logical_date {
                Some(d) => d,
                None => latest_due_date()?,
            };
            run(&settings, logical_date, dry_run)
        }
        Command::Plan => {
            let services = dry_run_services(&settings, DagSpec::batch_hive_job().schedule.start).services;
            let definition = build_definition(&settings, &services)?;
            let dag_plan = plan(&DagSpec::batch_hive_job(), &definition);
            println!("{}", serde_json::to_string_pretty(&dag_plan)?);
            Ok(0)
        }
        Command::History { flow, state_dir } => {
            let dir = state_dir.unwrap_or(settings.state_dir);
            match flow {
                Some(flow_id) => {
                    let store = JsonlEventStore::open_in_dir(&dir)?;
                    let events = store.list(flow_id)?;
                    if events.is_empty() {
                        return Err(AppError::Config(format!("flow no encontrado: {flow_id}")));
                    }
                    println!("{}", serde_json::to_string_pretty(&events)?);
                }
                None => {
                    for report in RunLedger::in_dir(&dir).load()? {
                        println!("{}", serde_json::to_string(&report)?);
                    }
                }
            }
            Ok(0)
        }
        Command::Schedule { until } => {
            for date in DagSpec::batch_hive_job().schedule.logical_dates_until(until) {
                println!("{date}");
            }
            Ok(0)
        }
    }
}

fn latest_due_date() -> Result<NaiveDate, AppError> {
    let today = Utc::now().date_naive();
    DagSpec::batch_hive_job().schedule
                             .logical_dates_until(today)
                             .last()
                             .copied()
                             .ok_or_else(|| AppError::Config(format!("no hay fechas lógicas vencidas al {today}")))
}

fn variable_store(settings: &Settings) -> Box<dyn VariableStore> {
    match &settings.variables_file {
        Some(path) => Box::new(JsonFileVariableStore::new(path.clone())),
        None => Box::new(EnvVariableStore::default()),
    }
}

fn run(settings: &Settings, logical_date: NaiveDate, dry_run: bool) -> Result<i32, AppError> {
    let store = variable_store(settings);
    let mut injector = resolve_run_config(store.as_ref(), &settings.cluster_variable)?;

    let report = if dry_run {
        if !injector.is_complete() {
            info!("dry run without a complete run configuration, using a sample one");
            injector = RunConfigInjector::new(&RunConfiguration::new("dry-run-cluster", "us-central1", "dry-run-project")?);
        }
        let services = dry_run_services(settings, logical_date).services;
        execute(InMemoryEventStore::default(), settings, &services, injector, logical_date)?
    } else {
        let events = JsonlEventStore::open_in_dir(&settings.state_dir)?;
        let report = execute(events, settings, &cli_services(settings), injector, logical_date)?;
        RunLedger::in_dir(&settings.state_dir).append(&report)?;
        report
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.exit_code())
}

fn execute<E: EventStore>(events: E,
                          settings: &Settings,
                          services: &Services,
                          injector: RunConfigInjector,
                          logical_date: NaiveDate)
                          -> Result<RunReport, AppError> {
    let definition = build_definition(settings, services)?;
    let mut runner = PipelineRunner::new(events, definition, injector);
    runner.run(logical_date)
}

//! Implementaciones en memoria de los servicios externos.
//!
//! Se usan en los tests y en `hiveflow run --dry-run`. `FakeHiveWarehouse`
//! interpreta el subconjunto de HiveQL que emite el pipeline (CREATE
//! DATABASE / CREATE TABLE / SET / INSERT ... SELECT) y lee las tablas
//! externas directamente desde un `InMemoryObjectStore`.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use flow_domain::{split_statements, GcsUri};
use tracing::debug;

use crate::command::{render_command, CommandOutput, CommandRunner};
use crate::services::{HiveJobRequest, HiveJobSubmitter, JobOutcome, JobState, MovedObject, ObjectInfo, ObjectStore};
use crate::ServiceError;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct DelayedObject {
    bucket: String,
    name: String,
    contents: String,
    visible_from_listing: usize,
}

#[derive(Debug, Default)]
struct ObjectState {
    objects: BTreeMap<(String, String), String>,
    delayed: Vec<DelayedObject>,
    listings: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    state: Mutex<ObjectState>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_object(&self, bucket: &str, name: &str, contents: &str) {
        lock(&self.state).objects
                         .insert((bucket.to_string(), name.to_string()), contents.to_string());
    }

    /// El objeto aparece a partir del listado número `listing` (1 = el
    /// primero). Sirve para simular un archivo que llega durante el sensor.
    pub fn put_object_after(&self, bucket: &str, name: &str, contents: &str, listing: usize) {
        lock(&self.state).delayed.push(DelayedObject { bucket: bucket.to_string(),
                                                       name: name.to_string(),
                                                       contents: contents.to_string(),
                                                       visible_from_listing: listing });
    }

    pub fn object_names(&self, bucket: &str) -> Vec<String> {
        lock(&self.state).objects
                         .keys()
                         .filter(|(b, _)| b == bucket)
                         .map(|(_, n)| n.clone())
                         .collect()
    }

    pub fn read(&self, bucket: &str, name: &str) -> Option<String> {
        lock(&self.state).objects.get(&(bucket.to_string(), name.to_string())).cloned()
    }

    /// Archivos directamente bajo el "directorio" `dir` (sin recursión).
    pub fn files_in(&self, dir: &GcsUri) -> Vec<(String, String)> {
        let prefix = dir.object();
        lock(&self.state).objects
                         .iter()
                         .filter(|((b, n), _)| {
                             b == dir.bucket()
                             && n.starts_with(prefix)
                             && !n[prefix.len()..].is_empty()
                             && !n[prefix.len()..].contains('/')
                         })
                         .map(|((_, n), c)| (n.clone(), c.clone()))
                         .collect()
    }

    pub fn listings(&self) -> usize {
        lock(&self.state).listings
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn list_with_prefix(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>, ServiceError> {
        let mut st = lock(&self.state);
        st.listings += 1;
        let now = st.listings;
        let (ready, pending): (Vec<DelayedObject>, Vec<DelayedObject>) =
            std::mem::take(&mut st.delayed).into_iter().partition(|d| d.visible_from_listing <= now);
        st.delayed = pending;
        for d in ready {
            st.objects.insert((d.bucket, d.name), d.contents);
        }
        Ok(st.objects
             .keys()
             .filter(|(b, n)| b == bucket && n.starts_with(prefix))
             .map(|(b, n)| ObjectInfo { bucket: b.clone(),
                                        name: n.clone() })
             .collect())
    }

    fn move_matching(&self, pattern: &GcsUri, destination: &GcsUri) -> Result<Vec<MovedObject>, ServiceError> {
        let mut st = lock(&self.state);
        let matched: Vec<(String, String)> = st.objects
                                               .keys()
                                               .filter(|(b, n)| pattern.matches(b, n))
                                               .cloned()
                                               .collect();
        if matched.is_empty() {
            return Err(ServiceError::NoMatches(pattern.to_string()));
        }
        let mut moved = Vec::with_capacity(matched.len());
        for (bucket, name) in matched {
            let base = name.rsplit('/').next().unwrap_or(&name).to_string();
            let target = destination.join(&base);
            if let Some(contents) = st.objects.remove(&(bucket.clone(), name.clone())) {
                st.objects
                  .insert((target.bucket().to_string(), target.object().to_string()), contents);
            }
            moved.push(MovedObject { from: format!("gs://{bucket}/{name}"),
                                     to: target.to_string() });
        }
        Ok(moved)
    }
}

// ---------------------------------------------------------------------------
// Command runner
// ---------------------------------------------------------------------------

/// Runner con respuestas encoladas; sin respuesta encolada devuelve éxito
/// con salida vacía. Registra cada invocación como línea de comando.
#[derive(Debug, Default)]
pub struct ScriptedCommandRunner {
    responses: Mutex<VecDeque<CommandOutput>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, status_code: i32, stdout: &str, stderr: &str) {
        lock(&self.responses).push_back(CommandOutput { status_code,
                                                        stdout: stdout.to_string(),
                                                        stderr: stderr.to_string() });
    }

    pub fn push_ok(&self, stdout: &str) {
        self.push(0, stdout, "");
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

impl CommandRunner for ScriptedCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ServiceError> {
        lock(&self.calls).push(render_command(program, args));
        Ok(lock(&self.responses).pop_front().unwrap_or(CommandOutput { status_code: 0,
                                                                        stdout: String::new(),
                                                                        stderr: String::new() }))
    }
}

// ---------------------------------------------------------------------------
// Job submitters
// ---------------------------------------------------------------------------

/// Acepta todo y registra los requests. `fail_step` hace que los jobs de ese
/// step terminen en `JobState::Error`.
#[derive(Debug, Default)]
pub struct RecordingJobSubmitter {
    requests: Mutex<Vec<HiveJobRequest>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingJobSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_step(&self, step_id: &str) {
        lock(&self.failing).insert(step_id.to_string());
    }

    pub fn requests(&self) -> Vec<HiveJobRequest> {
        lock(&self.requests).clone()
    }
}

impl HiveJobSubmitter for RecordingJobSubmitter {
    fn submit_and_wait(&self, request: &HiveJobRequest) -> Result<JobOutcome, ServiceError> {
        let mut reqs = lock(&self.requests);
        reqs.push(request.clone());
        let job_id = format!("job-{}", reqs.len());
        let state = if lock(&self.failing).contains(&request.step_id) {
            JobState::Error
        } else {
            JobState::Done
        };
        Ok(JobOutcome { job_id,
                        state,
                        details: None })
    }
}

/// Tabla del warehouse simulado. Las externas con `location` leen sus filas
/// del object store en cada consulta; el resto guarda las filas insertadas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeTable {
    pub columns: Vec<String>,
    pub partition: Option<String>,
    pub location: Option<GcsUri>,
    pub delimiter: char,
    pub skip_header: usize,
    rows: Vec<Vec<String>>,
}

impl FakeTable {
    /// Columnas en el orden físico de las filas (partición al final).
    pub fn all_columns(&self) -> Vec<String> {
        let mut cols = self.columns.clone();
        cols.extend(self.partition.iter().cloned());
        cols
    }
}

#[derive(Debug, Default)]
struct HiveState {
    databases: BTreeSet<String>,
    tables: BTreeMap<String, FakeTable>,
    submissions: Vec<HiveJobRequest>,
    failing: HashSet<String>,
}

pub struct FakeHiveWarehouse {
    storage: Arc<InMemoryObjectStore>,
    state: Mutex<HiveState>,
}

impl std::fmt::Debug for FakeHiveWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = lock(&self.state);
        f.debug_struct("FakeHiveWarehouse")
         .field("databases", &st.databases)
         .field("tables", &st.tables.keys().collect::<Vec<_>>())
         .finish()
    }
}

fn strip_ticks(s: &str) -> String {
    s.trim().trim_matches('`').to_string()
}

/// Primer token después de `keyword` (en `upper`), leído de `stmt`.
fn token_after(stmt: &str, upper: &str, keyword: &str) -> Option<String> {
    let at = upper.find(keyword)? + keyword.len();
    let rest = stmt[at..].trim_start();
    let end = rest.find(|c: char| c.is_whitespace() || c == '(' || c == ';').unwrap_or(rest.len());
    let tok = strip_ticks(&rest[..end]);
    (!tok.is_empty()).then_some(tok)
}

/// Contenido del primer paréntesis balanceado a partir de `from`.
fn paren_block(stmt: &str, from: usize) -> Option<&str> {
    let open = from + stmt[from..].find('(')?;
    let mut depth = 0usize;
    for (i, c) in stmt[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&stmt[open + 1..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn column_names(block: &str) -> Vec<String> {
    block.split(',')
         .filter_map(|def| def.split_whitespace().next().map(strip_ticks))
         .collect()
}

fn quoted_after<'a>(stmt: &'a str, upper: &str, keyword: &str) -> Option<&'a str> {
    let at = upper.find(keyword)? + keyword.len();
    let rest = &stmt[at..];
    let open = rest.find('\'')?;
    let close = open + 1 + rest[open + 1..].find('\'')?;
    Some(&rest[open + 1..close])
}

impl FakeHiveWarehouse {
    pub fn new(storage: Arc<InMemoryObjectStore>) -> Self {
        Self { storage,
               state: Mutex::new(HiveState::default()) }
    }

    pub fn fail_step(&self, step_id: &str) {
        lock(&self.state).failing.insert(step_id.to_string());
    }

    pub fn databases(&self) -> Vec<String> {
        lock(&self.state).databases.iter().cloned().collect()
    }

    pub fn table_names(&self) -> Vec<String> {
        lock(&self.state).tables.keys().cloned().collect()
    }

    pub fn table(&self, name: &str) -> Option<FakeTable> {
        lock(&self.state).tables.get(name).cloned()
    }

    pub fn submissions(&self) -> Vec<HiveJobRequest> {
        lock(&self.state).submissions.clone()
    }

    /// Filas de una tabla como mapas columna → valor.
    pub fn rows(&self, name: &str) -> Result<Vec<BTreeMap<String, String>>, ServiceError> {
        let table = self.table(name)
                        .ok_or_else(|| ServiceError::Hive(format!("Table not found: {name}")))?;
        let cols = table.all_columns();
        Ok(self.physical_rows(&table)
               .into_iter()
               .map(|r| cols.iter().cloned().zip(r).collect())
               .collect())
    }

    fn physical_rows(&self, table: &FakeTable) -> Vec<Vec<String>> {
        let Some(location) = &table.location else {
            return table.rows.clone();
        };
        let width = table.all_columns().len();
        let mut rows = Vec::new();
        for (_, contents) in self.storage.files_in(location) {
            for line in contents.lines().skip(table.skip_header) {
                if line.trim().is_empty() {
                    continue;
                }
                let mut row: Vec<String> = line.split(table.delimiter).map(|v| v.trim().to_string()).collect();
                row.resize(width, String::new());
                rows.push(row);
            }
        }
        rows
    }

    fn execute(&self, st: &mut HiveState, stmt: &str, session: &mut HashMap<String, String>) -> Result<(), String> {
        let upper = stmt.to_ascii_uppercase();
        let normalized = upper.split_whitespace().collect::<Vec<_>>().join(" ");
        let if_not_exists = normalized.contains("IF NOT EXISTS");

        if normalized.starts_with("SET ") {
            let (k, v) = stmt[3..].split_once('=').ok_or_else(|| format!("malformed SET: {stmt}"))?;
            session.insert(k.trim().to_string(), v.trim().to_string());
            return Ok(());
        }

        if normalized.starts_with("CREATE DATABASE") {
            let kw = if if_not_exists { "EXISTS" } else { "DATABASE" };
            let name = token_after(stmt, &upper, kw).ok_or("missing database name")?;
            if !st.databases.insert(name.clone()) && !if_not_exists {
                return Err(format!("Database {name} already exists"));
            }
            return Ok(());
        }

        if normalized.starts_with("CREATE EXTERNAL TABLE") || normalized.starts_with("CREATE TABLE") {
            let kw = if if_not_exists { "EXISTS" } else { "TABLE" };
            let name = token_after(stmt, &upper, kw).ok_or("missing table name")?;
            let db = name.split_once('.').map(|(d, _)| d.to_string()).unwrap_or_else(|| "default".into());
            if db != "default" && !st.databases.contains(&db) {
                return Err(format!("Database does not exist: {db}"));
            }
            if st.tables.contains_key(&name) {
                return if if_not_exists { Ok(()) } else { Err(format!("Table {name} already exists")) };
            }
            let name_at = upper.find(&name.to_ascii_uppercase()).unwrap_or(0);
            let columns = column_names(paren_block(stmt, name_at).ok_or("missing column list")?);
            let partition = match upper.find("PARTITIONED BY") {
                Some(at) => column_names(paren_block(stmt, at).ok_or("malformed PARTITIONED BY")?).into_iter().next(),
                None => None,
            };
            let location = match quoted_after(stmt, &upper, "LOCATION") {
                Some(uri) => Some(uri.parse::<GcsUri>().map_err(|e| e.to_string())?),
                None => None,
            };
            let delimiter = quoted_after(stmt, &upper, "TERMINATED BY").and_then(|d| d.chars().next())
                                                                         .unwrap_or('\u{1}');
            let skip_header = stmt.find("'skip.header.line.count'")
                                  .and_then(|at| quoted_after(&stmt[at + 24..], &upper[at + 24..], "="))
                                  .and_then(|n| n.parse().ok())
                                  .unwrap_or(0);
            st.tables.insert(name,
                             FakeTable { columns,
                                         partition,
                                         location,
                                         delimiter,
                                         skip_header,
                                         rows: Vec::new() });
            return Ok(());
        }

        if normalized.starts_with("INSERT INTO") {
            let target_name = token_after(stmt, &upper, "INTO").ok_or("missing target table")?;
            let source_name = token_after(stmt, &upper, " FROM ").ok_or("missing source table")?;
            let target = st.tables
                           .get(&target_name)
                           .cloned()
                           .ok_or_else(|| format!("Table not found: {target_name}"))?;
            let source = st.tables
                           .get(&source_name)
                           .cloned()
                           .ok_or_else(|| format!("Table not found: {source_name}"))?;
            if target.partition.is_some() {
                let dynamic = session.get("hive.exec.dynamic.partition").map(String::as_str) == Some("true");
                let nonstrict = session.get("hive.exec.dynamic.partition.mode").map(String::as_str) == Some("nonstrict");
                if !dynamic || !nonstrict {
                    return Err("Dynamic partition strict mode requires at least one static partition column".into());
                }
            }
            let select_at = upper.find("SELECT").ok_or("missing SELECT")? + "SELECT".len();
            let from_at = upper.find(" FROM ").ok_or("missing FROM")?;
            let select: Vec<String> = stmt[select_at..from_at].split(',').map(strip_ticks).collect();
            if select.len() != target.all_columns().len() {
                return Err(format!("Cannot insert into {target_name}: {} columns selected, {} expected",
                                   select.len(),
                                   target.all_columns().len()));
            }
            let source_cols = source.all_columns();
            let idx: Vec<usize> = select.iter()
                                        .map(|c| {
                                            source_cols.iter()
                                                       .position(|s| s.eq_ignore_ascii_case(c))
                                                       .ok_or_else(|| format!("Invalid column reference '{c}'"))
                                        })
                                        .collect::<Result<_, _>>()?;
            let new_rows: Vec<Vec<String>> = self.physical_rows(&source)
                                                 .into_iter()
                                                 .map(|r| idx.iter().map(|i| r[*i].clone()).collect())
                                                 .collect();
            debug!(target = %target_name, rows = new_rows.len(), "fake hive insert");
            if let Some(t) = st.tables.get_mut(&target_name) {
                t.rows.extend(new_rows);
            }
            return Ok(());
        }

        Err(format!("unsupported statement: {stmt}"))
    }
}

impl HiveJobSubmitter for FakeHiveWarehouse {
    fn submit_and_wait(&self, request: &HiveJobRequest) -> Result<JobOutcome, ServiceError> {
        let mut st = lock(&self.state);
        st.submissions.push(request.clone());
        let job_id = format!("fake-{}", st.submissions.len());
        if st.failing.contains(&request.step_id) {
            return Ok(JobOutcome { job_id,
                                   state: JobState::Error,
                                   details: Some("injected failure".into()) });
        }
        // Los SET valen sólo dentro del job, como en una sesión de Hive.
        let mut session = HashMap::new();
        for stmt in split_statements(&request.query) {
            if let Err(details) = self.execute(&mut st, &stmt, &mut session) {
                return Ok(JobOutcome { job_id,
                                       state: JobState::Error,
                                       details: Some(details) });
            }
        }
        Ok(JobOutcome { job_id,
                        state: JobState::Done,
                        details: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_domain::{LogisticsWarehouse, RunConfiguration};

    fn req(step: &str, query: String) -> HiveJobRequest {
        HiveJobRequest { step_id: step.into(),
                         query,
                         target: RunConfiguration::new("c", "r", "p").unwrap() }
    }

    fn setup() -> (Arc<InMemoryObjectStore>, FakeHiveWarehouse, LogisticsWarehouse) {
        let store = Arc::new(InMemoryObjectStore::new());
        let hive = FakeHiveWarehouse::new(store.clone());
        let schema = LogisticsWarehouse::logistics("gs://lb/in/".parse().unwrap());
        (store, hive, schema)
    }

    #[test]
    fn staging_table_reads_csv_skipping_header() {
        let (store, hive, schema) = setup();
        store.put_object("lb",
                         "in/logistics_1.csv",
                         "delivery_id,date,origin_state,destination_state,delivery_status,delivery_time\n1,2023-09-01,CA,NY,Delivered,2h\n");
        for q in [schema.create_database_sql(), schema.create_staging_table_sql()] {
            assert_eq!(hive.submit_and_wait(&req("s", q)).unwrap().state, JobState::Done);
        }
        let rows = hive.rows("logistics_db.logistics_data").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["date"], "2023-09-01");
        assert_eq!(rows[0]["delivery_status"], "Delivered");
    }

    #[test]
    fn table_without_database_fails() {
        let (_, hive, schema) = setup();
        let out = hive.submit_and_wait(&req("s", schema.create_staging_table_sql())).unwrap();
        assert_eq!(out.state, JobState::Error);
        assert!(out.details.unwrap().contains("Database does not exist"));
    }

    #[test]
    fn insert_without_nonstrict_mode_is_rejected() {
        let (_, hive, schema) = setup();
        for q in [schema.create_database_sql(), schema.create_staging_table_sql(), schema.create_partitioned_table_sql()] {
            hive.submit_and_wait(&req("s", q)).unwrap();
        }
        let insert_only = split_statements(&schema.load_partitioned_sql()).pop().unwrap();
        let out = hive.submit_and_wait(&req("load", insert_only)).unwrap();
        assert_eq!(out.state, JobState::Error);
    }

    #[test]
    fn delayed_object_shows_up_on_later_listing() {
        let store = InMemoryObjectStore::new();
        store.put_object_after("b", "p/x", "", 2);
        assert!(store.list_with_prefix("b", "p/").unwrap().is_empty());
        assert_eq!(store.list_with_prefix("b", "p/").unwrap().len(), 1);
        assert_eq!(store.listings(), 2);
    }
}

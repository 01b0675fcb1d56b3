// warehouse.rs
//! Esquema del warehouse de logística y el HiveQL que lo crea y carga.
//!
//! Las sentencias son idempotentes a nivel de esquema (`IF NOT EXISTS`); la
//! carga particionada (`INSERT INTO`) no lo es y se re-ejecuta en cada run.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::GcsUri;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HiveType {
    Int,
    String,
}

impl fmt::Display for HiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HiveType::Int => f.write_str("INT"),
            HiveType::String => f.write_str("STRING"),
        }
    }
}

/// Palabras reservadas de HiveQL que aparecen como nombres de columna.
const RESERVED: &[&str] = &["date", "timestamp", "user", "location", "order"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: HiveType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: HiveType) -> Self {
        Self { name: name.into(), ty }
    }

    /// Nombre listo para SQL; las reservadas van entre backticks.
    pub fn quoted(&self) -> String {
        if RESERVED.contains(&self.name.to_ascii_lowercase().as_str()) {
            format!("`{}`", self.name)
        } else {
            self.name.clone()
        }
    }

    fn ddl(&self) -> String {
        format!("{} {}", self.quoted(), self.ty)
    }
}

/// Tabla externa sobre archivos delimitados (la que lee los CSV de entrada).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub location: GcsUri,
    pub field_delimiter: char,
    pub skip_header_lines: u32,
}

/// Tabla destino, particionada por una columna.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionedTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub partition: Column,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsWarehouse {
    pub database: String,
    pub staging: StagingTable,
    pub partitioned: PartitionedTable,
}

fn column_block(columns: &[Column]) -> String {
    columns.iter()
           .map(|c| format!("    {}", c.ddl()))
           .collect::<Vec<_>>()
           .join(",\n")
}

impl LogisticsWarehouse {
    /// Esquema `logistics_db`: staging sobre `location` y la tabla
    /// particionada por `date`.
    pub fn logistics(location: GcsUri) -> Self {
        let data_columns = vec![Column::new("delivery_id", HiveType::Int),
                                Column::new("origin_state", HiveType::String),
                                Column::new("destination_state", HiveType::String),
                                Column::new("delivery_status", HiveType::String),
                                Column::new("delivery_time", HiveType::String)];
        let date = Column::new("date", HiveType::String);

        let mut staging_columns = data_columns.clone();
        staging_columns.insert(1, date.clone());

        Self { database: "logistics_db".to_string(),
               staging: StagingTable { name: "logistics_data".to_string(),
                                       columns: staging_columns,
                                       location,
                                       field_delimiter: ',',
                                       skip_header_lines: 1 },
               partitioned: PartitionedTable { name: "logistics_data_partitioned".to_string(),
                                               columns: data_columns,
                                               partition: date } }
    }

    pub fn staging_fqn(&self) -> String {
        format!("{}.{}", self.database, self.staging.name)
    }

    pub fn partitioned_fqn(&self) -> String {
        format!("{}.{}", self.database, self.partitioned.name)
    }

    pub fn create_database_sql(&self) -> String {
        format!("CREATE DATABASE IF NOT EXISTS {};", self.database)
    }

    pub fn create_staging_table_sql(&self) -> String {
        let t = &self.staging;
        format!("CREATE EXTERNAL TABLE IF NOT EXISTS {} (\n{}\n)\nROW FORMAT DELIMITED\nFIELDS TERMINATED BY \
                 '{}'\nSTORED AS TEXTFILE\nLOCATION '{}'\ntblproperties('skip.header.line.count'='{}');",
                self.staging_fqn(),
                column_block(&t.columns),
                t.field_delimiter,
                t.location,
                t.skip_header_lines)
    }

    pub fn create_partitioned_table_sql(&self) -> String {
        let t = &self.partitioned;
        format!("CREATE EXTERNAL TABLE IF NOT EXISTS {} (\n{}\n)\nPARTITIONED BY ({})\nSTORED AS TEXTFILE;",
                self.partitioned_fqn(),
                column_block(&t.columns),
                t.partition.ddl())
    }

    /// Habilita particionado dinámico y copia staging → particionada. La
    /// columna de partición va última en el SELECT, como exige Hive.
    pub fn load_partitioned_sql(&self) -> String {
        let mut select: Vec<String> = self.partitioned.columns.iter().map(Column::quoted).collect();
        select.push(self.partitioned.partition.quoted());
        format!("SET hive.exec.dynamic.partition = true;\nSET hive.exec.dynamic.partition.mode = nonstrict;\n\nINSERT \
                 INTO {}\nSELECT {} FROM {};",
                self.partitioned_fqn(),
                select.join(", "),
                self.staging_fqn())
    }
}

/// Separa un script HiveQL en sentencias (`;` fuera de comillas), sin vacías.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in script.chars() {
        match (quote, c) {
            (None, '\'' | '"' | '`') => {
                quote = Some(c);
                current.push(c);
            }
            (Some(q), _) if q == c => {
                quote = None;
                current.push(c);
            }
            (None, ';') => {
                let stmt = current.trim();
                if !stmt.is_empty() {
                    out.push(stmt.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let tail = current.trim();
    if !tail.is_empty() {
        out.push(tail.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse() -> LogisticsWarehouse {
        LogisticsWarehouse::logistics("gs://logistic-bucket/input-delta-data/".parse().unwrap())
    }

    #[test]
    fn staging_ddl_matches_expected_shape() {
        let sql = warehouse().create_staging_table_sql();
        assert!(sql.starts_with("CREATE EXTERNAL TABLE IF NOT EXISTS logistics_db.logistics_data ("));
        assert!(sql.contains("    delivery_id INT,\n    `date` STRING,\n    origin_state STRING"));
        assert!(sql.contains("FIELDS TERMINATED BY ','"));
        assert!(sql.contains("LOCATION 'gs://logistic-bucket/input-delta-data/'"));
        assert!(sql.ends_with("tblproperties('skip.header.line.count'='1');"));
    }

    #[test]
    fn partitioned_table_drops_partition_column_from_body() {
        let w = warehouse();
        let sql = w.create_partitioned_table_sql();
        assert!(sql.contains("PARTITIONED BY (`date` STRING)"));
        assert!(!sql.contains("    `date`"));
        assert_eq!(w.partitioned.columns.len() + 1, w.staging.columns.len());
    }

    #[test]
    fn load_selects_partition_column_last() {
        let sql = warehouse().load_partitioned_sql();
        assert!(sql.contains("SET hive.exec.dynamic.partition.mode = nonstrict;"));
        assert!(sql.contains("SELECT delivery_id, origin_state, destination_state, delivery_status, delivery_time, \
                              `date` FROM logistics_db.logistics_data;"));
    }

    #[test]
    fn split_respects_quotes() {
        let parts = split_statements("SET a = 1; SELECT ';' FROM t;\n\n");
        assert_eq!(parts, vec!["SET a = 1".to_string(), "SELECT ';' FROM t".to_string()]);
    }
}

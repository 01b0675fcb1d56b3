use chrono::NaiveDate;
use flow_domain::{split_statements, GcsUri, LogisticsWarehouse, RunConfiguration, Schedule};
use serde_json::json;

#[test]
fn test_cluster_details_variable_to_params_and_back() {
    let variable = json!({"CLUSTER_NAME": "hive-cluster", "REGION": "us-central1", "PROJECT_ID": "prj"});
    let cfg = RunConfiguration::from_variable(&variable).unwrap();
    let params = cfg.to_params();
    let again = RunConfiguration::from_params(&params).unwrap();
    assert_eq!(cfg, again);
    // La serialización conserva los nombres de la variable externa.
    assert_eq!(serde_json::to_value(&cfg).unwrap(), variable);
}

#[test]
fn test_every_statement_of_the_load_script_is_separate() {
    let w = LogisticsWarehouse::logistics("gs://logistic-bucket/input-delta-data/".parse().unwrap());
    let stmts = split_statements(&w.load_partitioned_sql());
    assert_eq!(stmts.len(), 3);
    assert!(stmts[0].starts_with("SET hive.exec.dynamic.partition = true"));
    assert!(stmts[2].starts_with("INSERT INTO logistics_db.logistics_data_partitioned"));
}

#[test]
fn test_schema_statements_are_guarded_by_if_not_exists() {
    let w = LogisticsWarehouse::logistics("gs://logistic-bucket/input-delta-data/".parse().unwrap());
    for sql in [w.create_database_sql(), w.create_staging_table_sql(), w.create_partitioned_table_sql()] {
        assert!(sql.contains("IF NOT EXISTS"), "{sql}");
        assert_eq!(split_statements(&sql).len(), 1);
    }
}

#[test]
fn test_archive_pattern_matches_only_csv_inputs() {
    let pattern: GcsUri = "gs://logistic-bucket/input-delta-data/logistics_*.csv".parse().unwrap();
    assert!(pattern.matches("logistic-bucket", "input-delta-data/logistics_2023-09-01.csv"));
    assert!(!pattern.matches("other-bucket", "input-delta-data/logistics_2023-09-01.csv"));
    assert!(!pattern.matches("logistic-bucket", "archive-delta-file/logistics_2023-09-01.csv"));
}

#[test]
fn test_daily_schedule_from_first_logical_date() {
    let start = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap();
    let s = Schedule::daily(start);
    let due = s.logical_dates_until(NaiveDate::from_ymd_opt(2023, 9, 11).unwrap());
    assert_eq!(due.len(), 10);
    assert_eq!(due.first(), Some(&start));
    assert_eq!(due.last(), NaiveDate::from_ymd_opt(2023, 9, 10).as_ref());
}

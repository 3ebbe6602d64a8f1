use std::fs;
use std::path::PathBuf;

use serde_json::json;
use uuid::Uuid;

use datasmith_core::{Schema, Value, normalize_schema};
use datasmith_eval::{Check, EvalError, VALIDATION_JSON, build_dataset, validate_run};
use datasmith_generate::{ExportFormat, GenerationOptions};

fn temp_out_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("datasmith_{label}_{}", Uuid::new_v4()))
}

fn shop_schema(mode: &str) -> Schema {
    let raw = json!({
        "dataset": {
            "name": "shop",
            "seed": 7,
            "mode": mode,
            "max_attempts": 1,
            "size": { "customers": 6, "orders": 40 }
        },
        "tables": {
            "customers": {
                "primary_key": "id",
                "columns": {
                    "id": { "type": "int", "range": [1, 100000] },
                    "email": { "type": "email", "unique": true, "pii": true },
                    "joined": { "type": "date", "range": ["2020-01-01", "2020-12-31"] }
                }
            },
            "orders": {
                "primary_key": "id",
                "foreign_keys": [{ "column": "customer_id", "ref_table": "customers" }],
                "columns": {
                    "id": { "type": "uuid" },
                    "customer_id": { "type": "int" },
                    "total_amount": { "type": "decimal", "range": [1, 500] },
                    "status": { "type": "enum", "values": ["NEW", "PAID"] },
                    "priority": { "type": "enum", "values": [1, 2, 3] }
                }
            }
        },
        "rules": [{ "if": "orders.status == 'PAID'", "then": ["orders.total_amount >= 10"] }]
    });
    normalize_schema(&raw).expect("normalize schema")
}

#[test]
fn exported_runs_read_back_to_the_same_report() {
    for mode in ["valid", "invalid"] {
        let schema = shop_schema(mode);
        let dataset = build_dataset(&schema, GenerationOptions::default());

        for format in [ExportFormat::Csv, ExportFormat::Jsonl, ExportFormat::Sql] {
            let dir = temp_out_dir("validate");
            dataset
                .write_artifacts(&schema, &dir, format)
                .expect("write artifacts");

            let validation = validate_run(&schema, &dir, None).expect("validate run");
            assert_eq!(validation.format, format);
            assert!(validation.missing_tables.is_empty());
            assert_eq!(validation.report.total_violations, dataset.report.total_violations);
            for table in ["customers", "orders"] {
                let fresh = dataset.report.table(table).expect("fresh report");
                let read = validation.report.table(table).expect("read-back report");
                assert_eq!(read.row_count, fresh.row_count, "{mode} {format} {table}");
                assert_eq!(read.violations, fresh.violations, "{mode} {format} {table}");
                assert_eq!(read.rule_violations, fresh.rule_violations);
                assert_eq!(read.failed_rows, fresh.failed_rows);
                assert_eq!(read.coverage, fresh.coverage);
            }
            assert!(
                validation
                    .rows("orders")
                    .iter()
                    .filter_map(|row| row.get("priority"))
                    .all(|value| matches!(value, Value::Int(_) | Value::Text(_)))
            );

            fs::remove_dir_all(&dir).ok();
        }
    }
}

#[test]
fn hand_written_csv_is_checked_against_the_schema() {
    let raw = json!({
        "dataset": { "name": "demo", "size": { "users": 2 } },
        "tables": { "users": {
            "primary_key": "id",
            "columns": {
                "id": { "type": "uuid" },
                "age": { "type": "int", "range": [0, 120] },
                "status": { "type": "enum", "values": ["ACTIVE", "INACTIVE"] }
            }
        } }
    });
    let schema = normalize_schema(&raw).expect("normalize schema");
    let dir = temp_out_dir("handwritten");
    fs::create_dir_all(&dir).expect("create dir");
    fs::write(
        dir.join("users.csv"),
        "id,age,status\n\
         123e4567-e89b-12d3-a456-426614174000,30,ACTIVE\n\
         123e4567-e89b-12d3-a456-426614174000,abc,GONE\n",
    )
    .expect("write csv");

    let validation = validate_run(&schema, &dir, Some(ExportFormat::Csv)).expect("validate run");
    let users = validation.report.table("users").expect("users report");
    assert_eq!(users.row_count, 2);
    assert_eq!(users.violation_count(Check::Type), 1);
    assert_eq!(users.violation_count(Check::Enum), 1);
    assert_eq!(users.violation_count(Check::PrimaryKey), 1);
    assert_eq!(users.failed_rows, 1);

    let path = validation.write_report().expect("write validation report");
    assert_eq!(path, dir.join(VALIDATION_JSON));
    let written: serde_json::Value =
        serde_json::from_slice(&fs::read(&path).expect("read report")).expect("parse report");
    assert_eq!(written["format"], json!("csv"));
    assert_eq!(written["report"]["total_violations"], json!(3));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_table_files_are_reported_not_fatal() {
    let schema = shop_schema("valid");
    let dir = temp_out_dir("partial");
    fs::create_dir_all(&dir).expect("create dir");
    fs::write(dir.join("customers.jsonl"), "").expect("write jsonl");

    let validation = validate_run(&schema, &dir, None).expect("validate run");
    assert_eq!(validation.format, ExportFormat::Jsonl);
    assert_eq!(validation.missing_tables, vec!["orders".to_string()]);
    assert!(validation.rows("orders").is_empty());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn empty_directory_has_nothing_to_validate() {
    let schema = shop_schema("valid");
    let dir = temp_out_dir("empty");
    fs::create_dir_all(&dir).expect("create dir");

    let err = validate_run(&schema, &dir, None).expect_err("no table files");
    assert!(matches!(err, EvalError::NoTableFiles(_)));

    fs::remove_dir_all(&dir).ok();
}

use std::fs;
use std::path::PathBuf;

use serde_json::{Value as Json, json};
use uuid::Uuid;

use datasmith_core::{Schema, normalize_schema};
use datasmith_eval::{REPORT_JSON, REPORT_MARKDOWN, build_dataset, render_report};
use datasmith_generate::{ExportFormat, GenerationOptions};

fn temp_out_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("datasmith_{label}_{}", Uuid::new_v4()))
}

fn library_schema() -> Schema {
    let raw = json!({
        "dataset": { "name": "library", "seed": 42, "size": { "authors": 3, "books": 6 } },
        "tables": {
            "authors": {
                "primary_key": "id",
                "columns": {
                    "id": { "type": "int", "range": [1, 100000] },
                    "name": { "type": "name" }
                }
            },
            "books": {
                "primary_key": "isbn",
                "foreign_keys": [{ "column": "author_id", "ref_table": "authors" }],
                "columns": {
                    "isbn": { "type": "text", "regex": "[A-Z]{3}-[0-9]{4}", "unique": true },
                    "author_id": { "type": "int" },
                    "published": { "type": "date", "range": ["2000-01-01", "2020-12-31"] }
                }
            }
        },
        "rules": [{ "if": "books.author_id > 0", "then": ["books.isbn != ''"] }]
    });
    normalize_schema(&raw).expect("normalize schema")
}

#[test]
fn writes_tables_and_reports() {
    let schema = library_schema();
    let dataset = build_dataset(&schema, GenerationOptions::default());
    let dir = temp_out_dir("artifacts");

    let summary = dataset
        .write_artifacts(&schema, &dir, ExportFormat::Jsonl)
        .expect("write artifacts");

    assert_eq!(summary.tables.len(), 2);
    assert_eq!(summary.tables[0].table, "authors");
    assert_eq!(summary.tables[1].rows, 6);
    let books = fs::read_to_string(dir.join("books.jsonl")).expect("books file");
    assert_eq!(books.lines().count(), 6);

    let report: Json =
        serde_json::from_slice(&fs::read(dir.join(REPORT_JSON)).expect("report json"))
            .expect("parse report");
    assert_eq!(report["total_violations"], json!(0));
    assert_eq!(report["table_reports"]["books"]["row_count"], json!(6));
    assert_eq!(report["coverage"]["regex"], json!(6));
    assert_eq!(report["coverage"]["range"], json!(9));

    let markdown = fs::read_to_string(dir.join(REPORT_MARKDOWN)).expect("report md");
    assert_eq!(markdown, render_report(&dataset));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn markdown_lists_every_section() {
    let schema = library_schema();
    let dataset = build_dataset(&schema, GenerationOptions::default());
    let markdown = render_report(&dataset);

    for heading in [
        "# Datasmith Quality Report",
        "## Run summary",
        "## Generation order",
        "## Tables",
        "## Coverage",
        "## Rules",
        "## Recommendations",
    ] {
        assert!(markdown.contains(heading), "missing {heading}");
    }
    assert!(markdown.contains(&format!("- dataset_id: {}", dataset.id)));
    assert!(markdown.contains("- authors -> books"));
    assert!(markdown.contains("| books | 6 | 0 | 0 |"));
}

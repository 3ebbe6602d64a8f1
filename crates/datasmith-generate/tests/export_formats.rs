use std::fs;
use std::path::PathBuf;

use datasmith_core::{Column, ColumnType, Row, Table, Value};
use datasmith_generate::{ExportFormat, write_table};

fn temp_out_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "datasmith_generate_{label}_{}",
        uuid::Uuid::new_v4()
    ));
    fs::create_dir_all(&dir).expect("create temp out dir");
    dir
}

fn people() -> (Table, Vec<Row>) {
    let table = Table {
        name: "people".to_string(),
        primary_key: Some("id".to_string()),
        foreign_keys: Vec::new(),
        columns: vec![
            Column::new("id", ColumnType::Int),
            Column::new("name", ColumnType::Text),
            Column::new("note", ColumnType::Text),
        ],
    };
    let mut first = Row::new();
    first.insert("id", Value::Int(1));
    first.insert("name", Value::from("Smith, \"Sam\""));
    first.insert("note", Value::Null);
    let mut second = Row::new();
    second.insert("id", Value::Int(2));
    second.insert("name", Value::from("O'Brien"));
    second.insert("note", Value::from("ok"));
    (table, vec![first, second])
}

#[test]
fn csv_quotes_and_blanks_nulls() {
    let (table, rows) = people();
    let path = temp_out_dir("csv").join("people.csv");
    let bytes = write_table(ExportFormat::Csv, &path, &table, &rows).expect("write csv");
    let contents = fs::read_to_string(&path).expect("read csv");
    assert_eq!(bytes as usize, contents.len());
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "id,name,note");
    assert_eq!(lines[1], "1,\"Smith, \"\"Sam\"\"\",");
    assert_eq!(lines[2], "2,O'Brien,ok");
}

#[test]
fn jsonl_keeps_column_order() {
    let (table, rows) = people();
    let path = temp_out_dir("jsonl").join("people.jsonl");
    write_table(ExportFormat::Jsonl, &path, &table, &rows).expect("write jsonl");
    let contents = fs::read_to_string(&path).expect("read jsonl");
    let first = contents.lines().next().expect("first line");
    assert_eq!(first, r#"{"id":1,"name":"Smith, \"Sam\"","note":null}"#);
    assert_eq!(contents.lines().count(), 2);
}

#[test]
fn sql_writes_one_insert_per_row() {
    let (table, rows) = people();
    let path = temp_out_dir("sql").join("people.sql");
    write_table(ExportFormat::Sql, &path, &table, &rows).expect("write sql");
    let contents = fs::read_to_string(&path).expect("read sql");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines[1],
        "INSERT INTO people (id, name, note) VALUES (2, 'O''Brien', 'ok');"
    );
    assert!(lines[0].ends_with("NULL);"));
}

#[test]
fn format_names_parse() {
    assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    assert_eq!("sql".parse::<ExportFormat>().unwrap(), ExportFormat::Sql);
    assert!("xml".parse::<ExportFormat>().is_err());
}

use std::collections::HashSet;

use serde_json::{Value as Json, json};

use datasmith_core::{Schema, Value, normalize_schema};
use datasmith_eval::{Check, build_dataset, render_report};
use datasmith_generate::GenerationOptions;

fn shop_schema(mode: &str, orders: u64, max_attempts: u32, rules: Json) -> Schema {
    let raw = json!({
        "dataset": {
            "name": "shop",
            "seed": 1,
            "mode": mode,
            "max_attempts": max_attempts,
            "size": { "customers": 5, "orders": orders }
        },
        "tables": {
            "customers": {
                "primary_key": "id",
                "columns": {
                    "id": { "type": "uuid" },
                    "email": { "type": "email", "unique": true },
                    "country": { "type": "country" }
                }
            },
            "orders": {
                "primary_key": "id",
                "foreign_keys": [
                    { "column": "customer_id", "ref_table": "customers", "ref_column": "id" }
                ],
                "columns": {
                    "id": { "type": "uuid" },
                    "customer_id": { "type": "uuid" },
                    "total_amount": { "type": "decimal", "range": [1, 500] },
                    "status": { "type": "enum", "values": ["NEW", "PAID", "SHIPPED"] }
                }
            }
        },
        "rules": rules
    });
    normalize_schema(&raw).expect("normalize schema")
}

#[test]
fn valid_run_has_no_violations() {
    let schema = shop_schema("valid", 5, 10, json!([]));
    let dataset = build_dataset(&schema, GenerationOptions::default());

    let customer_ids: HashSet<String> = dataset
        .rows("customers")
        .iter()
        .filter_map(|row| row.get("id"))
        .map(|value| value.render())
        .collect();
    assert_eq!(customer_ids.len(), 5);
    for order in dataset.rows("orders") {
        let customer = order.get("customer_id").expect("customer_id column");
        assert!(customer_ids.contains(&customer.render()));
    }

    assert_eq!(dataset.report.total_violations, 0);
    assert_eq!(dataset.report.failed_rows(), 0);
    let orders = dataset.report.table("orders").expect("orders report");
    assert_eq!(orders.row_count, 5);
    assert_eq!(orders.coverage.get(&Check::ForeignKey), Some(&5));
    assert_eq!(orders.coverage.get(&Check::PrimaryKey), Some(&5));
    assert!(dataset.report.dependency_cycle.is_none());
    assert_eq!(dataset.config_hash.len(), 16);
}

#[test]
fn invalid_mode_produces_failed_rows() {
    let schema = shop_schema("invalid", 50, 1, json!([]));
    let dataset = build_dataset(&schema, GenerationOptions::default());
    let orders = dataset.report.table("orders").expect("orders report");

    assert_eq!(orders.row_count, 50);
    assert!(orders.failed_rows > 0);
    assert!(orders.exhausted_rows > 0);
    assert!(dataset.report.total_violations > 0);
}

#[test]
fn self_implication_rule_never_violates() {
    let rules = json!([
        { "if": "orders.total_amount <= 0", "then": ["orders.total_amount <= 0"] }
    ]);
    let schema = shop_schema("boundary", 50, 10, rules);
    let dataset = build_dataset(&schema, GenerationOptions::default());

    let orders = dataset.report.table("orders").expect("orders report");
    assert_eq!(orders.rule_violations, 0);
    assert_eq!(orders.coverage.get(&Check::Rules), Some(&50));
    assert_eq!(dataset.report.coverage_of(Check::Rules), 55);
}

#[test]
fn violated_rule_is_counted() {
    let rules = json!([
        { "if": "orders.total_amount > 0", "then": "orders.status == 'NONE'" }
    ]);
    let schema = shop_schema("valid", 10, 10, rules);
    let dataset = build_dataset(&schema, GenerationOptions::default());

    let orders = dataset.report.table("orders").expect("orders report");
    assert_eq!(orders.rule_violations, 10);
    assert_eq!(orders.failed_rows, 10);
    assert_eq!(dataset.report.total_violations, 10);
}

#[test]
fn mutual_cycle_is_reported() {
    let raw = json!({
        "dataset": { "seed": 7, "size": 4, "max_attempts": 2 },
        "tables": {
            "a": {
                "primary_key": "id",
                "foreign_keys": [{ "column": "b_id", "ref_table": "b" }],
                "columns": { "id": { "type": "int", "range": [1, 1000] }, "b_id": { "type": "int" } }
            },
            "b": {
                "primary_key": "id",
                "foreign_keys": [{ "column": "a_id", "ref_table": "a" }],
                "columns": { "id": { "type": "int", "range": [1, 1000] }, "a_id": { "type": "int" } }
            }
        }
    });
    let schema = normalize_schema(&raw).expect("normalize schema");
    let dataset = build_dataset(&schema, GenerationOptions::default());

    assert_eq!(dataset.order, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(dataset.rows("a").len(), 4);
    assert_eq!(dataset.rows("b").len(), 4);
    let cycle = dataset.report.dependency_cycle.as_ref().expect("cycle edges");
    assert!(!cycle.is_empty());

    let a = dataset.report.table("a").expect("a report");
    assert_eq!(a.violation_count(Check::Nullable), 4);
    assert_eq!(a.exhausted_rows, 4);
    assert!(render_report(&dataset).contains("dependency cycle"));
}

#[test]
fn evaluation_is_deterministic() {
    let schema = shop_schema("invalid", 30, 3, json!([]));
    let options = GenerationOptions {
        boundary: true,
        nulls: true,
        invalid: false,
    };
    let a = build_dataset(&schema, options);
    let b = build_dataset(&schema, options);

    assert_eq!(a.id, b.id);
    assert_eq!(a.rows_by_table, b.rows_by_table);
    assert_eq!(a.report, b.report);
    assert_eq!(render_report(&a), render_report(&b));
}

#[test]
fn numeric_enum_rules_compare_numbers() {
    let raw = json!({
        "dataset": { "seed": 3, "size": { "t": 20 } },
        "tables": {
            "t": {
                "columns": { "level": { "type": "enum", "values": [1, 2] } }
            }
        },
        "rules": [{ "if": "t.level == 1", "then": ["t.level != 1"] }]
    });
    let schema = normalize_schema(&raw).expect("normalize schema");
    let dataset = build_dataset(&schema, GenerationOptions::default());

    let ones = dataset
        .rows("t")
        .iter()
        .filter(|row| row.get("level") == Some(&Value::Int(1)))
        .count() as u64;
    assert!(ones > 0);
    assert!(
        dataset
            .rows("t")
            .iter()
            .all(|row| matches!(row.get("level"), Some(Value::Int(1 | 2))))
    );

    let table = dataset.report.table("t").expect("t report");
    assert_eq!(table.rule_violations, ones);
    assert_eq!(table.violation_count(Check::Enum), 0);
    assert_eq!(table.violation_count(Check::Type), 0);

    let json = serde_json::to_value(&dataset.rows("t")[0]).expect("row json");
    assert!(json["level"].is_i64());
}

#[test]
fn broken_foreign_keys_count_once_as_foreign_key_violations() {
    let raw = json!({
        "dataset": {
            "seed": 3,
            "mode": "invalid",
            "max_attempts": 1,
            "size": { "customers": 5, "orders": 100 }
        },
        "tables": {
            "customers": {
                "primary_key": "id",
                "columns": { "id": { "type": "int", "range": [1, 1000000] } }
            },
            "orders": {
                "foreign_keys": [{ "column": "customer_id", "ref_table": "customers" }],
                "columns": { "customer_id": { "type": "int" } }
            }
        }
    });
    let schema = normalize_schema(&raw).expect("normalize schema");
    let dataset = build_dataset(&schema, GenerationOptions::default());

    let sentinel = Value::from("invalid_fk");
    assert!(
        dataset
            .rows("orders")
            .iter()
            .any(|row| row.get("customer_id") == Some(&sentinel))
    );

    let parents: HashSet<String> = dataset
        .rows("customers")
        .iter()
        .filter_map(|row| row.get("id"))
        .filter(|value| !value.is_null())
        .map(Value::key)
        .collect();
    let dangling = dataset
        .rows("orders")
        .iter()
        .filter_map(|row| row.get("customer_id"))
        .filter(|value| !value.is_null() && !parents.contains(&value.key()))
        .count() as u64;

    let orders = dataset.report.table("orders").expect("orders report");
    assert!(orders.violation_count(Check::ForeignKey) > 0);
    assert_eq!(orders.violation_count(Check::ForeignKey), dangling);
    assert_eq!(orders.violation_count(Check::Type), 0);
    assert_eq!(orders.total_violations(), dangling);
}

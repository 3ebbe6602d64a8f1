use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::info;

use datasmith_core::{Column, ColumnType, Row, RuleSet, RuleVerdict, Schema, Table, Value, parse_instant};
use datasmith_generate::GenerationOutcome;
use datasmith_generate::checks::{in_enum, in_range};
use datasmith_generate::model::PoolArena;

use crate::model::{Check, QualityReport, TableReport};

/// Walk the generated rows a second time and count coverage and violations.
///
/// Unique and primary-key checks use fresh sets; foreign keys are checked
/// against the final primary-key pools.
pub fn evaluate_dataset(schema: &Schema, outcome: &GenerationOutcome) -> QualityReport {
    let mut report = evaluate_rows(schema, outcome.order(), &outcome.rows_by_table, &outcome.pools);
    report.dependency_cycle = outcome.plan.offending_edges().map(<[_]>::to_vec);
    for (table_name, table_report) in report.table_reports.iter_mut() {
        if let Some(stats) = outcome.stats.get(table_name) {
            table_report.repair_attempts = stats.repair_attempts;
            table_report.exhausted_rows = stats.exhausted_rows;
        }
    }
    report
}

/// Evaluate `rows_by_table` table by table in `order`. Tables the schema
/// does not declare are skipped; missing row sets count as empty.
pub fn evaluate_rows(
    schema: &Schema,
    order: &[String],
    rows_by_table: &BTreeMap<String, Vec<Row>>,
    pools: &PoolArena,
) -> QualityReport {
    let rules = RuleSet::compile(&schema.rules);
    let uuid_shape = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .ok();

    let mut report = QualityReport {
        rules: schema.rules.clone(),
        ..QualityReport::default()
    };

    for table_name in order {
        let Some(table) = schema.table(table_name) else {
            continue;
        };
        let rows = rows_by_table
            .get(table_name)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let table_report = evaluate_table(table, rows, pools, &rules, uuid_shape.as_ref());

        for (check, count) in &table_report.coverage {
            *report.coverage.entry(*check).or_insert(0) += count;
        }
        report.total_violations += table_report.total_violations();

        info!(
            table = %table_name,
            rows = table_report.row_count,
            failed_rows = table_report.failed_rows,
            violations = table_report.total_violations(),
            "table evaluated"
        );
        report
            .table_reports
            .insert(table_name.clone(), table_report);
    }

    report
}

struct ColumnEval<'a> {
    column: &'a Column,
    is_primary_key: bool,
    foreign_table: Option<&'a str>,
    /// `Some(None)` for a regex that does not compile.
    matcher: Option<Option<Regex>>,
}

fn evaluate_table(
    table: &Table,
    rows: &[Row],
    pools: &PoolArena,
    rules: &RuleSet,
    uuid_shape: Option<&Regex>,
) -> TableReport {
    let columns: Vec<ColumnEval<'_>> = table
        .columns
        .iter()
        .map(|column| ColumnEval {
            column,
            is_primary_key: table.is_primary_key(&column.name),
            foreign_table: table
                .foreign_key_for(&column.name)
                .map(|fk| fk.ref_table.as_str()),
            matcher: (column.column_type == ColumnType::Text)
                .then(|| column.anchored_regex().map(Result::ok))
                .flatten(),
        })
        .collect();

    let mut report = TableReport {
        row_count: rows.len() as u64,
        ..TableReport::default()
    };
    let mut unique_seen: BTreeMap<&str, HashSet<String>> = BTreeMap::new();
    let mut primary_seen: HashSet<String> = HashSet::new();

    for row in rows {
        let mut failed = false;

        for eval in &columns {
            let column = eval.column;
            let value = row.get(&column.name).unwrap_or(&Value::Null);
            report.record_coverage(Check::Type);

            if value.is_null() {
                report.record_coverage(Check::Nullable);
                if !column.nullable {
                    report.record_violation(Check::Nullable);
                    failed = true;
                }
                continue;
            }

            if eval.foreign_table.is_none() && !conforms_to_type(&column.column_type, value, uuid_shape) {
                report.record_violation(Check::Type);
                failed = true;
                continue;
            }

            let mut fail = |report: &mut TableReport, check: Check, passed: bool| {
                report.record_coverage(check);
                if !passed {
                    report.record_violation(check);
                    failed = true;
                }
            };

            if let Some(range) = column.range.as_ref() {
                if column.column_type.is_numeric() {
                    if let Some((min, max)) = range.numeric() {
                        fail(&mut report, Check::Range, in_range(value, min, max));
                    }
                } else if column.column_type.is_temporal() {
                    let bounds = (
                        parse_instant(&range.lower().as_text()),
                        parse_instant(&range.upper().as_text()),
                    );
                    if let (Some(start), Some(end)) = bounds {
                        let passed = in_time_range(&column.column_type, value, start, end);
                        fail(&mut report, Check::Range, passed);
                    }
                }
            }

            if let Some(matcher) = eval.matcher.as_ref() {
                let passed = matcher
                    .as_ref()
                    .is_some_and(|regex| regex.is_match(&value.render()));
                fail(&mut report, Check::Regex, passed);
            }

            if column.column_type == ColumnType::Enum {
                if let Some(values) = column.values.as_deref() {
                    fail(&mut report, Check::Enum, in_enum(values, value));
                }
            }

            if column.unique {
                let seen = unique_seen.entry(column.name.as_str()).or_default();
                fail(&mut report, Check::Unique, seen.insert(value.key()));
            }

            if eval.is_primary_key {
                fail(&mut report, Check::PrimaryKey, primary_seen.insert(value.key()));
            }

            if let Some(ref_table) = eval.foreign_table {
                let passed = pools.contains_primary_key(ref_table, value);
                fail(&mut report, Check::ForeignKey, passed);
            }
        }

        if !rules.is_empty() {
            report.record_coverage(Check::Rules);
            match rules.evaluate_row(&table.name, row) {
                RuleVerdict::Violated => {
                    report.rule_violations += 1;
                    failed = true;
                }
                RuleVerdict::NotEvaluated => report.rules_not_evaluated += 1,
                RuleVerdict::Passed => {}
            }
        }

        if failed {
            report.failed_rows += 1;
        }
    }

    report
}

/// Whether a non-null value has the shape its declared type promises.
/// Text-like types accept any text; enums accept any scalar and leave
/// membership to the enum check.
pub fn conforms_to_type(column_type: &ColumnType, value: &Value, uuid_shape: Option<&Regex>) -> bool {
    match column_type {
        ColumnType::Uuid => match value {
            Value::Text(text) => uuid_shape.is_some_and(|re| re.is_match(text)),
            _ => false,
        },
        ColumnType::Int => match value {
            Value::Int(_) => true,
            Value::Float(_) | Value::Decimal(_) => {
                value.numeric().is_some_and(|number| number.fract() == 0.0)
            }
            _ => false,
        },
        ColumnType::Decimal => value.numeric().is_some_and(f64::is_finite),
        ColumnType::Bool => matches!(value, Value::Bool(_)),
        ColumnType::Date | ColumnType::Datetime => match value {
            Value::Date(_) | Value::Timestamp(_) => true,
            Value::Text(text) => parse_instant(text).is_some(),
            _ => false,
        },
        ColumnType::Enum => matches!(
            value,
            Value::Text(_) | Value::Int(_) | Value::Float(_) | Value::Decimal(_) | Value::Bool(_)
        ),
        ColumnType::Text
        | ColumnType::Email
        | ColumnType::Phone
        | ColumnType::Country
        | ColumnType::PostcodeUk
        | ColumnType::Name
        | ColumnType::Unknown(_) => matches!(value, Value::Text(_)),
    }
}

fn in_time_range(
    column_type: &ColumnType,
    value: &Value,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> bool {
    let instant = match value {
        Value::Date(date) => date.and_hms_opt(0, 0, 0),
        Value::Timestamp(timestamp) => Some(*timestamp),
        Value::Text(text) => parse_instant(text),
        _ => None,
    };
    let Some(instant) = instant else {
        return false;
    };
    if *column_type == ColumnType::Date {
        let day = instant.date();
        day >= start.date() && day <= end.date()
    } else {
        instant >= start && instant <= end
    }
}

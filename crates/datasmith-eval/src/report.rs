use crate::dataset::Dataset;
use crate::model::{Check, QualityReport, TableReport};

/// Render a deterministic markdown report for a generated dataset.
pub fn render_report(dataset: &Dataset) -> String {
    let report = &dataset.report;
    let mut lines = Vec::new();

    lines.push("# Datasmith Quality Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    lines.push(format!("- dataset_id: {}", dataset.id));
    lines.push(format!("- config_hash: {}", dataset.config_hash));
    lines.push(format!("- tables: {}", dataset.order.len()));
    lines.push(format!("- rows: {}", dataset.total_rows()));
    lines.push(format!("- total_violations: {}", report.total_violations));
    lines.push(format!("- failed_rows: {}", report.failed_rows()));
    lines.push(format!("- repair_attempts: {}", report.repair_attempts()));
    lines.push(String::new());

    lines.push("## Generation order".to_string());
    lines.push(format!("- {}", dataset.order.join(" -> ")));
    if let Some(edges) = report.dependency_cycle.as_ref() {
        let edges: Vec<String> = edges
            .iter()
            .map(|edge| format!("{} -> {}", edge.from, edge.to))
            .collect();
        lines.push(format!(
            "- dependency cycle, declaration order used: {}",
            edges.join(", ")
        ));
    }
    lines.push(String::new());

    lines.push("## Tables".to_string());
    lines.push(
        "| table | rows | failed_rows | violations | repair_attempts | exhausted_rows |"
            .to_string(),
    );
    lines.push("| --- | --- | --- | --- | --- | --- |".to_string());
    for name in &dataset.order {
        let Some(table) = report.table(name) else {
            continue;
        };
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} |",
            name,
            table.row_count,
            table.failed_rows,
            table.total_violations(),
            table.repair_attempts,
            table.exhausted_rows
        ));
    }
    lines.push(String::new());

    lines.push("## Coverage".to_string());
    lines.push("| check | evaluated | violations |".to_string());
    lines.push("| --- | --- | --- |".to_string());
    for check in Check::ALL {
        let violations = if check == Check::Rules {
            report.table_reports.values().map(|t| t.rule_violations).sum()
        } else {
            sum_violations(report, check)
        };
        lines.push(format!(
            "| {} | {} | {} |",
            check,
            report.coverage_of(check),
            violations
        ));
    }
    lines.push(String::new());

    let offenders: Vec<(&String, &TableReport)> = dataset
        .order
        .iter()
        .filter_map(|name| report.table(name).map(|table| (name, table)))
        .filter(|(_, table)| table.total_violations() > 0)
        .collect();
    if !offenders.is_empty() {
        lines.push("## Violations".to_string());
        for (name, table) in offenders {
            let mut parts: Vec<String> = table
                .violations
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(check, count)| format!("{check}={count}"))
                .collect();
            if table.rule_violations > 0 {
                parts.push(format!("rules={}", table.rule_violations));
            }
            lines.push(format!("- {}: {}", name, parts.join(", ")));
        }
        lines.push(String::new());
    }

    if !report.rules.is_empty() {
        lines.push("## Rules".to_string());
        for rule in &report.rules {
            lines.push(format!(
                "- if `{}` then `{}`",
                rule.condition,
                rule.then.join("` and `")
            ));
        }
        let not_evaluated: u64 = report
            .table_reports
            .values()
            .map(|t| t.rules_not_evaluated)
            .sum();
        lines.push(format!("- rows not evaluated: {not_evaluated}"));
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(report));
    lines.join("\n")
}

fn sum_violations(report: &QualityReport, check: Check) -> u64 {
    report
        .table_reports
        .values()
        .map(|table| table.violation_count(check))
        .sum()
}

fn recommendations(report: &QualityReport) -> Vec<String> {
    let mut lines = Vec::new();
    if sum_violations(report, Check::Nullable) > 0 {
        lines.push("- disable null injection or mark the affected columns nullable.".to_string());
    }
    if sum_violations(report, Check::Unique) > 0 || sum_violations(report, Check::PrimaryKey) > 0 {
        lines.push("- widen ranges or regexes of unique columns, or raise max_attempts.".to_string());
    }
    if sum_violations(report, Check::ForeignKey) > 0 {
        lines.push("- check foreign key targets and the generation order.".to_string());
    }
    if report.dependency_cycle.is_some() {
        lines.push("- break the foreign key cycle so parents are generated first.".to_string());
    }
    let not_evaluated: u64 = report
        .table_reports
        .values()
        .map(|t| t.rules_not_evaluated)
        .sum();
    if not_evaluated > 0 {
        lines.push("- rules referencing other tables or missing columns were not evaluated.".to_string());
    }
    if report.total_violations == 0 {
        lines.push("- no violations detected; compare reports across seeds for drift.".to_string());
    }
    lines
}

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use datasmith_core::{DependencyEdge, Rule};

/// Validation categories counted in coverage and violations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Type,
    Nullable,
    Range,
    Regex,
    Enum,
    Unique,
    PrimaryKey,
    ForeignKey,
    Rules,
}

impl Check {
    pub const ALL: [Check; 9] = [
        Check::Type,
        Check::Nullable,
        Check::Range,
        Check::Regex,
        Check::Enum,
        Check::Unique,
        Check::PrimaryKey,
        Check::ForeignKey,
        Check::Rules,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Check::Type => "type",
            Check::Nullable => "nullable",
            Check::Range => "range",
            Check::Regex => "regex",
            Check::Enum => "enum",
            Check::Unique => "unique",
            Check::PrimaryKey => "primary_key",
            Check::ForeignKey => "foreign_key",
            Check::Rules => "rules",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-table validation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub row_count: u64,
    pub coverage: BTreeMap<Check, u64>,
    pub violations: BTreeMap<Check, u64>,
    pub rule_violations: u64,
    pub rules_not_evaluated: u64,
    pub failed_rows: u64,
    pub repair_attempts: u64,
    pub exhausted_rows: u64,
}

impl TableReport {
    pub fn record_coverage(&mut self, check: Check) {
        *self.coverage.entry(check).or_insert(0) += 1;
    }

    pub fn record_violation(&mut self, check: Check) {
        *self.violations.entry(check).or_insert(0) += 1;
    }

    pub fn violation_count(&self, check: Check) -> u64 {
        self.violations.get(&check).copied().unwrap_or(0)
    }

    /// Category violations plus rule violations.
    pub fn total_violations(&self) -> u64 {
        self.violations.values().sum::<u64>() + self.rule_violations
    }
}

/// Coverage and violation summary for a generated dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub total_violations: u64,
    pub coverage: BTreeMap<Check, u64>,
    pub table_reports: BTreeMap<String, TableReport>,
    pub rules: Vec<Rule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_cycle: Option<Vec<DependencyEdge>>,
}

impl QualityReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.table_reports.get(name)
    }

    pub fn coverage_of(&self, check: Check) -> u64 {
        self.coverage.get(&check).copied().unwrap_or(0)
    }

    pub fn failed_rows(&self) -> u64 {
        self.table_reports.values().map(|t| t.failed_rows).sum()
    }

    pub fn repair_attempts(&self) -> u64 {
        self.table_reports.values().map(|t| t.repair_attempts).sum()
    }
}

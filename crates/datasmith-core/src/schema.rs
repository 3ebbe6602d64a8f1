use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::value::Value;

/// Dataset name used when the schema does not declare one.
pub const DEFAULT_DATASET_NAME: &str = "dataset";
/// Seed used when the schema does not declare one.
pub const DEFAULT_SEED: u64 = 1;
/// Repair attempts per row when the schema does not declare a limit.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Rows generated for a table missing from the `size` map.
pub const DEFAULT_TABLE_ROWS: u64 = 10;

/// Canonical schema produced by the normalizer.
///
/// Tables and columns keep their declaration order: it drives the generation
/// order of columns within a row and therefore the pseudo-random draw sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub dataset: DatasetConfig,
    pub tables: Vec<Table>,
    pub rules: Vec<Rule>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Requested row count for a table.
    pub fn rows_for(&self, table: &str) -> u64 {
        self.dataset
            .size
            .get(table)
            .copied()
            .unwrap_or(DEFAULT_TABLE_ROWS)
    }
}

/// Dataset-level generation options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetConfig {
    pub name: String,
    pub seed: u64,
    pub mode: Mode,
    pub size: BTreeMap<String, u64>,
    pub max_attempts: u32,
}

/// Dataset-level bias for edge-case injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Valid,
    Invalid,
    Boundary,
    /// Unrecognised mode names behave like `Valid` but are preserved.
    Other(String),
}

impl Mode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "valid" => Mode::Valid,
            "invalid" => Mode::Invalid,
            "boundary" => Mode::Boundary,
            _ => Mode::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Mode::Valid => "valid",
            Mode::Invalid => "invalid",
            Mode::Boundary => "boundary",
            Mode::Other(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A table definition with its keys and ordered columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// First foreign key declared on `column`, if any.
    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.as_deref() == Some(column)
    }
}

/// Single-column foreign key. Values are sampled from the referenced table's
/// primary-key pool; `ref_column` is carried for exports and documentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKey {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

/// Column metadata as declared in the schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<ColumnRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<LengthRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Enum members keep their declared scalar kind: `[1, 2]` stays numeric.
    pub values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    /// Column holds personal data (emails, phone numbers).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub pii: bool,
}

impl Column {
    /// A bare column of the given type with no constraints.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            unique: false,
            range: None,
            distribution: None,
            regex: None,
            length: None,
            values: None,
            weights: None,
            pii: false,
        }
    }

    /// The declared regex compiled for whole-value matching.
    ///
    /// Returns `None` when no regex is declared.
    pub fn anchored_regex(&self) -> Option<Result<Regex, regex::Error>> {
        self.regex
            .as_deref()
            .map(|pattern| Regex::new(&format!("^(?:{pattern})$")))
    }
}

/// Closed set of supported column types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Int,
    Decimal,
    Bool,
    Datetime,
    Date,
    Enum,
    Text,
    Email,
    Phone,
    Country,
    PostcodeUk,
    Name,
    Unknown(String),
}

impl ColumnType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "uuid" => ColumnType::Uuid,
            "int" => ColumnType::Int,
            "decimal" => ColumnType::Decimal,
            "bool" => ColumnType::Bool,
            "datetime" => ColumnType::Datetime,
            "date" => ColumnType::Date,
            "enum" => ColumnType::Enum,
            "text" => ColumnType::Text,
            "email" => ColumnType::Email,
            "phone" => ColumnType::Phone,
            "country" => ColumnType::Country,
            "postcode_uk" => ColumnType::PostcodeUk,
            "name" => ColumnType::Name,
            other => ColumnType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::Uuid => "uuid",
            ColumnType::Int => "int",
            ColumnType::Decimal => "decimal",
            ColumnType::Bool => "bool",
            ColumnType::Datetime => "datetime",
            ColumnType::Date => "date",
            ColumnType::Enum => "enum",
            ColumnType::Text => "text",
            ColumnType::Email => "email",
            ColumnType::Phone => "phone",
            ColumnType::Country => "country",
            ColumnType::PostcodeUk => "postcode_uk",
            ColumnType::Name => "name",
            ColumnType::Unknown(raw) => raw.as_str(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Decimal)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::Datetime)
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Sampling distribution for numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    Uniform,
    Normal,
    Lognormal,
}

impl Distribution {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "uniform" => Some(Distribution::Uniform),
            "normal" => Some(Distribution::Normal),
            "lognormal" => Some(Distribution::Lognormal),
            _ => None,
        }
    }
}

/// One end of a declared range: numbers for numeric columns, text for dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Bound {
    Number(f64),
    Text(String),
}

impl Bound {
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Bound::Number(value) => Some(*value),
            Bound::Text(value) => value.trim().parse::<f64>().ok(),
        };
        value.filter(|value| value.is_finite())
    }

    pub fn as_text(&self) -> String {
        match self {
            Bound::Number(value) => value.to_string(),
            Bound::Text(value) => value.clone(),
        }
    }
}

/// Inclusive `[lower, upper]` range, serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRange(pub Bound, pub Bound);

impl ColumnRange {
    pub fn lower(&self) -> &Bound {
        &self.0
    }

    pub fn upper(&self) -> &Bound {
        &self.1
    }

    /// Both bounds as numbers, when they parse.
    pub fn numeric(&self) -> Option<(f64, f64)> {
        Some((self.0.as_f64()?, self.1.as_f64()?))
    }
}

/// Inclusive text length range, serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LengthRange(pub usize, pub usize);

/// Conditional business rule: when `if` holds for a row, every `then`
/// expression must hold as well.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    #[serde(rename = "if")]
    pub condition: String,
    pub then: Vec<String>,
}

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Rendering used for generated timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
/// Rendering used for generated dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read a date or timestamp in the shapes schemas and generated rows use:
/// `YYYY-MM-DD`, naive ISO timestamps with optional fraction, or RFC 3339.
pub fn parse_instant(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }
    let naive = text.strip_suffix('Z').unwrap_or(text);
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(naive, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// A single generated cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Fixed two-digit decimal kept as text to avoid float noise.
    Decimal(String),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Textual form used by exporters and regex checks. Null renders empty.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(value) => value.to_string(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Decimal(value) => value.clone(),
            Value::Text(value) => value.clone(),
            Value::Date(value) => value.format(DATE_FORMAT).to_string(),
            Value::Timestamp(value) => value.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Numeric view of values that are numbers by kind.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            Value::Decimal(value) => value.parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Like [`Value::numeric`], but also reads numeric text.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Value::Text(value) => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite()),
            other => other.numeric(),
        }
    }

    /// Stable key for membership sets. Numbers share one namespace so an
    /// integer and an equal float collide.
    pub fn key(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(value) => format!("b:{value}"),
            Value::Int(_) | Value::Float(_) | Value::Decimal(_) => match self.numeric() {
                Some(number) => format!("n:{number}"),
                None => format!("s:{}", self.render()),
            },
            Value::Date(_) | Value::Timestamp(_) => format!("d:{}", self.render()),
            Value::Text(value) => format!("s:{value}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Int(value) => serializer.serialize_i64(*value),
            Value::Float(value) => serializer.serialize_f64(*value),
            Value::Decimal(_) | Value::Text(_) | Value::Date(_) | Value::Timestamp(_) => {
                serializer.serialize_str(&self.render())
            }
        }
    }
}

/// Column values of one generated row, in column declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    /// Sets a cell, replacing an existing value for the same column.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_keys_share_namespace() {
        assert_eq!(Value::Int(3).key(), Value::Float(3.0).key());
        assert_eq!(Value::Decimal("3.00".to_string()).key(), Value::Int(3).key());
        assert_ne!(Value::Int(3).key(), Value::Text("3".to_string()).key());
    }

    #[test]
    fn row_serializes_in_insertion_order() {
        let mut row = Row::new();
        row.insert("z", Value::Int(1));
        row.insert("a", Value::Null);
        row.insert(
            "d",
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
        );
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"z":1,"a":null,"d":"2024-02-29"}"#);
    }

    #[test]
    fn timestamp_renders_with_millis() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 60)
            .unwrap();
        assert_eq!(Value::Timestamp(ts).render(), "2024-01-02T03:04:05.060Z");
    }

    #[test]
    fn parse_instant_accepts_dates_and_timestamps() {
        let midnight = parse_instant("2023-01-01").unwrap();
        assert_eq!(midnight.to_string(), "2023-01-01 00:00:00");
        assert!(parse_instant("2024-05-06T07:08:09.123Z").is_some());
        assert!(parse_instant("2024-05-06T07:08:09").is_some());
        assert!(parse_instant("not_a_date").is_none());
    }

    #[test]
    fn coerce_number_reads_text() {
        assert_eq!(Value::Text(" 12.5".to_string()).coerce_number(), Some(12.5));
        assert_eq!(Value::Text("abc".to_string()).coerce_number(), None);
        assert_eq!(Value::Text("12".to_string()).numeric(), None);
    }
}

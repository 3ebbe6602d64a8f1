//! Schema text decoding.

use serde_json::Value as Json;

use crate::error::{Result, SchemaError};
use crate::normalize::normalize_schema;
use crate::schema::Schema;

/// Decode YAML or JSON text into a nested mapping.
///
/// Text whose first non-blank character is `{` is read as JSON, anything
/// else as YAML (which also accepts most JSON).
pub fn decode_schema_text(text: &str) -> Result<Json> {
    let decoded: Json = if text.trim_start().starts_with('{') {
        serde_json::from_str(text).map_err(|err| SchemaError::Parse(err.to_string()))?
    } else {
        serde_yaml_ng::from_str(text).map_err(|err| SchemaError::Parse(err.to_string()))?
    };

    if decoded.is_object() {
        Ok(decoded)
    } else {
        Err(SchemaError::NotAnObject)
    }
}

/// Decode and normalize schema text in one step.
pub fn parse_schema_text(text: &str) -> Result<Schema> {
    let raw = decode_schema_text(text)?;
    normalize_schema(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_keeps_declaration_order() {
        let text = "tables:\n  zeta:\n    columns:\n      b: { type: int }\n      a: { type: text }\n  alpha:\n    columns: {}\n";
        let schema = parse_schema_text(text).unwrap();
        let names: Vec<_> = schema.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        let columns: Vec<_> = schema.tables[0]
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(columns, vec!["b", "a"]);
    }

    #[test]
    fn scalar_document_is_not_an_object() {
        assert!(matches!(
            decode_schema_text("just text"),
            Err(SchemaError::NotAnObject)
        ));
    }

    #[test]
    fn broken_json_is_a_parse_error() {
        assert!(matches!(
            decode_schema_text("{ \"tables\": "),
            Err(SchemaError::Parse(_))
        ));
    }
}

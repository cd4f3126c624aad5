//! JSON loading into a [`FlatTable`].
//!
//! Accepted documents:
//! - a single object: `{"Fruit": "Apple"}`
//! - an array of objects: `[{"Fruit": "Apple"}, {"Fruit": "Pear"}]`
//! - newline-delimited objects (NDJSON), one per line
//!
//! Schema field names may be dot paths into nested objects (`origin.country`). A missing key is
//! an error; an explicit `null` becomes [`Value::Null`].

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as Json};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataType, Field, FlatTable, Schema, Value};

/// Load a JSON or NDJSON file.
pub fn ingest_json_from_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<FlatTable> {
    ingest_json_from_str(&fs::read_to_string(path)?, schema)
}

/// Load a JSON or NDJSON document held in memory.
pub fn ingest_json_from_str(input: &str, schema: &Schema) -> IngestionResult<FlatTable> {
    let records = parse_records(input)?;
    let rows = records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let row = idx + 1;
            let obj = record.as_object().ok_or_else(|| mismatch(format!("record {row} is not a json object")))?;
            schema
                .fields
                .iter()
                .map(|field| {
                    let raw = lookup(obj, &field.name).ok_or_else(|| {
                        mismatch(format!("record {row} missing required field '{}'", field.name))
                    })?;
                    convert(row, field, raw)
                })
                .collect::<IngestionResult<Vec<Value>>>()
        })
        .collect::<IngestionResult<Vec<_>>>()?;

    FlatTable::try_new(schema.clone(), rows)
}

fn parse_records(input: &str) -> IngestionResult<Vec<Json>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(mismatch("json input is empty".to_string()));
    }

    match serde_json::from_str::<Json>(trimmed) {
        Ok(Json::Array(items)) => Ok(items),
        Ok(obj @ Json::Object(_)) => Ok(vec![obj]),
        Ok(_) => Err(mismatch(
            "json must be an object, an array of objects, or NDJSON".to_string(),
        )),
        Err(_) => trimmed
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<Json>(line.trim())
                    .map_err(|e| mismatch(format!("invalid ndjson at line {}: {e}", i + 1)))
            })
            .collect(),
    }
}

fn lookup<'a>(root: &'a Map<String, Json>, path: &str) -> Option<&'a Json> {
    // A literal key containing dots wins over a nested path.
    if let Some(v) = root.get(path) {
        return Some(v);
    }
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn convert(row: usize, field: &Field, raw: &Json) -> IngestionResult<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let converted = match field.data_type {
        DataType::Utf8 => raw.as_str().map(Value::text).ok_or("expected string"),
        DataType::Bool => raw.as_bool().map(Value::Bool).ok_or("expected bool"),
        DataType::Int64 => match (raw.as_i64(), raw.as_u64()) {
            (Some(n), _) => Ok(Value::Int64(n)),
            (None, Some(_)) => Err("u64 out of range for i64"),
            (None, None) => Err("expected integer number"),
        },
        DataType::Float64 => raw.as_f64().map(Value::Float64).ok_or("expected number"),
    };

    converted.map_err(|message| IngestionError::ParseError {
        row,
        column: field.name.clone(),
        raw: raw.to_string(),
        message: message.to_string(),
    })
}

fn mismatch(message: String) -> IngestionError {
    IngestionError::SchemaMismatch { message }
}

#[cfg(test)]
mod tests {
    use super::ingest_json_from_str;
    use crate::error::IngestionError;
    use crate::types::{DataType, Field, Schema, Value};

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("Fruit", DataType::Utf8),
            Field::new("origin.country", DataType::Utf8),
            Field::new("Weight", DataType::Float64),
        ])
    }

    #[test]
    fn reads_nested_paths_and_nulls() {
        let t = ingest_json_from_str(
            r#"[{"Fruit": "Apple", "origin": {"country": "NZ"}, "Weight": 1},
                {"Fruit": "Pear", "origin": {"country": null}, "Weight": null}]"#,
            &schema(),
        )
        .unwrap();
        assert_eq!(
            t.rows,
            vec![
                vec![Value::text("Apple"), Value::text("NZ"), Value::Float64(1.0)],
                vec![Value::text("Pear"), Value::Null, Value::Null],
            ]
        );
    }

    #[test]
    fn dotted_literal_keys_are_accepted() {
        let t = ingest_json_from_str(
            r#"{"Fruit": "Apple", "origin.country": "NZ", "Weight": 2.5}"#,
            &schema(),
        )
        .unwrap();
        assert_eq!(t.rows[0][1], Value::text("NZ"));
    }

    #[test]
    fn type_errors_name_the_column() {
        let err = ingest_json_from_str(
            r#"{"Fruit": 3, "origin": {"country": "NZ"}, "Weight": 2.5}"#,
            &schema(),
        )
        .unwrap_err();
        assert!(matches!(err, IngestionError::ParseError { row: 1, ref column, .. } if column == "Fruit"));
    }
}

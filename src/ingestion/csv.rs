//! CSV loading into a [`FlatTable`].
//!
//! Two modes:
//!
//! - [`ingest_csv_from_path`] / [`ingest_csv_from_reader`]: parse against a caller schema. The
//!   header must contain every schema field; column order may differ and extra columns are
//!   ignored.
//! - [`ingest_csv_inferred_from_path`] / [`ingest_csv_inferred_from_reader`]: take every header
//!   column and infer its type from the data (see [`infer_data_type`]).
//!
//! Empty cells become [`Value::Null`] in both modes.

use std::io::Read;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};

use crate::error::{IngestionError, IngestionResult};
use crate::types::{DataType, Field, FlatTable, Schema, Value};

fn reader_for_path(path: impl AsRef<Path>) -> IngestionResult<Reader<std::fs::File>> {
    Ok(ReaderBuilder::new().has_headers(true).from_path(path)?)
}

/// Load a CSV file, parsing each column listed in `schema`.
pub fn ingest_csv_from_path(path: impl AsRef<Path>, schema: &Schema) -> IngestionResult<FlatTable> {
    ingest_csv_from_reader(&mut reader_for_path(path)?, schema)
}

/// Load CSV data from an existing reader, parsing each column listed in `schema`.
pub fn ingest_csv_from_reader<R: Read>(
    rdr: &mut Reader<R>,
    schema: &Schema,
) -> IngestionResult<FlatTable> {
    let headers = rdr.headers()?.clone();
    let positions = schema
        .fields
        .iter()
        .map(|field| {
            headers
                .iter()
                .position(|h| h.trim() == field.name)
                .ok_or_else(|| IngestionError::SchemaMismatch {
                    message: format!(
                        "missing required column '{}'. headers={:?}",
                        field.name,
                        headers.iter().collect::<Vec<_>>()
                    ),
                })
        })
        .collect::<IngestionResult<Vec<usize>>>()?;

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        // 1-based, and the header occupies line 1.
        let line = idx + 2;
        let row = schema
            .fields
            .iter()
            .zip(&positions)
            .map(|(field, &pos)| parse_cell(line, field, record.get(pos).unwrap_or("")))
            .collect::<IngestionResult<Vec<Value>>>()?;
        rows.push(row);
    }

    FlatTable::try_new(schema.clone(), rows)
}

/// Load a CSV file, inferring a schema from its header and contents.
pub fn ingest_csv_inferred_from_path(path: impl AsRef<Path>) -> IngestionResult<FlatTable> {
    ingest_csv_inferred_from_reader(&mut reader_for_path(path)?)
}

/// Load CSV data from a reader, inferring a schema from its header and contents.
pub fn ingest_csv_inferred_from_reader<R: Read>(rdr: &mut Reader<R>) -> IngestionResult<FlatTable> {
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    for (i, name) in headers.iter().enumerate() {
        if name.is_empty() {
            return Err(IngestionError::SchemaMismatch {
                message: format!("header column {} is empty", i + 1),
            });
        }
        if headers[..i].contains(name) {
            return Err(IngestionError::SchemaMismatch {
                message: format!("duplicate header '{name}'"),
            });
        }
    }

    let records = rdr.records().collect::<Result<Vec<StringRecord>, _>>()?;
    let schema = Schema::new(
        headers
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let cells = records.iter().map(|r| r.get(col).unwrap_or(""));
                Field::new(name.clone(), infer_data_type(cells))
            })
            .collect(),
    );

    let rows = records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            schema
                .fields
                .iter()
                .enumerate()
                .map(|(col, field)| parse_cell(idx + 2, field, record.get(col).unwrap_or("")))
                .collect::<IngestionResult<Vec<Value>>>()
        })
        .collect::<IngestionResult<Vec<_>>>()?;

    FlatTable::try_new(schema, rows)
}

/// Narrowest type every non-empty cell parses as.
///
/// Tried in order: `Int64`, `Float64`, `Bool` (literal `true`/`false`, any case), then `Utf8`.
/// A column with no non-empty cell is `Utf8`.
pub fn infer_data_type<'a>(cells: impl Iterator<Item = &'a str>) -> DataType {
    let mut int = true;
    let mut float = true;
    let mut boolean = true;
    let mut seen = false;

    for cell in cells.map(str::trim).filter(|c| !c.is_empty()) {
        seen = true;
        int &= cell.parse::<i64>().is_ok();
        float &= cell.parse::<f64>().is_ok();
        boolean &= cell.eq_ignore_ascii_case("true") || cell.eq_ignore_ascii_case("false");
        if !(int || float || boolean) {
            return DataType::Utf8;
        }
    }

    match (seen, int, float, boolean) {
        (false, ..) => DataType::Utf8,
        (true, true, ..) => DataType::Int64,
        (true, false, true, _) => DataType::Float64,
        (true, false, false, true) => DataType::Bool,
        _ => DataType::Utf8,
    }
}

/// Parse one text cell into `field`'s type. `line` is the 1-based source line for errors.
pub(crate) fn parse_cell(line: usize, field: &Field, raw: &str) -> IngestionResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parsed = match field.data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| e.to_string()),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| e.to_string()),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool),
    };

    parsed.map_err(|message| IngestionError::ParseError {
        row: line,
        column: field.name.clone(),
        raw: raw.to_owned(),
        message,
    })
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::infer_data_type;
    use crate::types::DataType;

    #[test]
    fn infers_narrowest_type() {
        assert_eq!(infer_data_type(["1", " 2 ", ""].into_iter()), DataType::Int64);
        assert_eq!(infer_data_type(["1", "2.5"].into_iter()), DataType::Float64);
        assert_eq!(infer_data_type(["True", "false"].into_iter()), DataType::Bool);
        assert_eq!(infer_data_type(["1", "Apple"].into_iter()), DataType::Utf8);
        assert_eq!(infer_data_type(["", " "].into_iter()), DataType::Utf8);
    }
}

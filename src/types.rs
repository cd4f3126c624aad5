//! Core data model: schema, scalar values and the in-memory [`FlatTable`].
//!
//! A flat table is a single-level, row-major grid: every row holds one [`Value`] per [`Schema`]
//! field, in schema order. It is the only input shape the pivot engine accepts.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{IngestionError, IngestionResult, PivotError, PivotOutcome};

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

impl DataType {
    /// Whether values of this type can feed an aggregate.
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing the shape of every row in a [`FlatTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns the field with the given name, if present.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A single scalar cell value.
///
/// Values are totally ordered so they can key groups and sort axes:
/// `Null < Bool < numbers < Utf8`. `Int64` and `Float64` compare numerically with each other,
/// and equality follows the same rule (`Int64(2) == Float64(2.0)`).
#[derive(Debug, Clone)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Shorthand for a string value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Utf8(s.into())
    }

    /// Numeric view of the value; `None` for null, bool and string values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string payload, if this is a `Utf8` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// True for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int64(_) | Value::Float64(_) => 2,
            Value::Utf8(_) => 3,
        }
    }
}

pub(crate) fn compare_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

/// Exact `i64` against `f64` ordering; no rounding of the integer through `f64`.
pub(crate) fn compare_i64_f64(i: i64, f: f64) -> Ordering {
    // 2^63: the first float past i64::MAX.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return compare_f64(i as f64, f);
    }
    if f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => compare_f64(whole, f),
        unequal => unequal,
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Utf8(a), Value::Utf8(b)) => a.cmp(b),
            (Value::Int64(a), Value::Float64(b)) => compare_i64_f64(*a, *b),
            (Value::Float64(a), Value::Int64(b)) => compare_i64_f64(*b, *a).reverse(),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => compare_f64(a, b),
                _ => self.type_rank().cmp(&other.type_rank()),
            },
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::Float64(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Utf8(s) => serializer.serialize_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

/// A borrowed, name-addressable view of one table row.
///
/// This is what row predicates receive.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    schema: &'a Schema,
    values: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn new(schema: &'a Schema, values: &'a [Value]) -> Self {
        Self { schema, values }
    }

    /// Look a value up by field name.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.schema.index_of(name).and_then(|idx| self.values.get(idx))
    }

    /// Positional access, in schema order.
    pub fn value_at(&self, idx: usize) -> Option<&'a Value> {
        self.values.get(idx)
    }

    /// Cells in schema order.
    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// Schema the row is read against.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }
}

/// In-memory flat table.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTable {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl FlatTable {
    /// Create a table from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Create a table, rejecting rows whose arity differs from the schema.
    pub fn try_new(schema: Schema, rows: Vec<Vec<Value>>) -> IngestionResult<Self> {
        let expected = schema.fields.len();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(IngestionError::SchemaMismatch {
                message: format!(
                    "row {} has {} values but the schema has {} fields",
                    idx + 1,
                    row.len(),
                    expected
                ),
            });
        }
        Ok(Self { schema, rows })
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Borrow row `idx` as a [`Row`] view.
    pub fn row(&self, idx: usize) -> Option<Row<'_>> {
        self.rows.get(idx).map(|r| Row::new(&self.schema, r))
    }

    /// Iterate all rows as [`Row`] views.
    pub fn iter_rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|r| Row::new(&self.schema, r))
    }

    /// Returns the column index of `name`, failing with [`PivotError::UnknownField`].
    pub fn column_index(&self, name: &str) -> PivotOutcome<usize> {
        self.schema
            .index_of(name)
            .ok_or_else(|| PivotError::unknown_field(name))
    }

    /// Create a new table containing only rows that match `predicate`.
    ///
    /// The returned table preserves the original schema and row order.
    pub fn filter_rows<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Row<'_>) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(&Row::new(&self.schema, row)))
            .cloned()
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Sorted distinct values of a column.
    pub fn uniques(&self, name: &str) -> PivotOutcome<Vec<Value>> {
        let idx = self.column_index(name)?;
        let set: BTreeSet<&Value> = self.rows.iter().filter_map(|r| r.get(idx)).collect();
        Ok(set.into_iter().cloned().collect())
    }
}

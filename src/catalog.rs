//! Field catalog: the semantic role of every pivotable field.
//!
//! The catalog is built once per schema and never mutated. It decides which fields may group
//! rows (categorical or ordinal) and which fields are aggregated, and with which
//! [`Aggregator`].
//!
//! Catalogs can be declared in code or loaded from JSON:
//!
//! ```rust
//! use pivot_broker::catalog::{FieldCatalog, Role};
//! use pivot_broker::types::{DataType, Field, Schema};
//!
//! let schema = Schema::new(vec![
//!     Field::new("Fruit", DataType::Utf8),
//!     Field::new("Weight", DataType::Float64),
//!     Field::new("Price", DataType::Float64),
//! ]);
//! let catalog = FieldCatalog::from_json_str(
//!     r#"[
//!         {"name": "Fruit", "role": "grouping_categorical"},
//!         {"name": "Weight", "role": "aggregate", "aggregator": "sum"},
//!         {"name": "Price", "role": "aggregate", "aggregator": "weighted_average", "weight_field": "Weight"}
//!     ]"#,
//!     &schema,
//! )
//! .unwrap();
//! assert_eq!(catalog.list_fields(), vec!["Fruit", "Weight", "Price"]);
//! assert_eq!(catalog.role("Price").unwrap(), Role::Aggregate);
//! ```

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::error::{PivotError, PivotOutcome};
pub use crate::processing::Aggregator;
use crate::types::{Schema, Value};

/// Reserved pseudo-field marking where the aggregate-name level sits on an axis.
pub const DATA_FIELD: &str = "(Data)";

/// Semantic role of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Unordered grouping field.
    GroupingCategorical,
    /// Grouping field with a defined order.
    GroupingOrdinal,
    /// Numeric field combined across grouped rows.
    Aggregate,
}

impl Role {
    pub fn is_grouping(self) -> bool {
        matches!(self, Role::GroupingCategorical | Role::GroupingOrdinal)
    }
}

/// Declaration of one catalog field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub role: Role,
    /// Set for (and only for) aggregate fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregator: Option<Aggregator>,
    /// Set for (and only for) weighted-average fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_field: Option<String>,
    /// Explicit level order for ordinal fields.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_levels"
    )]
    pub levels: Vec<Value>,
}

impl FieldDescriptor {
    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: Role::GroupingCategorical,
            aggregator: None,
            weight_field: None,
            levels: Vec::new(),
        }
    }

    /// Ordinal field; `levels` fixes the display order (empty means natural value order).
    pub fn ordinal(name: impl Into<String>, levels: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            role: Role::GroupingOrdinal,
            aggregator: None,
            weight_field: None,
            levels,
        }
    }

    /// Aggregate field using `Sum` or `Count`.
    ///
    /// Use [`FieldDescriptor::weighted_average`] for weighted averages.
    pub fn aggregate(name: impl Into<String>, aggregator: Aggregator) -> Self {
        Self {
            name: name.into(),
            role: Role::Aggregate,
            aggregator: Some(aggregator),
            weight_field: None,
            levels: Vec::new(),
        }
    }

    pub fn weighted_average(name: impl Into<String>, weight_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: Role::Aggregate,
            aggregator: Some(Aggregator::WeightedAverage),
            weight_field: Some(weight_field.into()),
            levels: Vec::new(),
        }
    }

    /// Compare two values of this field in axis order.
    ///
    /// Ordinal fields rank declared levels first (in declaration order); anything else falls
    /// back to natural value order.
    pub fn compare_values(&self, a: &Value, b: &Value) -> Ordering {
        if self.levels.is_empty() {
            return a.cmp(b);
        }
        let rank = |v: &Value| self.levels.iter().position(|l| l == v);
        match (rank(a), rank(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLevel {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn deserialize_levels<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Option<RawLevel>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|level| match level {
            None => Value::Null,
            Some(RawLevel::Bool(b)) => Value::Bool(b),
            Some(RawLevel::Int(i)) => Value::Int64(i),
            Some(RawLevel::Float(f)) => Value::Float64(f),
            Some(RawLevel::Text(s)) => Value::Utf8(s),
        })
        .collect())
}

/// Immutable, ordered set of [`FieldDescriptor`]s validated against a table schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCatalog {
    fields: Vec<FieldDescriptor>,
}

impl FieldCatalog {
    /// Build a catalog, validating every descriptor against `schema`.
    ///
    /// Fails with [`PivotError::UnknownField`] when a descriptor or a weight field names a
    /// column missing from the schema, and with [`PivotError::InvalidCatalog`] when the
    /// descriptors contradict each other.
    pub fn new(descriptors: Vec<FieldDescriptor>, schema: &Schema) -> PivotOutcome<Self> {
        let mut seen = HashSet::new();
        for d in &descriptors {
            if d.name == DATA_FIELD {
                return Err(invalid(format!("'{DATA_FIELD}' is reserved")));
            }
            if !seen.insert(d.name.as_str()) {
                return Err(invalid(format!("duplicate field '{}'", d.name)));
            }
            let column = schema
                .field(&d.name)
                .ok_or_else(|| PivotError::unknown_field(&d.name))?;

            match (d.role, d.aggregator) {
                (Role::Aggregate, None) => {
                    return Err(invalid(format!(
                        "aggregate field '{}' has no aggregator",
                        d.name
                    )));
                }
                (Role::Aggregate, Some(_)) => {
                    if !column.data_type.is_numeric() {
                        return Err(invalid(format!(
                            "aggregate field '{}' must be numeric, found {:?}",
                            d.name, column.data_type
                        )));
                    }
                }
                (_, Some(_)) => {
                    return Err(invalid(format!(
                        "grouping field '{}' cannot declare an aggregator",
                        d.name
                    )));
                }
                (_, None) => {}
            }

            if !d.levels.is_empty() && d.role != Role::GroupingOrdinal {
                return Err(invalid(format!(
                    "only ordinal fields declare levels ('{}')",
                    d.name
                )));
            }

            let weighted = d.aggregator == Some(Aggregator::WeightedAverage);
            match (&d.weight_field, weighted) {
                (Some(_), false) => {
                    return Err(invalid(format!(
                        "field '{}' declares a weight field but is not a weighted average",
                        d.name
                    )));
                }
                (None, true) => {
                    return Err(invalid(format!(
                        "weighted average field '{}' has no weight field",
                        d.name
                    )));
                }
                _ => {}
            }
        }

        // Weight references are checked once every descriptor is known.
        for d in &descriptors {
            let Some(weight) = d.weight_field.as_deref() else {
                continue;
            };
            if weight == d.name {
                return Err(invalid(format!("field '{}' cannot weight itself", d.name)));
            }
            if schema.index_of(weight).is_none() {
                return Err(PivotError::unknown_field(weight));
            }
            match descriptors.iter().find(|w| w.name == weight) {
                Some(w) if w.role == Role::Aggregate => {}
                Some(_) => {
                    return Err(invalid(format!(
                        "weight field '{weight}' of '{}' is not an aggregate field",
                        d.name
                    )));
                }
                None => return Err(PivotError::unknown_field(weight)),
            }
        }

        Ok(Self {
            fields: descriptors,
        })
    }

    /// Deserialize descriptors from a JSON array and validate them against `schema`.
    pub fn from_json_str(json: &str, schema: &Schema) -> PivotOutcome<Self> {
        let descriptors: Vec<FieldDescriptor> = serde_json::from_str(json)?;
        Self::new(descriptors, schema)
    }

    pub fn describe(&self, name: &str) -> PivotOutcome<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| PivotError::unknown_field(name))
    }

    /// Role of `name`; the reserved [`DATA_FIELD`] groups like a categorical field.
    pub fn role(&self, name: &str) -> PivotOutcome<Role> {
        if name == DATA_FIELD {
            return Ok(Role::GroupingCategorical);
        }
        self.describe(name).map(|d| d.role)
    }

    /// Field names in catalog (display) order.
    pub fn list_fields(&self) -> Vec<&str> {
        self.fields.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn invalid(message: String) -> PivotError {
    PivotError::InvalidCatalog { message }
}

#[cfg(test)]
mod tests {
    use super::{FieldCatalog, FieldDescriptor, Role, DATA_FIELD};
    use crate::error::PivotError;
    use crate::processing::Aggregator;
    use crate::types::{DataType, Field, Schema, Value};
    use std::cmp::Ordering;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("Year", DataType::Int64),
            Field::new("Fruit", DataType::Utf8),
            Field::new("Weight", DataType::Float64),
            Field::new("Price", DataType::Float64),
        ])
    }

    fn descriptors() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::ordinal("Year", vec![]),
            FieldDescriptor::categorical("Fruit"),
            FieldDescriptor::aggregate("Weight", Aggregator::Sum),
            FieldDescriptor::weighted_average("Price", "Weight"),
        ]
    }

    #[test]
    fn describe_and_list_follow_declaration_order() {
        let catalog = FieldCatalog::new(descriptors(), &schema()).unwrap();
        assert_eq!(catalog.list_fields(), vec!["Year", "Fruit", "Weight", "Price"]);
        assert_eq!(
            catalog.describe("Price").unwrap().weight_field.as_deref(),
            Some("Weight")
        );
        assert_eq!(catalog.role(DATA_FIELD).unwrap(), Role::GroupingCategorical);
        assert!(matches!(
            catalog.describe("Volume"),
            Err(PivotError::UnknownField { field }) if field == "Volume"
        ));
    }

    #[test]
    fn dangling_weight_field_is_unknown() {
        let mut ds = descriptors();
        ds[3] = FieldDescriptor::weighted_average("Price", "Volume");
        let err = FieldCatalog::new(ds, &schema()).unwrap_err();
        assert!(matches!(err, PivotError::UnknownField { field } if field == "Volume"));
    }

    #[test]
    fn weight_field_must_be_aggregate() {
        let mut ds = descriptors();
        ds[3] = FieldDescriptor::weighted_average("Price", "Year");
        let err = FieldCatalog::new(ds, &schema()).unwrap_err();
        assert!(matches!(err, PivotError::InvalidCatalog { .. }));
    }

    #[test]
    fn weight_field_only_for_weighted_average() {
        let mut ds = descriptors();
        ds[2].weight_field = Some("Price".to_string());
        assert!(matches!(
            FieldCatalog::new(ds, &schema()),
            Err(PivotError::InvalidCatalog { .. })
        ));
    }

    #[test]
    fn aggregate_fields_must_be_numeric() {
        let mut ds = descriptors();
        ds[1] = FieldDescriptor::aggregate("Fruit", Aggregator::Count);
        assert!(matches!(
            FieldCatalog::new(ds, &schema()),
            Err(PivotError::InvalidCatalog { .. })
        ));
    }

    #[test]
    fn descriptor_for_missing_column_is_unknown() {
        let mut ds = descriptors();
        ds.push(FieldDescriptor::categorical("Shape"));
        assert!(matches!(
            FieldCatalog::new(ds, &schema()),
            Err(PivotError::UnknownField { .. })
        ));
    }

    #[test]
    fn json_catalog_round_trips_levels() {
        let catalog = FieldCatalog::from_json_str(
            r#"[
                {"name": "Fruit", "role": "grouping_ordinal", "levels": ["Pear", "Apple"]},
                {"name": "Weight", "role": "aggregate", "aggregator": "count"}
            ]"#,
            &schema(),
        )
        .unwrap();
        let fruit = catalog.describe("Fruit").unwrap();
        assert_eq!(fruit.levels, vec![Value::text("Pear"), Value::text("Apple")]);
        assert_eq!(
            fruit.compare_values(&Value::text("Pear"), &Value::text("Apple")),
            Ordering::Less
        );
        assert_eq!(
            fruit.compare_values(&Value::text("Kiwi"), &Value::text("Apple")),
            Ordering::Greater
        );
        assert_eq!(
            catalog.describe("Weight").unwrap().aggregator,
            Some(Aggregator::Count)
        );
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = FieldCatalog::from_json_str("[{", &schema()).unwrap_err();
        assert!(err.to_string().starts_with("json error"));
    }
}

//! Aggregation reductions for pivot cells.

use serde::{Deserialize, Serialize};

use crate::catalog::FieldDescriptor;
use crate::error::{PivotError, PivotOutcome};
use crate::types::{FlatTable, Value};

/// Built-in aggregators for aggregate-role fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    /// Arithmetic sum, ignoring nulls. Empty groups sum to `0`.
    Sum,
    /// Number of rows in the group (including nulls).
    Count,
    /// `Σ(value·weight) / Σ(weight)`, skipping rows where either side is null.
    ///
    /// A group whose total weight is `0` yields `0` rather than a division fault.
    WeightedAverage,
}

impl Aggregator {
    /// Reduce one group.
    ///
    /// `weights` is only consulted by [`Aggregator::WeightedAverage`] and must then be
    /// index-aligned with `values`.
    pub fn reduce(self, values: &[Option<f64>], weights: &[Option<f64>]) -> f64 {
        match self {
            Aggregator::Sum => values.iter().flatten().sum(),
            Aggregator::Count => values.len() as f64,
            Aggregator::WeightedAverage => {
                let (weighted, total) = values
                    .iter()
                    .zip(weights)
                    .filter_map(|(v, w)| Some(((*v)?, (*w)?)))
                    .fold((0.0, 0.0), |(acc_vw, acc_w), (v, w)| {
                        (acc_vw + v * w, acc_w + w)
                    });
                if total == 0.0 { 0.0 } else { weighted / total }
            }
        }
    }
}

/// Numeric values of column `idx` for the given rows.
///
/// Nulls come back as `None`; strings, booleans and non-finite floats abort with
/// [`PivotError::NonNumericCell`].
pub(crate) fn numeric_values(
    table: &FlatTable,
    idx: usize,
    field: &str,
    rows: &[usize],
) -> PivotOutcome<Vec<Option<f64>>> {
    rows.iter()
        .map(|&r| match table.rows[r].get(idx) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => match v.as_f64() {
                Some(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(PivotError::NonNumericCell {
                    field: field.to_string(),
                    row: r,
                    value: format!("{v:?}"),
                }),
            },
        })
        .collect()
}

/// Aggregate one catalog field over a subset of table rows.
pub(crate) fn aggregate_rows(
    table: &FlatTable,
    descriptor: &FieldDescriptor,
    rows: &[usize],
) -> PivotOutcome<f64> {
    let aggregator = descriptor
        .aggregator
        .ok_or_else(|| PivotError::invalid_request(format!("'{}' is not an aggregate field", descriptor.name)))?;
    let idx = table.column_index(&descriptor.name)?;
    let values = numeric_values(table, idx, &descriptor.name, rows)?;
    let weights = match descriptor.weight_field.as_deref() {
        Some(w) if aggregator == Aggregator::WeightedAverage => {
            let widx = table.column_index(w)?;
            numeric_values(table, widx, w, rows)?
        }
        _ => Vec::new(),
    };

    let out = aggregator.reduce(&values, &weights);
    if !out.is_finite() {
        return Err(PivotError::NonNumericCell {
            field: descriptor.name.clone(),
            row: rows.first().copied().unwrap_or(0),
            value: out.to_string(),
        });
    }
    Ok(out)
}

/// Reduce a catalog field across every row of `table`.
///
/// This is the single-group case of the pivot: no row or column fields, one cell per aggregate.
pub fn reduce(table: &FlatTable, descriptor: &FieldDescriptor) -> PivotOutcome<f64> {
    let all: Vec<usize> = (0..table.row_count()).collect();
    aggregate_rows(table, descriptor, &all)
}

//! Pivot requests and their structural validation.

use std::collections::HashSet;

use crate::catalog::{DATA_FIELD, FieldCatalog, Role};
use crate::error::{PivotError, PivotOutcome};
use crate::filter::RowPredicate;

/// Field assignment plus filters for one pivot computation.
///
/// ```rust
/// use pivot_broker::pivot::PivotRequest;
///
/// let request = PivotRequest::new()
///     .rows(["Fruit"])
///     .cols(["Year", "(Data)"])
///     .aggs(["Weight"]);
/// assert_eq!(request.cols, vec!["Year", "(Data)"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PivotRequest {
    /// Conjunction of row filters applied before grouping.
    pub filters: Vec<RowPredicate>,
    /// Row grouping fields, outermost first; may include `(Data)`.
    pub rows: Vec<String>,
    /// Column grouping fields, outermost first; may include `(Data)`.
    pub cols: Vec<String>,
    /// Aggregate fields, in output order.
    pub aggs: Vec<String>,
}

impl PivotRequest {
    /// An empty request: no filters, fields or aggregates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the row fields.
    pub fn rows<I, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows = rows.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the column fields.
    pub fn cols<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cols = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the aggregate fields.
    pub fn aggs<I, S>(mut self, aggs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aggs = aggs.into_iter().map(Into::into).collect();
        self
    }

    /// Add one filter; all filters must accept a row for it to be kept.
    pub fn filter(mut self, predicate: RowPredicate) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Add several filters at once.
    pub fn filters<I>(mut self, predicates: I) -> Self
    where
        I: IntoIterator<Item = RowPredicate>,
    {
        self.filters.extend(predicates);
        self
    }

    /// Check the request against `catalog` and resolve where the aggregate-name level goes.
    pub(crate) fn layout(&self, catalog: &FieldCatalog) -> PivotOutcome<Layout> {
        let mut seen = HashSet::new();
        for name in self.rows.iter().chain(&self.cols) {
            if name == DATA_FIELD {
                continue;
            }
            if !catalog.describe(name)?.role.is_grouping() {
                return Err(PivotError::invalid_request(format!(
                    "aggregate field '{name}' cannot be placed on the row or column axis"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(PivotError::invalid_request(format!(
                    "field '{name}' is used more than once across rows and columns"
                )));
            }
        }

        let mut seen_aggs = HashSet::new();
        for name in &self.aggs {
            if catalog.describe(name)?.role != Role::Aggregate {
                return Err(PivotError::invalid_request(format!(
                    "grouping field '{name}' cannot be aggregated"
                )));
            }
            if !seen_aggs.insert(name.as_str()) {
                return Err(PivotError::invalid_request(format!(
                    "aggregate '{name}' is requested more than once"
                )));
            }
        }

        let in_rows = self.rows.iter().filter(|n| *n == DATA_FIELD).count();
        let in_cols = self.cols.iter().filter(|n| *n == DATA_FIELD).count();
        if in_rows + in_cols > 1 {
            return Err(PivotError::invalid_request(format!(
                "'{DATA_FIELD}' must appear on exactly one axis, once"
            )));
        }
        if in_rows + in_cols == 0 && !self.aggs.is_empty() && !seen.is_empty() {
            return Err(PivotError::invalid_request(format!(
                "'{DATA_FIELD}' must be placed on the row or column axis when aggregating"
            )));
        }

        let transpose = in_rows == 1;
        let (rows, cols) = if transpose {
            (&self.cols, &self.rows)
        } else {
            (&self.rows, &self.cols)
        };
        let data_pos = cols
            .iter()
            .position(|n| n == DATA_FIELD)
            .unwrap_or(cols.len());

        Ok(Layout {
            rows: rows.clone(),
            cols: cols.iter().filter(|n| *n != DATA_FIELD).cloned().collect(),
            aggs: self.aggs.clone(),
            data_pos,
            transpose,
        })
    }
}

/// A validated request, normalised so the aggregate-name level always sits on the column axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    pub rows: Vec<String>,
    /// Real grouping fields only.
    pub cols: Vec<String>,
    pub aggs: Vec<String>,
    /// Index of the aggregate-name level among the column levels.
    pub data_pos: usize,
    /// The caller placed the aggregate names on the row axis.
    pub transpose: bool,
}

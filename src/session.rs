//! Interactive pivot state: which fields sit in which area, and which filters are active.
//!
//! A [`PivotSession`] is what a table UI talks to. Dragging a field onto an area becomes
//! [`PivotSession::place_field`], a filter button becomes a [`FilterId`], and every change is
//! followed by [`PivotSession::refresh`], which recomputes the pivot from scratch.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{DATA_FIELD, Role};
use crate::error::{PivotError, PivotOutcome};
use crate::filter::{CompiledExpression, RowPredicate, compile_checklist};
use crate::pivot::{PivotEngine, PivotRequest, PivotResult};
use crate::types::Value;

/// Drop target for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Rows,
    Columns,
    /// Aggregated fields.
    Data,
}

/// Handle to one active filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(u64);

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter#{}", self.0)
    }
}

/// A filter attached to one field.
#[derive(Debug, Clone)]
pub struct ActiveFilter {
    pub field: String,
    /// Human-readable summary of the current condition; `None` while the filter accepts all.
    pub label: Option<String>,
    predicate: RowPredicate,
}

impl ActiveFilter {
    pub fn predicate(&self) -> &RowPredicate {
        &self.predicate
    }
}

/// Field layout and filters over one [`PivotEngine`].
pub struct PivotSession {
    engine: PivotEngine,
    rows: Vec<String>,
    cols: Vec<String>,
    aggs: Vec<String>,
    filters: BTreeMap<FilterId, ActiveFilter>,
    next_filter: u64,
}

impl PivotSession {
    /// Start with an empty layout and no filters.
    pub fn new(engine: PivotEngine) -> Self {
        Self {
            engine,
            rows: Vec::new(),
            cols: Vec::new(),
            aggs: Vec::new(),
            filters: BTreeMap::new(),
            next_filter: 0,
        }
    }

    /// The engine every refresh queries.
    pub fn engine(&self) -> &PivotEngine {
        &self.engine
    }

    pub fn fields_in(&self, area: Area) -> &[String] {
        match area {
            Area::Rows => &self.rows,
            Area::Columns => &self.cols,
            Area::Data => &self.aggs,
        }
    }

    /// Area currently holding `field`, if any.
    pub fn area_of(&self, field: &str) -> Option<Area> {
        [Area::Rows, Area::Columns, Area::Data]
            .into_iter()
            .find(|&area| self.fields_in(area).iter().any(|f| f == field))
    }

    /// Put `field` into `area` at `position` (appended when `None` or past the end).
    ///
    /// A field that is already placed moves. Grouping fields and `(Data)` may only go to
    /// rows or columns; aggregate fields only to the data area.
    pub fn place_field(
        &mut self,
        field: &str,
        area: Area,
        position: Option<usize>,
    ) -> PivotOutcome<()> {
        let role = self.engine.catalog().role(field)?;
        let fits = match area {
            Area::Rows | Area::Columns => role.is_grouping(),
            Area::Data => role == Role::Aggregate && field != DATA_FIELD,
        };
        if !fits {
            return Err(PivotError::invalid_request(format!(
                "field '{field}' cannot be placed in the {area:?} area"
            )));
        }

        self.remove_field(field);
        let slot = self.area_mut(area);
        let at = position.unwrap_or(slot.len()).min(slot.len());
        slot.insert(at, field.to_string());
        Ok(())
    }

    /// Take `field` out of whichever area holds it. Returns whether it was placed.
    pub fn remove_field(&mut self, field: &str) -> bool {
        let Some(area) = self.area_of(field) else {
            return false;
        };
        self.area_mut(area).retain(|f| f != field);
        true
    }

    /// Swap `field` with its neighbour (the next one when `forward`, else the previous one).
    ///
    /// Returns `false` when the field is not placed or already at that end of its area.
    pub fn shift_field(&mut self, field: &str, forward: bool) -> bool {
        let Some(area) = self.area_of(field) else {
            return false;
        };
        let slot = self.area_mut(area);
        let Some(idx) = slot.iter().position(|f| f == field) else {
            return false;
        };
        let other = if forward {
            idx + 1
        } else {
            match idx.checked_sub(1) {
                Some(prev) => prev,
                None => return false,
            }
        };
        if other >= slot.len() {
            return false;
        }
        slot.swap(idx, other);
        true
    }

    /// Remove every field from every area. Filters are kept.
    pub fn clear_layout(&mut self) {
        self.rows.clear();
        self.cols.clear();
        self.aggs.clear();
    }

    fn area_mut(&mut self, area: Area) -> &mut Vec<String> {
        match area {
            Area::Rows => &mut self.rows,
            Area::Columns => &mut self.cols,
            Area::Data => &mut self.aggs,
        }
    }

    /// Attach an accept-all filter to `field`. Each field has at most one filter.
    pub fn add_filter(&mut self, field: &str) -> PivotOutcome<FilterId> {
        if field == DATA_FIELD {
            return Err(PivotError::invalid_request(format!(
                "'{DATA_FIELD}' cannot be filtered"
            )));
        }
        self.engine.catalog().describe(field)?;
        if self.filters.values().any(|f| f.field == field) {
            return Err(PivotError::invalid_request(format!(
                "field '{field}' already has a filter"
            )));
        }

        let id = FilterId(self.next_filter);
        self.next_filter += 1;
        self.filters.insert(
            id,
            ActiveFilter {
                field: field.to_string(),
                label: None,
                predicate: RowPredicate::accept_all(),
            },
        );
        Ok(id)
    }

    /// Look up an active filter; unknown ids are an error.
    pub fn filter(&self, id: FilterId) -> PivotOutcome<&ActiveFilter> {
        self.filters.get(&id).ok_or_else(|| unknown_filter(id))
    }

    /// Active filters in creation order.
    pub fn filters(&self) -> impl Iterator<Item = (FilterId, &ActiveFilter)> {
        self.filters.iter().map(|(id, f)| (*id, f))
    }

    /// Replace a filter's condition with an arbitrary predicate.
    pub fn set_filter_predicate(
        &mut self,
        id: FilterId,
        predicate: RowPredicate,
        label: impl Into<String>,
    ) -> PivotOutcome<()> {
        let slot = self.filters.get_mut(&id).ok_or_else(|| unknown_filter(id))?;
        slot.predicate = predicate;
        slot.label = Some(label.into());
        Ok(())
    }

    /// Keep only rows whose filtered field holds one of `values`.
    pub fn set_checklist(&mut self, id: FilterId, values: Vec<Value>) -> PivotOutcome<()> {
        let field = self.filter(id)?.field.clone();
        let shown: Vec<String> = values.iter().map(ToString::to_string).collect();
        let label = format!("{field} in [{}]", shown.join(", "));
        self.set_filter_predicate(id, compile_checklist(field, values), label)
    }

    /// Compile `text` against the catalog's field names and use it as the filter's condition.
    ///
    /// On a compilation error the previous condition stays in place.
    pub fn set_expression(&mut self, id: FilterId, text: &str) -> PivotOutcome<()> {
        self.filter(id)?;
        let compiled = CompiledExpression::compile(text, &self.engine.get_field_list())?;
        let label = compiled.to_string();
        self.set_filter_predicate(id, RowPredicate::from(compiled), label)
    }

    pub fn remove_filter(&mut self, id: FilterId) -> bool {
        self.filters.remove(&id).is_some()
    }

    /// Distinct values of the filtered field, for checklist dialogs.
    pub fn filter_options(&self, id: FilterId) -> PivotOutcome<Vec<Value>> {
        let field = &self.filter(id)?.field;
        self.engine.get_uniques(field)
    }

    /// The request the current layout and filters describe.
    pub fn request(&self) -> PivotRequest {
        PivotRequest::new()
            .rows(self.rows.iter().cloned())
            .cols(self.cols.iter().cloned())
            .aggs(self.aggs.iter().cloned())
            .filters(self.filters.values().map(|f| f.predicate.clone()))
    }

    /// Recompute the pivot for the current layout and filters.
    pub fn refresh(&self) -> PivotOutcome<PivotResult> {
        self.engine.compute(&self.request())
    }
}

fn unknown_filter(id: FilterId) -> PivotError {
    PivotError::invalid_request(format!("no active filter {id}"))
}

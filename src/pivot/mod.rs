//! The pivot broker: filter, group, aggregate and reshape a [`FlatTable`].
//!
//! A computation runs in stages:
//!
//! 1. validate the request against the catalog (nothing is read before this succeeds)
//! 2. filter rows with the conjunction of the request's predicates
//! 3. if `(Data)` sits on the row axis, swap the axes and remember to transpose
//! 4. group rows by their row-field and column-field values
//! 5. reduce every group with each requested aggregate (row counts when none is requested)
//! 6. lay the groups out on a grid: sorted row keys, and column keys with the aggregate-name
//!    level inserted where `(Data)` was placed; combinations without rows are filled with `0`
//! 7. transpose if step 3 swapped the axes
//!
//! ```rust
//! use pivot_broker::catalog::{FieldCatalog, FieldDescriptor};
//! use pivot_broker::pivot::PivotEngine;
//! use pivot_broker::processing::Aggregator;
//! use pivot_broker::types::{DataType, Field, FlatTable, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("Fruit", DataType::Utf8),
//!     Field::new("Year", DataType::Int64),
//!     Field::new("Weight", DataType::Float64),
//! ]);
//! let catalog = FieldCatalog::new(
//!     vec![
//!         FieldDescriptor::categorical("Fruit"),
//!         FieldDescriptor::ordinal("Year", Vec::new()),
//!         FieldDescriptor::aggregate("Weight", Aggregator::Sum),
//!     ],
//!     &schema,
//! )
//! .unwrap();
//! let table = FlatTable::new(
//!     schema,
//!     vec![
//!         vec![Value::text("Apple"), Value::Int64(2022), Value::Float64(1.0)],
//!         vec![Value::text("Apple"), Value::Int64(2023), Value::Float64(3.0)],
//!         vec![Value::text("Pear"), Value::Int64(2022), Value::Float64(2.0)],
//!         vec![Value::text("Pear"), Value::Int64(2022), Value::Float64(4.0)],
//!     ],
//! );
//!
//! let engine = PivotEngine::new(table, catalog);
//! let result = engine
//!     .get_pivot(&[], &["Fruit"], &["Year", "(Data)"], &["Weight"])
//!     .unwrap();
//!
//! assert_eq!(result.shape(), (2, 2));
//! assert_eq!(result.cells, vec![vec![1.0, 3.0], vec![6.0, 0.0]]);
//! ```

mod compact;
mod request;
mod result;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

pub use compact::{compact, compact_labels};
pub use request::PivotRequest;
pub use result::{ColumnNode, PivotResult};

use crate::catalog::{FieldCatalog, FieldDescriptor, Role};
use crate::error::{PivotError, PivotOutcome};
use crate::execution::{ExecutionEngine, ExecutionEvent, ExecutionObserver};
use crate::filter::{RowPredicate, combine};
use crate::processing::aggregate::aggregate_rows;
use crate::processing::filter;
use crate::types::{FlatTable, Value};
use request::Layout;

/// Name of the column level holding aggregate names.
pub const FIELD_LEVEL: &str = "Field";
/// Row label used when no row field is selected.
pub const VALUE_LABEL: &str = "Value";
/// Aggregate name used when no aggregate field is selected and rows are counted instead.
pub const COUNT_MEASURE: &str = "Count";

/// Pivot engine over one immutable table and its field catalog.
pub struct PivotEngine {
    table: FlatTable,
    catalog: FieldCatalog,
    execution: Option<ExecutionEngine>,
    observer: Option<Arc<dyn ExecutionObserver>>,
}

impl PivotEngine {
    /// Create an engine over `table`; filtering runs on the calling thread until
    /// [`with_execution`](Self::with_execution) is used.
    pub fn new(table: FlatTable, catalog: FieldCatalog) -> Self {
        Self {
            table,
            catalog,
            execution: None,
            observer: None,
        }
    }

    /// Filter rows on `engine`'s thread pool instead of the calling thread.
    pub fn with_execution(mut self, engine: ExecutionEngine) -> Self {
        self.execution = Some(engine);
        self
    }

    /// Receive [`ExecutionEvent::PivotStarted`] / [`ExecutionEvent::PivotFinished`] events.
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The unfiltered source table.
    pub fn table(&self) -> &FlatTable {
        &self.table
    }

    /// Roles and aggregators of the table's fields.
    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Catalog fields in display order.
    pub fn get_field_list(&self) -> Vec<&str> {
        self.catalog.list_fields()
    }

    pub fn get_field_type(&self, name: &str) -> PivotOutcome<Role> {
        self.catalog.role(name)
    }

    /// Distinct values of `field`, in axis order for catalog fields.
    pub fn get_uniques(&self, field: &str) -> PivotOutcome<Vec<Value>> {
        let mut values = self.table.uniques(field)?;
        if let Ok(descriptor) = self.catalog.describe(field) {
            values.sort_by(|a, b| descriptor.compare_values(a, b));
        }
        Ok(values)
    }

    /// Rows passing every filter.
    pub fn get_filtered(&self, filters: &[RowPredicate]) -> FlatTable {
        self.filtered(filters).into_owned()
    }

    /// Convenience form of [`PivotEngine::compute`].
    pub fn get_pivot(
        &self,
        filters: &[RowPredicate],
        rows: &[&str],
        cols: &[&str],
        aggs: &[&str],
    ) -> PivotOutcome<PivotResult> {
        let request = PivotRequest::new()
            .filters(filters.iter().cloned())
            .rows(rows.iter().copied())
            .cols(cols.iter().copied())
            .aggs(aggs.iter().copied());
        self.compute(&request)
    }

    /// Compute a pivot table from scratch.
    pub fn compute(&self, request: &PivotRequest) -> PivotOutcome<PivotResult> {
        let layout = request.layout(&self.catalog)?;
        let start = Instant::now();
        self.emit(ExecutionEvent::PivotStarted {
            rows: request.rows.clone(),
            cols: request.cols.clone(),
            aggs: request.aggs.clone(),
        });

        let table = self.filtered(&request.filters);
        let result = self.reshape(&table, &layout)?;
        let result = if layout.transpose {
            result.transpose()
        } else {
            result
        };

        let (result_rows, result_cols) = result.shape();
        self.emit(ExecutionEvent::PivotFinished {
            input_rows: table.row_count(),
            result_rows,
            result_cols,
            elapsed: start.elapsed(),
        });
        Ok(result)
    }

    fn filtered(&self, filters: &[RowPredicate]) -> Cow<'_, FlatTable> {
        if filters.is_empty() {
            return Cow::Borrowed(&self.table);
        }
        let predicate = combine(filters);
        Cow::Owned(match &self.execution {
            Some(engine) => engine.filter_parallel(&self.table, &predicate),
            None => filter(&self.table, &predicate),
        })
    }

    fn reshape(&self, table: &FlatTable, layout: &Layout) -> PivotOutcome<PivotResult> {
        if layout.rows.is_empty() && layout.cols.is_empty() && layout.aggs.is_empty() {
            return Ok(placeholder());
        }

        // No aggregates: one synthetic measure counting rows.
        let measures = if layout.aggs.is_empty() {
            vec![Measure::Count]
        } else {
            layout
                .aggs
                .iter()
                .map(|name| self.catalog.describe(name).map(Measure::Field))
                .collect::<PivotOutcome<Vec<_>>>()?
        };
        let row_axis = Axis::resolve(&self.catalog, table, &layout.rows)?;
        let col_axis = Axis::resolve(&self.catalog, table, &layout.cols)?;

        let keyed: Vec<(Vec<Value>, Vec<Value>)> = table
            .rows
            .iter()
            .map(|values| (row_axis.key_of(values), col_axis.key_of(values)))
            .collect();
        let row_keys = row_axis.distinct_keys(keyed.iter().map(|(r, _)| r));
        let combos = col_axis.distinct_keys(keyed.iter().map(|(_, c)| c));

        let row_pos = positions(&row_keys);
        let combo_pos = positions(&combos);
        let mut members = vec![vec![Vec::new(); combos.len()]; row_keys.len()];
        for (i, (rk, ck)) in keyed.iter().enumerate() {
            let (Some(&r), Some(&c)) = (row_pos.get(rk), combo_pos.get(ck)) else {
                return Err(PivotError::invalid_request(format!(
                    "row {i} has a group key missing from the distinct keys"
                )));
            };
            members[r][c].push(i);
        }

        let columns = column_order(&col_axis, &combos, measures.len(), layout.data_pos);

        let mut cells = Vec::with_capacity(row_keys.len());
        for groups in &members {
            let mut line = Vec::with_capacity(columns.len());
            for &(c, m) in &columns {
                let rows = &groups[c];
                line.push(if rows.is_empty() {
                    0.0
                } else {
                    measures[m].evaluate(table, rows)?
                });
            }
            cells.push(line);
        }

        let mut col_names = layout.cols.clone();
        col_names.insert(layout.data_pos, FIELD_LEVEL.to_string());
        let col_keys = columns
            .iter()
            .map(|&(c, m)| {
                let mut key = combos[c].clone();
                key.insert(layout.data_pos, Value::text(measures[m].name()));
                key
            })
            .collect();

        // No row fields: a single unnamed level holding the "Value" row.
        let (row_names, row_keys) = if layout.rows.is_empty() {
            (vec![String::new()], vec![vec![Value::text(VALUE_LABEL)]])
        } else {
            (layout.rows.clone(), row_keys)
        };

        Ok(PivotResult {
            row_names,
            row_keys,
            col_names,
            col_keys,
            cells,
        })
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

/// What a grid column aggregates.
enum Measure<'a> {
    Field(&'a FieldDescriptor),
    Count,
}

impl Measure<'_> {
    fn name(&self) -> &str {
        match self {
            Measure::Field(d) => &d.name,
            Measure::Count => COUNT_MEASURE,
        }
    }

    fn evaluate(&self, table: &FlatTable, rows: &[usize]) -> PivotOutcome<f64> {
        match self {
            Measure::Field(d) => aggregate_rows(table, d, rows),
            Measure::Count => Ok(rows.len() as f64),
        }
    }
}

/// Grouping fields of one axis with their column positions.
struct Axis<'a> {
    fields: Vec<(&'a FieldDescriptor, usize)>,
}

impl<'a> Axis<'a> {
    fn resolve(catalog: &'a FieldCatalog, table: &FlatTable, names: &[String]) -> PivotOutcome<Self> {
        let fields = names
            .iter()
            .map(|name| Ok::<_, PivotError>((catalog.describe(name)?, table.column_index(name)?)))
            .collect::<PivotOutcome<Vec<_>>>()?;
        Ok(Self { fields })
    }

    fn key_of(&self, values: &[Value]) -> Vec<Value> {
        self.fields
            .iter()
            .map(|&(_, idx)| values.get(idx).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Distinct keys in axis order. An axis without fields has exactly one, empty, key.
    fn distinct_keys<'k>(&self, keys: impl Iterator<Item = &'k Vec<Value>>) -> Vec<Vec<Value>> {
        if self.fields.is_empty() {
            return vec![Vec::new()];
        }
        let mut out: Vec<Vec<Value>> = keys.collect::<BTreeSet<_>>().into_iter().cloned().collect();
        out.sort_by(|a, b| self.compare_keys(a, b));
        out
    }

    fn compare_level(&self, level: usize, a: &Value, b: &Value) -> Ordering {
        self.fields[level].0.compare_values(a, b)
    }

    fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        (0..self.fields.len())
            .map(|level| self.compare_level(level, &a[level], &b[level]))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

fn positions(keys: &[Vec<Value>]) -> BTreeMap<&Vec<Value>, usize> {
    keys.iter().enumerate().map(|(i, k)| (k, i)).collect()
}

/// Every `(combo, measure)` pair, sorted level by level with the measure level at `data_pos`
/// ranked by request order.
fn column_order(
    axis: &Axis<'_>,
    combos: &[Vec<Value>],
    measure_count: usize,
    data_pos: usize,
) -> Vec<(usize, usize)> {
    let mut columns: Vec<(usize, usize)> = (0..combos.len())
        .flat_map(|c| (0..measure_count).map(move |m| (c, m)))
        .collect();
    let levels = axis.fields.len() + 1;
    columns.sort_by(|&(ca, ma), &(cb, mb)| {
        (0..levels)
            .map(|level| match level.cmp(&data_pos) {
                Ordering::Equal => ma.cmp(&mb),
                Ordering::Less => axis.compare_level(level, &combos[ca][level], &combos[cb][level]),
                Ordering::Greater => {
                    axis.compare_level(level - 1, &combos[ca][level - 1], &combos[cb][level - 1])
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    columns
}

fn placeholder() -> PivotResult {
    PivotResult {
        row_names: vec![String::new()],
        row_keys: vec![vec![Value::text("")]],
        col_names: vec![String::new()],
        col_keys: vec![vec![Value::text("")]],
        cells: vec![vec![0.0]],
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{COUNT_MEASURE, FIELD_LEVEL, PivotEngine, PivotRequest, VALUE_LABEL};
    use crate::catalog::{FieldCatalog, FieldDescriptor, Role};
    use crate::error::PivotError;
    use crate::execution::{ExecutionEngine, ExecutionEvent, ExecutionObserver, ExecutionOptions};
    use crate::filter::{compile_checklist, compile_expression};
    use crate::processing::Aggregator;
    use crate::types::{DataType, Field, FlatTable, Schema, Value};

    fn fruit_engine() -> PivotEngine {
        let schema = Schema::new(vec![
            Field::new("Fruit", DataType::Utf8),
            Field::new("Year", DataType::Int64),
            Field::new("Size", DataType::Utf8),
            Field::new("Weight", DataType::Float64),
            Field::new("Price", DataType::Float64),
        ]);
        let catalog = FieldCatalog::new(
            vec![
                FieldDescriptor::categorical("Fruit"),
                FieldDescriptor::ordinal("Year", Vec::new()),
                FieldDescriptor::ordinal(
                    "Size",
                    vec![Value::text("small"), Value::text("medium"), Value::text("large")],
                ),
                FieldDescriptor::aggregate("Weight", Aggregator::Sum),
                FieldDescriptor::weighted_average("Price", "Weight"),
            ],
            &schema,
        )
        .unwrap();
        let row = |fruit: &str, year: i64, size: &str, weight: f64, price: f64| {
            vec![
                Value::text(fruit),
                Value::Int64(year),
                Value::text(size),
                Value::Float64(weight),
                Value::Float64(price),
            ]
        };
        let table = FlatTable::new(
            schema,
            vec![
                row("Apple", 2022, "large", 1.0, 10.0),
                row("Apple", 2023, "small", 3.0, 20.0),
                row("Pear", 2022, "medium", 2.0, 5.0),
                row("Pear", 2022, "small", 4.0, 8.0),
            ],
        );
        PivotEngine::new(table, catalog)
    }

    fn text(s: &str) -> Value {
        Value::text(s)
    }

    #[test]
    fn mixed_numeric_keys_near_float_precision_keep_every_row() {
        let two_53 = 9_007_199_254_740_992_i64;
        let schema = Schema::new(vec![
            Field::new("Key", DataType::Int64),
            Field::new("Weight", DataType::Float64),
        ]);
        let catalog = FieldCatalog::new(
            vec![
                FieldDescriptor::categorical("Key"),
                FieldDescriptor::aggregate("Weight", Aggregator::Sum),
            ],
            &schema,
        )
        .unwrap();
        let table = FlatTable::new(
            schema,
            vec![
                vec![Value::Int64(two_53 + 1), Value::Float64(1.0)],
                vec![Value::Float64(two_53 as f64), Value::Float64(10.0)],
                vec![Value::Int64(two_53), Value::Float64(100.0)],
            ],
        );
        let engine = PivotEngine::new(table, catalog);
        let r = engine
            .get_pivot(&[], &["Key"], &["(Data)"], &["Weight"])
            .unwrap();
        assert_eq!(
            r.row_keys,
            vec![vec![Value::Int64(two_53)], vec![Value::Int64(two_53 + 1)]]
        );
        assert_eq!(r.cells, vec![vec![110.0], vec![1.0]]);
        let total: f64 = r.cells.iter().flatten().sum();
        assert_eq!(total, 111.0);
    }

    #[test]
    fn scenario_fills_missing_combinations_with_zero() {
        let engine = fruit_engine();
        let r = engine
            .get_pivot(&[], &["Fruit"], &["Year", "(Data)"], &["Weight"])
            .unwrap();
        assert_eq!(r.row_names, vec!["Fruit"]);
        assert_eq!(r.col_names, vec!["Year", FIELD_LEVEL]);
        assert_eq!(r.row_keys, vec![vec![text("Apple")], vec![text("Pear")]]);
        assert_eq!(
            r.col_keys,
            vec![
                vec![Value::Int64(2022), text("Weight")],
                vec![Value::Int64(2023), text("Weight")],
            ]
        );
        assert_eq!(r.cells, vec![vec![1.0, 3.0], vec![6.0, 0.0]]);
    }

    #[test]
    fn aggregate_level_honours_data_position_and_agg_order() {
        let engine = fruit_engine();
        let r = engine
            .get_pivot(&[], &["Fruit"], &["(Data)", "Year"], &["Weight", "Price"])
            .unwrap();
        assert_eq!(r.col_names, vec![FIELD_LEVEL, "Year"]);
        assert_eq!(
            r.col_keys,
            vec![
                vec![text("Weight"), Value::Int64(2022)],
                vec![text("Weight"), Value::Int64(2023)],
                vec![text("Price"), Value::Int64(2022)],
                vec![text("Price"), Value::Int64(2023)],
            ]
        );
        // Pear 2022 price: (5*2 + 8*4) / 6
        assert_eq!(r.cells[1][2], 7.0);
        assert_eq!(r.cells[1][3], 0.0);
    }

    #[test]
    fn ordinal_levels_sort_in_declared_order() {
        let engine = fruit_engine();
        let r = engine
            .get_pivot(&[], &["Size"], &["(Data)"], &["Weight"])
            .unwrap();
        assert_eq!(
            r.row_keys,
            vec![vec![text("small")], vec![text("medium")], vec![text("large")]]
        );
        assert_eq!(r.cells, vec![vec![7.0], vec![2.0], vec![1.0]]);
        assert_eq!(
            engine.get_uniques("Size").unwrap(),
            vec![text("small"), text("medium"), text("large")]
        );
    }

    #[test]
    fn data_on_rows_transposes() {
        let engine = fruit_engine();
        let r = engine
            .get_pivot(&[], &["(Data)"], &["Fruit"], &["Weight", "Price"])
            .unwrap();
        assert_eq!(r.row_names, vec![FIELD_LEVEL]);
        assert_eq!(r.row_keys, vec![vec![text("Weight")], vec![text("Price")]]);
        assert_eq!(r.col_names, vec!["Fruit"]);
        assert_eq!(r.cells[0], vec![4.0, 6.0]);
    }

    #[test]
    fn without_aggregates_rows_are_counted() {
        let engine = fruit_engine();
        let r = engine.get_pivot(&[], &[], &["Fruit"], &[]).unwrap();
        assert_eq!(r.row_names, vec![""]);
        assert_eq!(r.row_keys, vec![vec![text(VALUE_LABEL)]]);
        assert_eq!(
            r.col_keys,
            vec![
                vec![text("Apple"), text(COUNT_MEASURE)],
                vec![text("Pear"), text(COUNT_MEASURE)],
            ]
        );
        assert_eq!(r.cells, vec![vec![2.0, 2.0]]);
    }

    #[test]
    fn without_axes_aggregates_whole_table() {
        let engine = fruit_engine();
        let r = engine.get_pivot(&[], &[], &["(Data)"], &["Weight"]).unwrap();
        assert_eq!(r.shape(), (1, 1));
        assert_eq!(r.row_keys, vec![vec![text(VALUE_LABEL)]]);
        assert_eq!(r.cells, vec![vec![10.0]]);

        let none = compile_checklist("Fruit", [text("Kiwi")]);
        let empty = engine.get_pivot(&[none], &[], &[], &["Weight"]).unwrap();
        assert_eq!(empty.cells, vec![vec![0.0]]);
    }

    #[test]
    fn empty_request_is_a_single_zero_cell() {
        let r = fruit_engine().get_pivot(&[], &[], &[], &[]).unwrap();
        assert_eq!(r.shape(), (1, 1));
        assert_eq!(r.cell(0, 0), Some(0.0));
    }

    #[test]
    fn filters_apply_before_grouping() {
        let engine = fruit_engine();
        let recent = compile_expression("Year >= 2023", &["Year"]).unwrap();
        let r = engine
            .get_pivot(&[recent], &["Fruit"], &["(Data)"], &["Weight"])
            .unwrap();
        assert_eq!(r.row_keys, vec![vec![text("Apple")]]);
        assert_eq!(r.cells, vec![vec![3.0]]);
    }

    #[test]
    fn parallel_filtering_gives_identical_results() {
        let sequential = fruit_engine();
        let parallel = fruit_engine().with_execution(
            ExecutionEngine::new(ExecutionOptions {
                num_threads: Some(2),
                chunk_size: 1,
                max_in_flight_chunks: 2,
            })
            .unwrap(),
        );
        let request = PivotRequest::new()
            .rows(["Fruit"])
            .cols(["Year", "(Data)"])
            .aggs(["Weight", "Price"])
            .filter(compile_expression("Weight > 1", &["Weight"]).unwrap());
        assert_eq!(
            sequential.compute(&request).unwrap(),
            parallel.compute(&request).unwrap()
        );
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ExecutionEvent>>);

    impl ExecutionObserver for Recorder {
        fn on_event(&self, event: &ExecutionEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn observer_sees_pivot_lifecycle() {
        let recorder = Arc::new(Recorder::default());
        let engine = fruit_engine().with_observer(recorder.clone());
        engine
            .get_pivot(&[], &["Fruit"], &["Year", "(Data)"], &["Weight"])
            .unwrap();
        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], ExecutionEvent::PivotStarted { rows, .. } if rows == &["Fruit"]));
        assert!(matches!(
            events[1],
            ExecutionEvent::PivotFinished {
                input_rows: 4,
                result_rows: 2,
                result_cols: 2,
                ..
            }
        ));
    }

    #[test]
    fn invalid_requests_do_not_emit_events() {
        let recorder = Arc::new(Recorder::default());
        let engine = fruit_engine().with_observer(recorder.clone());
        let err = engine
            .get_pivot(&[], &["Weight"], &["(Data)"], &[])
            .unwrap_err();
        assert!(matches!(err, PivotError::InvalidPivotRequest { .. }));
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn non_numeric_aggregate_values_abort() {
        let schema = Schema::new(vec![
            Field::new("Fruit", DataType::Utf8),
            Field::new("Weight", DataType::Float64),
        ]);
        let catalog = FieldCatalog::new(
            vec![
                FieldDescriptor::categorical("Fruit"),
                FieldDescriptor::aggregate("Weight", Aggregator::Sum),
            ],
            &schema,
        )
        .unwrap();
        let table = FlatTable::new(
            schema,
            vec![vec![Value::text("Apple"), Value::text("heavy")]],
        );
        let engine = PivotEngine::new(table, catalog);
        let err = engine
            .get_pivot(&[], &["Fruit"], &["(Data)"], &["Weight"])
            .unwrap_err();
        assert!(matches!(err, PivotError::NonNumericCell { row: 0, .. }));
    }

    #[test]
    fn field_queries() {
        let engine = fruit_engine();
        assert_eq!(
            engine.get_field_list(),
            vec!["Fruit", "Year", "Size", "Weight", "Price"]
        );
        assert_eq!(engine.get_field_type("Price").unwrap(), Role::Aggregate);
        assert_eq!(engine.get_field_type("(Data)").unwrap(), Role::GroupingCategorical);
        assert!(matches!(
            engine.get_field_type("Colour"),
            Err(PivotError::UnknownField { .. })
        ));
        let apples = compile_checklist("Fruit", [text("Apple")]);
        assert_eq!(engine.get_filtered(&[apples]).row_count(), 2);
    }
}

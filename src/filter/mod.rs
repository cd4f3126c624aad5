//! Row predicates: authoring, compiling and combining filters.
//!
//! A [`RowPredicate`] is a pure, thread-safe `Row -> bool` function. Predicates come from three
//! places:
//!
//! - [`compile_expression`]: a restricted comparison/boolean language over field names
//! - [`compile_checklist`]: membership in a set of allowed values
//! - [`RowPredicate::new`]: any closure
//!
//! [`combine`] folds many predicates into their conjunction.
//!
//! ```rust
//! use pivot_broker::filter::{combine, compile_checklist, compile_expression};
//! use pivot_broker::types::{DataType, Field, FlatTable, Schema, Value};
//!
//! let table = FlatTable::new(
//!     Schema::new(vec![
//!         Field::new("Fruit", DataType::Utf8),
//!         Field::new("Year", DataType::Int64),
//!     ]),
//!     vec![
//!         vec![Value::text("Apple"), Value::Int64(2022)],
//!         vec![Value::text("Apple"), Value::Int64(2024)],
//!         vec![Value::text("Pear"), Value::Int64(2023)],
//!     ],
//! );
//!
//! let years = compile_expression("2022 <= Year < 2024", &["Fruit", "Year"]).unwrap();
//! let apples = compile_checklist("Fruit", [Value::text("Apple")]);
//! let both = combine(&[years, apples]);
//!
//! let out = table.filter_rows(|row| both.evaluate(row));
//! assert_eq!(out.row_count(), 1);
//! ```

mod compile;
mod lexer;
mod parser;
mod token;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub use compile::{CompiledExpression, Condition};
pub use parser::{CmpOp, Literal};

use crate::error::PivotOutcome;
use crate::types::{Row, Value};

type PredicateFn = dyn Fn(&Row<'_>) -> bool + Send + Sync;

/// A shareable row filter.
///
/// Cloning is cheap (reference counted).
#[derive(Clone)]
pub struct RowPredicate {
    inner: Arc<PredicateFn>,
}

impl RowPredicate {
    /// Wrap a closure as a predicate.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Row<'_>) -> bool + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Identity filter.
    pub fn accept_all() -> Self {
        Self::new(|_| true)
    }

    /// Whether `row` is kept.
    pub fn evaluate(&self, row: &Row<'_>) -> bool {
        (self.inner)(row)
    }
}

impl fmt::Debug for RowPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowPredicate").finish_non_exhaustive()
    }
}

impl From<CompiledExpression> for RowPredicate {
    fn from(compiled: CompiledExpression) -> Self {
        RowPredicate::new(move |row| compiled.evaluate(row))
    }
}

/// Logical AND of `predicates`, evaluated in the given order, stopping at the first rejection.
///
/// An empty slice yields a predicate that accepts every row.
pub fn combine(predicates: &[RowPredicate]) -> RowPredicate {
    match predicates {
        [] => RowPredicate::accept_all(),
        [single] => single.clone(),
        many => {
            let owned = many.to_vec();
            RowPredicate::new(move |row| owned.iter().all(|p| p.evaluate(row)))
        }
    }
}

/// Compile a filter expression into a predicate.
///
/// Only names listed in `allowed_vars` may appear. Forbidden constructs fail with
/// [`crate::error::PivotError::DisallowedExpression`] and malformed input with
/// [`crate::error::PivotError::ExpressionSyntax`]; in both cases no row is ever evaluated.
pub fn compile_expression<S: AsRef<str>>(
    text: &str,
    allowed_vars: &[S],
) -> PivotOutcome<RowPredicate> {
    CompiledExpression::compile(text, allowed_vars).map(RowPredicate::from)
}

/// Predicate keeping rows whose `field` value is one of `included_values`.
///
/// A row without the field is treated as holding `Null`.
pub fn compile_checklist<I, V>(field: impl Into<String>, included_values: I) -> RowPredicate
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let field = field.into();
    let allowed: BTreeSet<Value> = included_values.into_iter().map(Into::into).collect();
    RowPredicate::new(move |row| allowed.contains(row.get(&field).unwrap_or(&Value::Null)))
}

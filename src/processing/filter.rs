//! Row filtering for [`crate::types::FlatTable`].

use crate::filter::RowPredicate;
use crate::types::FlatTable;

/// Returns a new [`FlatTable`] containing only rows accepted by `predicate`.
///
/// Schema and row order are preserved. This is the sequential counterpart of
/// [`crate::execution::ExecutionEngine::filter_parallel`].
pub fn filter(table: &FlatTable, predicate: &RowPredicate) -> FlatTable {
    table.filter_rows(|row| predicate.evaluate(row))
}

//! Display compaction of hierarchical row keys.

use crate::types::Value;

/// Blank every leading key component that repeats the row above.
///
/// Blanking stops at the first component that differs, so a change in an outer level always
/// shows every inner level again. The first row is never compacted. `None` marks a blank.
///
/// ```rust
/// use pivot_broker::pivot::compact_labels;
/// use pivot_broker::types::Value;
///
/// let keys = vec![
///     vec![Value::text("Apple"), Value::Int64(2022)],
///     vec![Value::text("Apple"), Value::Int64(2023)],
///     vec![Value::text("Pear"), Value::Int64(2023)],
/// ];
/// assert_eq!(
///     compact_labels(&keys),
///     vec![
///         vec!["Apple".to_string(), "2022".to_string()],
///         vec!["".to_string(), "2023".to_string()],
///         vec!["Pear".to_string(), "2023".to_string()],
///     ]
/// );
/// ```
pub fn compact(row_keys: &[Vec<Value>]) -> Vec<Vec<Option<&Value>>> {
    let mut previous: Option<&[Value]> = None;
    row_keys
        .iter()
        .map(|key| {
            let shared = previous.map_or(0, |prev| {
                prev.iter().zip(key).take_while(|(a, b)| a == b).count()
            });
            previous = Some(key.as_slice());
            key.iter()
                .enumerate()
                .map(|(i, v)| (i >= shared).then_some(v))
                .collect()
        })
        .collect()
}

/// [`compact`], rendered to display strings with blanks as `""`.
pub fn compact_labels(row_keys: &[Vec<Value>]) -> Vec<Vec<String>> {
    compact(row_keys)
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|v| v.map(ToString::to_string).unwrap_or_default())
                .collect()
        })
        .collect()
}

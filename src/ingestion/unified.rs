//! Path-based loading with format detection and observer reporting.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pivot_broker::ingestion::{ingest_from_path, IngestionOptions, StdErrObserver};
//! use pivot_broker::types::{DataType, Field, Schema};
//!
//! # fn main() -> Result<(), pivot_broker::IngestionError> {
//! let schema = Schema::new(vec![
//!     Field::new("Fruit", DataType::Utf8),
//!     Field::new("Year", DataType::Int64),
//!     Field::new("Weight", DataType::Float64),
//! ]);
//! let opts = IngestionOptions {
//!     observer: Some(Arc::new(StdErrObserver)),
//!     ..Default::default()
//! };
//! let table = ingest_from_path("fruit.csv", &schema, &opts)?;
//! println!("rows={}", table.row_count());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{FlatTable, Schema};

use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};
use super::{csv, json};

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    Csv,
    /// JSON object, array of objects, or NDJSON.
    Json,
}

impl IngestionFormat {
    /// Format for a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            _ => None,
        }
    }

    fn for_path(path: &Path) -> IngestionResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| IngestionError::SchemaMismatch {
                message: format!("cannot infer format: path has no extension ({})", path.display()),
            })?;
        Self::from_extension(ext).ok_or_else(|| IngestionError::SchemaMismatch {
            message: format!(
                "cannot infer format from extension '{ext}' for path ({})",
                path.display()
            ),
        })
    }
}

/// Options for [`ingest_from_path`] and [`ingest_inferred_from_path`].
#[derive(Clone)]
pub struct IngestionOptions {
    /// Force a format instead of using the file extension.
    pub format: Option<IngestionFormat>,
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Failures at or above this severity also trigger `on_alert`.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("format", &self.format)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: None,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// Load a file into a [`FlatTable`] with the given schema.
///
/// The observer, if any, gets `on_success` with the table shape, or `on_failure` (plus
/// `on_alert` when the severity meets `alert_at_or_above`).
pub fn ingest_from_path(
    path: impl AsRef<Path>,
    schema: &Schema,
    options: &IngestionOptions,
) -> IngestionResult<FlatTable> {
    let path = path.as_ref();
    run(path, options, false, |format| match format {
        IngestionFormat::Csv => csv::ingest_csv_from_path(path, schema),
        IngestionFormat::Json => json::ingest_json_from_path(path, schema),
    })
}

/// Load a CSV file without a schema; column types are inferred from the data.
///
/// JSON input is rejected: its records do not carry a reliable column set.
pub fn ingest_inferred_from_path(
    path: impl AsRef<Path>,
    options: &IngestionOptions,
) -> IngestionResult<FlatTable> {
    let path = path.as_ref();
    run(path, options, true, |format| match format {
        IngestionFormat::Csv => csv::ingest_csv_inferred_from_path(path),
        IngestionFormat::Json => Err(IngestionError::SchemaMismatch {
            message: "schema inference is only supported for csv".to_string(),
        }),
    })
}

fn run<F>(
    path: &Path,
    options: &IngestionOptions,
    inferred_schema: bool,
    load: F,
) -> IngestionResult<FlatTable>
where
    F: FnOnce(IngestionFormat) -> IngestionResult<FlatTable>,
{
    let resolved = match options.format {
        Some(f) => Ok(f),
        None => IngestionFormat::for_path(path),
    };
    let format = resolved.as_ref().ok().copied();
    let result = resolved.and_then(load);

    if let Some(obs) = &options.observer {
        let ctx = IngestionContext {
            path: path.to_path_buf(),
            format,
            inferred_schema,
        };
        match &result {
            Ok(table) => obs.on_success(
                &ctx,
                IngestionStats {
                    rows: table.row_count(),
                    columns: table.schema.fields.len(),
                },
            ),
            Err(e) => {
                let severity = IngestionSeverity::of(e);
                obs.on_failure(&ctx, severity, e);
                if severity >= options.alert_at_or_above {
                    obs.on_alert(&ctx, severity, e);
                }
            }
        }
    }

    result
}

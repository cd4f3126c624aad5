//! Loading flat tables from files.
//!
//! Most callers use [`ingest_from_path`] (schema supplied) or [`ingest_inferred_from_path`]
//! (schema inferred from a CSV header and its data). Both pick the format from the file
//! extension unless [`IngestionOptions::format`] forces one, and report to an optional
//! [`IngestionObserver`].
//!
//! Format-specific entry points live in [`csv`] and [`json`].

pub mod csv;
pub mod json;
pub mod observability;
pub mod unified;

pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity,
    IngestionStats, StdErrObserver,
};
pub use unified::{IngestionFormat, IngestionOptions, ingest_from_path, ingest_inferred_from_path};

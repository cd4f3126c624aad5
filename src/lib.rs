//! `pivot-broker` turns a flat, typed table into pivot tables: rows are filtered, grouped by
//! one or more grouping fields on each axis, reduced with each field's aggregator, and laid out
//! on a dense grid.
//!
//! The pieces:
//!
//! - [`types`]: [`types::Schema`], [`types::Value`] and the in-memory [`types::FlatTable`]
//! - [`ingestion`]: load a table from CSV or JSON ([`ingestion::ingest_from_path`])
//! - [`catalog`]: which fields group rows and which are aggregated, and how
//! - [`filter`]: row predicates, from checklists or from a small comparison language
//! - [`pivot`]: [`pivot::PivotEngine`], the stateless query engine
//! - [`session`]: [`session::PivotSession`], an interactive field-placement layer on top
//! - [`execution`]: optional parallel row filtering with metrics and observer events
//! - [`processing`]: the filter and aggregate primitives the engine is built from
//!
//! ## Loading and pivoting
//!
//! ```no_run
//! use pivot_broker::catalog::FieldCatalog;
//! use pivot_broker::filter::compile_expression;
//! use pivot_broker::ingestion::{ingest_from_path, IngestionOptions};
//! use pivot_broker::pivot::PivotEngine;
//! use pivot_broker::types::{DataType, Field, Schema};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::new(vec![
//!     Field::new("Fruit", DataType::Utf8),
//!     Field::new("Year", DataType::Int64),
//!     Field::new("Weight", DataType::Float64),
//! ]);
//! let table = ingest_from_path("fruit.csv", &schema, &IngestionOptions::default())?;
//! let catalog = FieldCatalog::from_json_str(&std::fs::read_to_string("catalog.json")?, &schema)?;
//! let engine = PivotEngine::new(table, catalog);
//!
//! let recent = compile_expression("Year >= 2022", &engine.get_field_list())?;
//! let result = engine.get_pivot(&[recent], &["Fruit"], &["Year", "(Data)"], &["Weight"])?;
//! for (key, line) in result.row_keys.iter().zip(&result.cells) {
//!     println!("{key:?}: {line:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Filter expressions
//!
//! Expressions are comparisons between one field and one literal, chained with `and` / `or`:
//!
//! ```text
//! Year >= 2022 and (Fruit == 'Apple' or 1.5 < Weight)
//! 2020 <= Year < 2023
//! ```
//!
//! Anything else (function calls, arithmetic, attribute access, `in`, field-to-field
//! comparisons, names outside the catalog) is rejected with
//! [`PivotError::DisallowedExpression`] before any row is read.
//!
//! ## Errors
//!
//! Loading fails with [`IngestionError`]; catalog, filter and pivot operations fail with
//! [`PivotError`]. Invalid requests never produce a partial or default result.

pub mod catalog;
pub mod error;
pub mod execution;
pub mod filter;
pub mod ingestion;
pub mod pivot;
pub mod processing;
pub mod session;
pub mod types;

pub use error::{IngestionError, IngestionResult, PivotError, PivotOutcome};
pub use pivot::{PivotEngine, PivotRequest, PivotResult};
pub use session::PivotSession;

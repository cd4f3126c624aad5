//! In-memory transformations the pivot engine is built from.
//!
//! - [`filter()`]: keep the rows a [`crate::filter::RowPredicate`] accepts
//! - [`Aggregator`]: closed set of reductions applied to grouped aggregate fields
//! - [`reduce()`]: apply a catalog field's aggregator to a whole table
//!
//! ## Example: filter → reduce
//!
//! ```rust
//! use pivot_broker::catalog::FieldDescriptor;
//! use pivot_broker::filter::compile_expression;
//! use pivot_broker::processing::{filter, reduce, Aggregator};
//! use pivot_broker::types::{DataType, Field, FlatTable, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("Fruit", DataType::Utf8),
//!     Field::new("Weight", DataType::Float64),
//!     Field::new("Price", DataType::Float64),
//! ]);
//! let table = FlatTable::new(
//!     schema,
//!     vec![
//!         vec![Value::text("Apple"), Value::Float64(1.0), Value::Float64(10.0)],
//!         vec![Value::text("Apple"), Value::Float64(3.0), Value::Float64(20.0)],
//!         vec![Value::text("Pear"), Value::Float64(2.0), Value::Null],
//!     ],
//! );
//!
//! let apples = filter(&table, &compile_expression("Fruit == 'Apple'", &["Fruit"]).unwrap());
//!
//! let total = reduce(&apples, &FieldDescriptor::aggregate("Weight", Aggregator::Sum)).unwrap();
//! assert_eq!(total, 4.0);
//!
//! let avg = reduce(&apples, &FieldDescriptor::weighted_average("Price", "Weight")).unwrap();
//! assert_eq!(avg, 17.5);
//! ```

pub mod aggregate;
pub mod filter;

pub use aggregate::{Aggregator, reduce};
pub use filter::filter;

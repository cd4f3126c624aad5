use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Convenience result type for catalog, filter and pivot operations.
pub type PivotOutcome<T> = Result<T, PivotError>;

/// Error type returned by ingestion functions.
///
/// This is a single error enum shared across CSV and JSON ingestion.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV ingestion error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The input does not conform to the provided schema (missing required fields/columns, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },
}

/// Error type returned by the catalog, the filter compiler and the pivot engine.
///
/// Every variant is raised synchronously and handed to the caller unmodified; the engine never
/// substitutes a default result for an invalid request.
#[derive(Debug, Error)]
pub enum PivotError {
    /// A referenced field is absent from the catalog/table, or a weight-field reference dangles.
    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    /// A filter expression uses syntax outside the allowed comparison/boolean grammar.
    #[error("disallowed expression '{expression}': {reason}")]
    DisallowedExpression { expression: String, reason: String },

    /// A filter expression could not be tokenized or parsed at all.
    #[error("syntax error in expression '{expression}' at offset {position}: {message}")]
    ExpressionSyntax {
        expression: String,
        position: usize,
        message: String,
    },

    /// Structural misuse of a pivot request (placeholder placement, role/slot mismatch, duplicates).
    #[error("invalid pivot request: {message}")]
    InvalidPivotRequest { message: String },

    /// A field catalog that contradicts itself or the table schema.
    #[error("invalid field catalog: {message}")]
    InvalidCatalog { message: String },

    /// A value feeding a pivot cell is not a finite number.
    #[error("non-numeric value in field '{field}' at row {row}: {value}")]
    NonNumericCell {
        field: String,
        row: usize,
        value: String,
    },

    /// A JSON catalog document could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PivotError {
    pub(crate) fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidPivotRequest {
            message: message.into(),
        }
    }
}

//! Error types for normalization and export.

use thiserror::Error;

use crate::field::Field;

/// One or more canonical fields had no matching header.
///
/// `missing` lists every unmatched field in canonical order, not just the
/// first one encountered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Missing required columns: {}", join_fields(.missing))]
pub struct SchemaError {
    /// Canonical fields with no satisfied alias among the input headers.
    pub missing: Vec<Field>,
}

/// The input is not well-formed tabular data.
///
/// Line numbers are 1-based physical lines of the uploaded file, so the
/// header is line 1. Messages never carry the CSV reader's own error text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A numeric cell was empty, non-numeric, or not finite.
    #[error("Line {line}: {field} value {value:?} is not a finite number")]
    InvalidNumber {
        line: u64,
        field: Field,
        value: String,
    },

    /// A data row had a different number of cells than the header.
    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCount { line: u64, expected: u64, found: u64 },

    /// The input was not valid UTF-8.
    #[error("Line {line}: input is not valid UTF-8")]
    Encoding { line: u64 },

    /// Any other reader failure.
    #[error("Line {line}: malformed CSV input")]
    Malformed { line: u64 },
}

/// Failure of [`normalize`](crate::normalize::normalize).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Failure while rendering rows back to CSV.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(Field::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_every_field() {
        let err = SchemaError {
            missing: vec![Field::Type, Field::Pressure],
        };
        assert_eq!(err.to_string(), "Missing required columns: type, pressure");
    }

    #[test]
    fn test_parse_error_names_line_and_field() {
        let err = ParseError::InvalidNumber {
            line: 4,
            field: Field::Flowrate,
            value: "n/a".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Line 4"));
        assert!(msg.contains("flowrate"));
        assert!(msg.contains("n/a"));
    }
}

//! Schema validation errors.

use crate::common::ColumnType;

/// A component or nested record failed validation at construction or update.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A one-of group had zero or more than one field set.
    #[error("{kind} requires exactly one of: {fields}")]
    ExclusiveFields {
        kind: &'static str,
        fields: &'static str,
    },

    /// A table row's cell does not match the declared column type.
    #[error("table column {column:?} is {expected:?} but row {row} holds a {found} value")]
    ColumnTypeMismatch {
        column: String,
        expected: ColumnType,
        row: usize,
        found: &'static str,
    },

    /// A table row's length disagrees with the declared column count.
    #[error("table row {row} has {found} cells, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },
}

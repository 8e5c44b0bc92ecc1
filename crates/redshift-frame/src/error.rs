//! Error types for the redshift-frame library.

use std::fmt;

use thiserror::Error;

/// A single value that could not be encoded for its target column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Column name, or `None` for row-level checks such as statement size.
    pub column: Option<String>,
    /// Zero-based row index.
    pub row: usize,
    /// Human-readable reason.
    pub reason: String,
}

impl Violation {
    /// Create a violation for a specific cell.
    pub fn cell(column: impl Into<String>, row: usize, reason: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
            row,
            reason: reason.into(),
        }
    }

    /// Create a violation that applies to a whole row.
    pub fn row(row: usize, reason: impl Into<String>) -> Self {
        Self {
            column: None,
            row,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "Column '{}' row {}: {}", column, self.row, self.reason),
            None => write!(f, "Row[{}]: {}", self.row, self.reason),
        }
    }
}

/// Main error type for decode, resolve and encode operations.
#[derive(Error, Debug)]
pub enum RedshiftError {
    /// A dtype token did not name a Redshift type or had malformed parameters.
    #[error("Invalid Redshift type '{token}': {reason}")]
    InvalidRedshiftType { token: String, reason: String },

    /// The dtype mapping does not cover the table's columns.
    #[error("{message}")]
    NoColumn {
        message: String,
        columns: Vec<String>,
    },

    /// One or more cell values failed validation.
    #[error("Data encode failed with {} violation(s):\n{}", .0.len(), join_lines(.0))]
    DataEncode(Vec<Violation>),

    /// One or more identifiers failed validation.
    #[error("Metadata encode failed: {}", .0.join("; "))]
    MetadataEncode(Vec<String>),

    /// A result cell did not match the type its column metadata declared.
    #[error("Decode fault in column '{column}' row {row}: {reason}")]
    Decode {
        column: String,
        row: usize,
        reason: String,
    },

    /// A caller-built table is malformed (duplicate names, ragged columns).
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// The target table already exists.
    #[error("Table creation failed: {0}")]
    TableCreation(String),

    /// The transport reported a failed or aborted statement.
    #[error("Statement failed: {sql}\n  Reason: {message}")]
    Statement { sql: String, message: String },

    /// Configuration error (invalid YAML, bad values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_lines(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}

impl RedshiftError {
    /// Create an InvalidRedshiftType error.
    pub fn invalid_type(token: impl Into<String>, reason: impl Into<String>) -> Self {
        RedshiftError::InvalidRedshiftType {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Create a NoColumn error naming every missing column.
    pub fn missing_columns(columns: Vec<String>) -> Self {
        RedshiftError::NoColumn {
            message: format!(
                "dtype has no entry for column(s): {}",
                columns
                    .iter()
                    .map(|c| format!("'{}'", c))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            columns,
        }
    }

    /// Create a NoColumn error for a table without columns.
    pub fn empty_table() -> Self {
        RedshiftError::NoColumn {
            message: "Table must have at least one column".to_string(),
            columns: Vec::new(),
        }
    }

    /// Create a Decode error.
    pub fn decode(column: impl Into<String>, row: usize, reason: impl Into<String>) -> Self {
        RedshiftError::Decode {
            column: column.into(),
            row,
            reason: reason.into(),
        }
    }

    /// Create a Statement error.
    pub fn statement(sql: impl Into<String>, message: impl Into<String>) -> Self {
        RedshiftError::Statement {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            RedshiftError::Config(_) | RedshiftError::Yaml(_) => 1,
            RedshiftError::InvalidRedshiftType { .. } | RedshiftError::NoColumn { .. } => 2,
            RedshiftError::DataEncode(_) | RedshiftError::MetadataEncode(_) => 3,
            RedshiftError::Decode { .. } | RedshiftError::Json(_) => 4,
            RedshiftError::InvalidTable(_) => 5,
            RedshiftError::TableCreation(_) | RedshiftError::Statement { .. } => 6,
            RedshiftError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for redshift-frame operations.
pub type Result<T> = std::result::Result<T, RedshiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_names_all() {
        let err = RedshiftError::missing_columns(vec!["foo".into(), "bar".into()]);
        let msg = err.to_string();
        assert!(msg.contains("'foo'"));
        assert!(msg.contains("'bar'"));
        match err {
            RedshiftError::NoColumn { columns, .. } => assert_eq!(columns, vec!["foo", "bar"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_data_encode_lists_every_violation() {
        let err = RedshiftError::DataEncode(vec![
            Violation::cell("name", 0, "too long"),
            Violation::row(3, "beyond size limitation"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 violation(s)"));
        assert!(msg.contains("Column 'name' row 0: too long"));
        assert!(msg.contains("Row[3]: beyond size limitation"));
    }

    #[test]
    fn test_exit_codes_are_distinct_per_family() {
        assert_eq!(RedshiftError::Config("x".into()).exit_code(), 1);
        assert_eq!(RedshiftError::invalid_type("x", "y").exit_code(), 2);
        assert_eq!(RedshiftError::DataEncode(vec![]).exit_code(), 3);
        assert_eq!(RedshiftError::decode("c", 0, "r").exit_code(), 4);
    }
}

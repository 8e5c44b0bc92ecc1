//! Validation and literal encoding of tables for writing.
//!
//! Encoding is all-or-nothing: identifiers are checked first, then every
//! cell of every column, and only a table with no violations produces
//! output. Nothing here talks to the remote service.

pub mod literal;

use tracing::debug;

use crate::catalog::RedshiftType;
use crate::core::{validate_identifiers, TypedTable};
use crate::error::{RedshiftError, Result, Violation};
use crate::schema::ResolvedSchema;
use crate::statement;

pub use literal::{encode_value, quote_text};

/// Default upper bound, in bytes, for a single SQL statement.
pub const DEFAULT_MAX_STATEMENT_SIZE: usize = 100_000;

/// A target column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub redshift_type: RedshiftType,
}

/// A fully validated table, ready to be turned into statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTable {
    pub schema: String,
    pub table: String,
    pub columns: Vec<ColumnDef>,
    /// Literal text per row, in column order.
    pub rows: Vec<Vec<String>>,
}

impl EncodedTable {
    /// Unquoted column definitions, e.g. `id INTEGER, name VARCHAR(60)`.
    pub fn column_definitions(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.redshift_type))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Validates tables against resolved schemas and renders literals.
#[derive(Debug, Clone)]
pub struct Encoder {
    max_statement_size: usize,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STATEMENT_SIZE)
    }
}

impl Encoder {
    pub fn new(max_statement_size: usize) -> Self {
        Self { max_statement_size }
    }

    pub fn max_statement_size(&self) -> usize {
        self.max_statement_size
    }

    /// Validate and encode `table` for `"schema"."table_name"`.
    ///
    /// # Errors
    ///
    /// - `MetadataEncode` listing every bad identifier.
    /// - `NoColumn` when the table has no columns or `resolved` lacks some.
    /// - `DataEncode` listing every cell that cannot be encoded and every
    ///   row whose single-row INSERT would reach the statement size limit.
    pub fn encode(
        &self,
        table: &TypedTable,
        resolved: &ResolvedSchema,
        schema: &str,
        table_name: &str,
    ) -> Result<EncodedTable> {
        let names = table.column_names();
        validate_identifiers([schema, table_name].into_iter().chain(names.iter().copied()))?;

        if names.is_empty() {
            return Err(RedshiftError::empty_table());
        }

        let mut types = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in &names {
            match resolved.get(name) {
                Some(t) => types.push(t),
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(RedshiftError::missing_columns(missing));
        }

        let num_rows = table.num_rows();
        let mut rows: Vec<Vec<String>> = vec![Vec::with_capacity(names.len()); num_rows];
        let mut columns = Vec::with_capacity(names.len());
        let mut violations = Vec::new();

        for (column, redshift_type) in table.columns().iter().zip(types) {
            let before = violations.len();
            for (row, value) in column.data.iter().enumerate() {
                match literal::encode_value(&redshift_type, &value) {
                    Ok(lit) => rows[row].push(lit),
                    Err(reason) => violations.push(Violation::cell(&column.name, row, reason)),
                }
            }
            debug!(
                "Encoded column '{}' as {} ({} rows, {} violations)",
                column.name,
                redshift_type,
                num_rows,
                violations.len() - before
            );
            columns.push(ColumnDef {
                name: column.name.clone(),
                redshift_type,
            });
        }

        let prefix = statement::insert_prefix(schema, table_name, names.iter().copied())?;
        for (index, row) in rows.iter().enumerate() {
            // Rows with failed cells are already reported.
            if row.len() != names.len() {
                continue;
            }
            let size = prefix.len() + statement::row_values(row).len();
            if size >= self.max_statement_size {
                violations.push(Violation::row(index, "beyond size limitation"));
            }
        }

        if !violations.is_empty() {
            return Err(RedshiftError::DataEncode(violations));
        }

        Ok(EncodedTable {
            schema: schema.to_string(),
            table: table_name.to_string(),
            columns,
            rows,
        })
    }
}

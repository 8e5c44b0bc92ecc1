//! Read and write orchestration over an abstract statement transport.
//!
//! The transport (Data API client, credentials, polling) lives behind
//! [`StatementClient`]. The connector only decides which statements to send
//! and in which order.

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::config::{Config, IfExists};
use crate::core::TypedTable;
use crate::decode::{self, StatementResult};
use crate::encode::Encoder;
use crate::error::{RedshiftError, Result};
use crate::schema::{self, DtypeSpec};
use crate::statement;

/// Request/response access to the remote query service.
///
/// Implementations run a statement to completion and report failed or
/// aborted statements as `RedshiftError::Statement`.
#[async_trait]
pub trait StatementClient: Send + Sync {
    /// Run a statement that returns no rows.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Run a query and return every result page.
    async fn query(&self, sql: &str) -> Result<Vec<StatementResult>>;

    /// Names of the tables in `schema`.
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>>;
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub schema: String,
    pub table: String,
    /// Whether `CREATE TABLE` was issued.
    pub created: bool,
    pub rows_loaded: usize,
    pub statements: usize,
}

/// Reads query results into tables and writes tables to Redshift.
pub struct RedshiftConnector<C> {
    client: C,
    config: Config,
}

impl<C: StatementClient> RedshiftConnector<C> {
    pub fn new(client: C, config: Config) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check whether `table` exists in `schema`.
    pub async fn exists_table(&self, table: &str, schema: &str) -> Result<bool> {
        let tables = self.client.list_tables(schema).await?;
        Ok(tables.iter().any(|t| t == table))
    }

    /// Run `sql` and decode every result page into a table.
    pub async fn read_redshift(&self, sql: &str) -> Result<TypedTable> {
        let pages = self.client.query(sql).await?;
        debug!("Query returned {} page(s)", pages.len());
        decode::decode_pages(&pages)
    }

    /// Write `table` to `table_name` in the configured schema.
    ///
    /// Every row is validated and encoded before any statement that changes
    /// the remote side is sent. With `if_exists: fail` an existing table is
    /// an error; with `append` the rows are inserted into it.
    pub async fn to_redshift(&self, table: &TypedTable, dtype: &DtypeSpec, table_name: &str) -> Result<WriteSummary> {
        let schema = self.config.target.schema.as_str();

        let exists = self.exists_table(table_name, schema).await?;
        if exists && self.config.target.if_exists == IfExists::Fail {
            return Err(RedshiftError::TableCreation(format!(
                "Could not create the table {} in the schema {} because it already exists.",
                table_name, schema
            )));
        }

        let resolved = schema::resolve(dtype, table)?;
        let encoder = Encoder::new(self.config.encode.max_statement_size);
        let encoded = encoder.encode(table, &resolved, schema, table_name)?;

        if !exists {
            let create_sql = statement::create_table_sql(&encoded)?;
            self.client.execute(&create_sql).await?;
            info!("Created table {}.{} ({})", schema, table_name, encoded.column_definitions());
        }

        let statements = statement::insert_statements(&encoded, encoder.max_statement_size())?;
        let total_rows = encoded.num_rows();
        try_join_all(statements.iter().map(|stmt| async move {
            self.client.execute(&stmt.sql).await?;
            info!(
                "{} out of {} rows loaded.",
                total_rows - stmt.remaining_rows,
                total_rows
            );
            Ok::<_, RedshiftError>(())
        }))
        .await?;

        Ok(WriteSummary {
            schema: schema.to_string(),
            table: table_name.to_string(),
            created: !exists,
            rows_loaded: total_rows,
            statements: statements.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, ColumnData};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        tables: Vec<String>,
        executed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl StatementClient for RecordingClient {
        async fn execute(&self, sql: &str) -> Result<()> {
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(())
        }

        async fn query(&self, _sql: &str) -> Result<Vec<StatementResult>> {
            Ok(Vec::new())
        }

        async fn list_tables(&self, _schema: &str) -> Result<Vec<String>> {
            Ok(self.tables.clone())
        }
    }

    fn table() -> TypedTable {
        TypedTable::try_new(vec![Column::new("id", ColumnData::Int32(vec![1, 2]))]).unwrap()
    }

    #[tokio::test]
    async fn test_existing_table_fails_by_default() {
        let client = RecordingClient {
            tables: vec!["t".to_string()],
            ..Default::default()
        };
        let connector = RedshiftConnector::new(client, Config::default());
        let err = connector
            .to_redshift(&table(), &DtypeSpec::from("integer"), "t")
            .await
            .unwrap_err();
        assert!(matches!(err, RedshiftError::TableCreation(_)));
        assert!(connector.client().executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_skips_create() {
        let client = RecordingClient {
            tables: vec!["t".to_string()],
            ..Default::default()
        };
        let mut config = Config::default();
        config.target.if_exists = IfExists::Append;
        let connector = RedshiftConnector::new(client, config);
        let summary = connector
            .to_redshift(&table(), &DtypeSpec::from("integer"), "t")
            .await
            .unwrap();
        assert!(!summary.created);
        let executed = connector.client().executed.lock().unwrap();
        assert_eq!(executed.len(), 1);
        assert!(executed[0].starts_with("INSERT INTO"));
    }
}

//! SQL statement generation for table writes.

use crate::core::{qualify, quote_identifier};
use crate::encode::EncodedTable;
use crate::error::Result;

/// One INSERT statement and the number of rows still to load after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub sql: String,
    pub remaining_rows: usize,
}

/// Build `CREATE TABLE "schema"."table" ("col" TYPE,...);`.
pub fn create_table_sql(encoded: &EncodedTable) -> Result<String> {
    let col_defs = encoded
        .columns
        .iter()
        .map(|c| Ok(format!("{} {}", quote_identifier(&c.name)?, c.redshift_type)))
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "CREATE TABLE {} ({});",
        qualify(&encoded.schema, &encoded.table)?,
        col_defs.join(",")
    ))
}

/// Build `INSERT INTO "schema"."table" ("a","b") VALUES `.
pub fn insert_prefix<'a, I>(schema: &str, table: &str, columns: I) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let cols = columns
        .into_iter()
        .map(quote_identifier)
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ",
        qualify(schema, table)?,
        cols.join(",")
    ))
}

/// Render one row of literals as `(v1,v2,...)`.
pub fn row_values(row: &[String]) -> String {
    format!("({})", row.join(","))
}

/// Split the encoded rows into INSERT statements below `max_statement_size`
/// bytes.
///
/// Rows are appended to the current statement until the next one would push
/// it to the limit. A statement always holds at least one row; the encoder
/// has already rejected rows that cannot fit on their own.
pub fn insert_statements(encoded: &EncodedTable, max_statement_size: usize) -> Result<Vec<InsertStatement>> {
    if encoded.rows.is_empty() {
        return Ok(Vec::new());
    }

    let prefix = insert_prefix(
        &encoded.schema,
        &encoded.table,
        encoded.columns.iter().map(|c| c.name.as_str()),
    )?;
    let total_rows = encoded.rows.len();

    let mut statements = Vec::new();
    let mut sql = prefix.clone();
    for (index, row) in encoded.rows.iter().enumerate() {
        let values = row_values(row);
        if index == 0 {
            sql.push_str(&values);
            continue;
        }

        // Existing statement, a comma and the new tuple.
        if sql.len() + 1 + values.len() >= max_statement_size {
            sql.push(';');
            statements.push(InsertStatement {
                sql: std::mem::replace(&mut sql, format!("{}{}", prefix, values)),
                remaining_rows: total_rows - index,
            });
        } else {
            sql.push(',');
            sql.push_str(&values);
        }
    }
    sql.push(';');
    statements.push(InsertStatement {
        sql,
        remaining_rows: 0,
    });

    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RedshiftType;
    use crate::encode::ColumnDef;

    fn encoded(rows: Vec<Vec<&str>>) -> EncodedTable {
        EncodedTable {
            schema: "public".to_string(),
            table: "t".to_string(),
            columns: vec![
                ColumnDef {
                    name: "id".to_string(),
                    redshift_type: RedshiftType::Integer,
                },
                ColumnDef {
                    name: "name".to_string(),
                    redshift_type: RedshiftType::VarChar(60),
                },
            ],
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        }
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(&encoded(vec![])).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"public\".\"t\" (\"id\" INTEGER,\"name\" VARCHAR(60));"
        );
    }

    #[test]
    fn test_insert_prefix() {
        let prefix = insert_prefix("public", "t", ["id", "na\"me"]).unwrap();
        assert_eq!(
            prefix,
            "INSERT INTO \"public\".\"t\" (\"id\",\"na\"\"me\") VALUES "
        );
    }

    #[test]
    fn test_single_statement() {
        let stmts = insert_statements(&encoded(vec![vec!["1", "'a'"], vec!["2", "NULL"]]), 100_000).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(
            stmts[0].sql,
            "INSERT INTO \"public\".\"t\" (\"id\",\"name\") VALUES (1,'a'),(2,NULL);"
        );
        assert_eq!(stmts[0].remaining_rows, 0);
    }

    #[test]
    fn test_chunking_respects_limit() {
        let rows: Vec<Vec<&str>> = (0..10).map(|_| vec!["1", "'abc'"]).collect();
        let table = encoded(rows);
        let prefix_len = insert_prefix("public", "t", ["id", "name"]).unwrap().len();
        // Room for the prefix and exactly two tuples plus the separator.
        let max = prefix_len + "(1,'abc')".len() * 2 + 2;
        let stmts = insert_statements(&table, max).unwrap();

        assert_eq!(stmts.len(), 5);
        for stmt in &stmts {
            assert!(stmt.sql.len() <= max);
            assert!(stmt.sql.ends_with(';'));
        }
        let remaining: Vec<usize> = stmts.iter().map(|s| s.remaining_rows).collect();
        assert_eq!(remaining, vec![8, 6, 4, 2, 0]);
    }

    #[test]
    fn test_no_rows_no_statements() {
        assert!(insert_statements(&encoded(vec![]), 1000).unwrap().is_empty());
    }
}

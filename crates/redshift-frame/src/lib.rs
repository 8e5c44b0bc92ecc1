//! # redshift-frame
//!
//! Typed tables in and out of Amazon Redshift through the Data API.
//!
//! This library provides:
//!
//! - **Decoding** of `GetStatementResult` pages into typed, columnar tables
//! - **Type resolution** of `dtype` declarations such as `"varchar(60)"`
//! - **All-or-nothing validation** of a table against its target types
//! - **Literal encoding** and size-bounded `CREATE TABLE` / `INSERT` generation
//! - A **connector** that drives a pluggable statement transport
//!
//! ## Example
//!
//! ```rust,no_run
//! use redshift_frame::{decode, encode::Encoder, schema, statement, DtypeSpec, StatementResult};
//!
//! fn main() -> redshift_frame::Result<()> {
//!     let page: StatementResult = serde_json::from_str(&std::fs::read_to_string("result.json")?)?;
//!     let table = decode::decode_pages(&[page])?;
//!
//!     let dtype = DtypeSpec::from("varchar(256)");
//!     let resolved = schema::resolve(&dtype, &table)?;
//!     let encoded = Encoder::default().encode(&table, &resolved, "public", "copy")?;
//!     for stmt in statement::insert_statements(&encoded, 100_000)? {
//!         println!("{}", stmt.sql);
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod connector;
pub mod core;
pub mod decode;
pub mod encode;
pub mod error;
pub mod schema;
pub mod statement;

// Re-exports for convenient access
pub use catalog::{RedshiftType, TypeTag};
pub use config::{Config, EncodeConfig, IfExists, TargetConfig};
pub use connector::{RedshiftConnector, StatementClient, WriteSummary};
pub use crate::core::{Column, ColumnData, ContainerKind, TypedTable, Value};
pub use decode::{Cell, ColumnMetadata, StatementResult};
pub use encode::{EncodedTable, Encoder};
pub use error::{RedshiftError, Result, Violation};
pub use schema::{Dtype, DtypeSpec, ResolvedSchema};

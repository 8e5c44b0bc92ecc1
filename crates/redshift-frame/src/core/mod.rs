//! Native data model shared by the decoder and the encoder.
//!
//! - [`value`]: borrowed cell values
//! - [`table`]: typed column containers and tables
//! - [`identifier`]: identifier validation and quoting

pub mod identifier;
pub mod table;
pub mod value;

pub use identifier::{qualify, quote_identifier, validate_identifier, validate_identifiers};
pub use table::{Column, ColumnData, ContainerKind, TypedTable};
pub use value::Value;

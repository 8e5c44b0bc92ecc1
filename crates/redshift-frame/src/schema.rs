//! Resolution of user-supplied `dtype` declarations against a table.
//!
//! A declaration is either one type applied to every column or a mapping
//! from column name to type. Types are given as tokens (`"varchar(60)"`) or
//! as ready-made [`RedshiftType`] descriptors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{self, RedshiftType};
use crate::core::TypedTable;
use crate::error::{RedshiftError, Result};

/// A single column type, as a token or a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dtype {
    Token(String),
    Type(RedshiftType),
}

impl Dtype {
    /// Resolve to a descriptor, parsing tokens through the catalog.
    pub fn resolve(&self) -> Result<RedshiftType> {
        match self {
            Dtype::Token(token) => catalog::resolve(token),
            Dtype::Type(t) => Ok(*t),
        }
    }
}

impl From<RedshiftType> for Dtype {
    fn from(t: RedshiftType) -> Self {
        Dtype::Type(t)
    }
}

impl From<&str> for Dtype {
    fn from(token: &str) -> Self {
        Dtype::Token(token.to_string())
    }
}

impl From<String> for Dtype {
    fn from(token: String) -> Self {
        Dtype::Token(token)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dtype::Token(token) => f.write_str(token),
            Dtype::Type(t) => write!(f, "{}", t),
        }
    }
}

/// A `dtype` declaration for a whole table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DtypeSpec {
    /// Applies to every column.
    Single(Dtype),
    /// One entry per column; keys not in the table are ignored.
    PerColumn(BTreeMap<String, Dtype>),
}

impl DtypeSpec {
    /// Build a per-column spec from `(column, dtype)` pairs.
    pub fn per_column<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Dtype>,
    {
        DtypeSpec::PerColumn(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Dtype> for DtypeSpec {
    fn from(dtype: Dtype) -> Self {
        DtypeSpec::Single(dtype)
    }
}

impl From<RedshiftType> for DtypeSpec {
    fn from(t: RedshiftType) -> Self {
        DtypeSpec::Single(Dtype::Type(t))
    }
}

impl From<&str> for DtypeSpec {
    fn from(token: &str) -> Self {
        DtypeSpec::Single(Dtype::from(token))
    }
}

/// A column paired with its resolved target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub name: String,
    pub redshift_type: RedshiftType,
}

/// Target types for every column of a table, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedSchema {
    pub columns: Vec<ResolvedColumn>,
}

impl ResolvedSchema {
    /// Look up the type resolved for a column.
    pub fn get(&self, name: &str) -> Option<RedshiftType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.redshift_type)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedColumn> {
        self.columns.iter()
    }
}

/// Resolve a `dtype` declaration for every column of `table`.
///
/// # Errors
///
/// - `NoColumn` when the table has no columns, or when a per-column mapping
///   lacks entries (every missing column is named, in table order).
/// - `InvalidRedshiftType` when a token does not parse.
pub fn resolve(spec: &DtypeSpec, table: &TypedTable) -> Result<ResolvedSchema> {
    let names = table.column_names();
    if names.is_empty() {
        return Err(RedshiftError::empty_table());
    }

    let columns = match spec {
        DtypeSpec::Single(dtype) => {
            let redshift_type = dtype.resolve()?;
            names
                .iter()
                .map(|name| ResolvedColumn {
                    name: name.to_string(),
                    redshift_type,
                })
                .collect()
        }
        DtypeSpec::PerColumn(map) => {
            let missing: Vec<String> = names
                .iter()
                .filter(|name| !map.contains_key(**name))
                .map(|name| name.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(RedshiftError::missing_columns(missing));
            }

            names
                .iter()
                .map(|name| {
                    Ok(ResolvedColumn {
                        name: name.to_string(),
                        redshift_type: map[*name].resolve()?,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        }
    };

    for column in &columns {
        debug!("Column '{}' resolved to {}", column.name, column.redshift_type);
    }

    Ok(ResolvedSchema { columns })
}

//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::encode::DEFAULT_MAX_STATEMENT_SIZE;
use crate::schema::DtypeSpec;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where and how tables are written.
    #[serde(default)]
    pub target: TargetConfig,

    /// Encoder limits.
    #[serde(default)]
    pub encode: EncodeConfig,

    /// Default `dtype` used when a write does not give one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<DtypeSpec>,
}

/// Target table configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Schema the table is written to.
    #[serde(default = "default_public_schema")]
    pub schema: String,

    /// Behavior when the table already exists.
    #[serde(default)]
    pub if_exists: IfExists,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            schema: default_public_schema(),
            if_exists: IfExists::default(),
        }
    }
}

/// Behavior when the target table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    /// Abort with a table creation error.
    #[default]
    Fail,

    /// Insert into the existing table without creating it.
    Append,
}

/// Encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeConfig {
    /// Upper bound in bytes for any single SQL statement.
    #[serde(default = "default_max_statement_size")]
    pub max_statement_size: usize,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            max_statement_size: default_max_statement_size(),
        }
    }
}

// Default value functions for serde
fn default_public_schema() -> String {
    "public".to_string()
}

fn default_max_statement_size() -> usize {
    DEFAULT_MAX_STATEMENT_SIZE
}

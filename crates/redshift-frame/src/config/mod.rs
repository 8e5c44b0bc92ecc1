//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Dtype, DtypeSpec};
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.target.schema, "public");
        assert_eq!(config.target.if_exists, IfExists::Fail);
        assert_eq!(config.encode.max_statement_size, 100_000);
        assert!(config.dtype.is_none());
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
target:
  schema: analytics
  if_exists: append
encode:
  max_statement_size: 2048
dtype:
  id: integer
  name: varchar(60)
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.target.schema, "analytics");
        assert_eq!(config.target.if_exists, IfExists::Append);
        assert_eq!(config.encode.max_statement_size, 2048);
        match config.dtype {
            Some(DtypeSpec::PerColumn(map)) => {
                assert_eq!(map["name"], Dtype::Token("varchar(60)".into()));
            }
            other => panic!("unexpected dtype: {other:?}"),
        }
    }

    #[test]
    fn test_single_dtype() {
        let config = Config::from_yaml("dtype: bigint").unwrap();
        assert_eq!(config.dtype, Some(DtypeSpec::Single(Dtype::Token("bigint".into()))));
    }

    #[test]
    fn test_unknown_if_exists_rejected() {
        let err = Config::from_yaml("target:\n  if_exists: replace\n").unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "target:\n  schema: staging").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.target.schema, "staging");
    }
}

//! Configuration validation.

use super::Config;
use crate::error::{RedshiftError, Result};

/// Smallest statement size that leaves room for a realistic INSERT.
pub const MIN_STATEMENT_SIZE: usize = 1024;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.target.schema.trim().is_empty() {
        return Err(RedshiftError::Config("target.schema is required".into()));
    }
    if config.target.schema.contains('\0') {
        return Err(RedshiftError::Config(
            "target.schema cannot contain NUL characters".into(),
        ));
    }

    if config.encode.max_statement_size < MIN_STATEMENT_SIZE {
        return Err(RedshiftError::Config(format!(
            "encode.max_statement_size must be at least {}, got {}",
            MIN_STATEMENT_SIZE, config.encode.max_statement_size
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_schema() {
        let mut config = Config::default();
        config.target.schema = "  ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_statement_size_floor() {
        let mut config = Config::default();
        config.encode.max_statement_size = 1023;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("max_statement_size"));
        config.encode.max_statement_size = 1024;
        assert!(validate(&config).is_ok());
    }
}

//! Identifier validation and quoting for generated Redshift SQL.
//!
//! Identifiers (schema, table and column names) cannot be bound as statement
//! parameters, so they are validated and then wrapped in double quotes with
//! embedded quotes doubled.

use crate::error::{RedshiftError, Result};

/// Check an identifier, returning the reason it is unusable.
///
/// Rejects empty identifiers and identifiers containing NUL characters.
/// A `&str` is always valid UTF-8, so no further encoding check applies.
pub fn check_identifier(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("Empty table or column name specified".to_string());
    }

    if name.contains('\0') {
        return Err(format!("Identifier cannot contain NULs: {:?}", name));
    }

    Ok(())
}

/// Validate an identifier.
///
/// # Errors
///
/// Returns `RedshiftError::MetadataEncode` with the reason.
pub fn validate_identifier(name: &str) -> Result<()> {
    check_identifier(name).map_err(|reason| RedshiftError::MetadataEncode(vec![reason]))
}

/// Validate a set of identifiers, collecting every problem.
///
/// Each distinct name is checked once.
pub fn validate_identifiers<'a, I>(names: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<&str> = Vec::new();
    let mut problems = Vec::new();
    for name in names {
        if seen.contains(&name) {
            continue;
        }
        seen.push(name);
        if let Err(reason) = check_identifier(name) {
            problems.push(reason);
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(RedshiftError::MetadataEncode(problems))
    }
}

/// Quote a Redshift identifier.
///
/// Escapes double quotes by doubling them and wraps in double quotes.
/// Validates the identifier before quoting.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(quote_identifier("users")?, "\"users\"");
/// assert_eq!(quote_identifier("table\"name")?, "\"table\"\"name\"");
/// ```
pub fn quote_identifier(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Qualify a table name with its schema.
///
/// Returns `"schema"."table"` with proper quoting.
pub fn qualify(schema: &str, table: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_identifier(schema)?, quote_identifier(table)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("my_table").is_ok());
        assert!(validate_identifier("column with spaces").is_ok());
        assert!(validate_identifier("日本語").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.unwrap_err().to_string().contains("Empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let result = validate_identifier("table\0name");
        assert!(result.unwrap_err().to_string().contains("NULs"));
    }

    #[test]
    fn test_validate_identifiers_collects_all() {
        let err = validate_identifiers(["", "ok", "a\0b", ""]).unwrap_err();
        match err {
            RedshiftError::MetadataEncode(problems) => assert_eq!(problems.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_quote_identifier_escapes_double_quote() {
        assert_eq!(quote_identifier("users").unwrap(), "\"users\"");
        assert_eq!(quote_identifier("table\"name").unwrap(), "\"table\"\"name\"");
    }

    #[test]
    fn test_quote_identifier_sql_injection_safely_quoted() {
        let result = quote_identifier("Robert\"); DROP TABLE Students;--");
        assert_eq!(result.unwrap(), "\"Robert\"\"); DROP TABLE Students;--\"");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("public", "users").unwrap(), "\"public\".\"users\"");
        assert!(qualify("", "users").is_err());
        assert!(qualify("public", "t\0").is_err());
    }
}

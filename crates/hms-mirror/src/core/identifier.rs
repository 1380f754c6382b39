//! Identifier validation and quoting for generated HiveQL.
//!
//! Database and table names flow from discovered metadata straight into
//! generated statements. Names made only of ASCII letters, digits and
//! underscores are emitted bare; anything else is wrapped in backticks with
//! embedded backticks doubled.

use crate::error::{MirrorError, Result};

/// Maximum identifier length accepted by the Hive metastore.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers, identifiers containing null bytes or newlines,
/// and identifiers exceeding the metastore limit.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MirrorError::inventory("Identifier cannot be empty"));
    }

    if name.contains('\0') || name.contains('\n') {
        return Err(MirrorError::inventory(format!(
            "SECURITY: Identifier contains a control character (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MirrorError::inventory(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// True when the name can be written without quoting.
pub fn is_plain(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Render an identifier for HiveQL, quoting with backticks only when needed.
///
/// ```ignore
/// assert_eq!(hive_ident("web_sales"), "web_sales");
/// assert_eq!(hive_ident("my-table"), "`my-table`");
/// ```
pub fn hive_ident(name: &str) -> String {
    if is_plain(name) {
        name.to_string()
    } else {
        quote_hive(name)
    }
}

/// Always quote an identifier with backticks, as `SHOW CREATE TABLE` does.
pub fn quote_hive(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Strip surrounding backticks from an identifier taken out of DDL text.
pub fn unquote_hive(name: &str) -> String {
    let trimmed = name.trim();
    match trimmed.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        Some(inner) => inner.replace("``", "`"),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("web_sales").is_ok());
        assert!(validate_identifier("tpcds_bin_partitioned_orc_10").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte_and_newline() {
        assert!(validate_identifier("users\0; DROP TABLE x").is_err());
        assert!(validate_identifier("users\nDROP TABLE x").is_err());
    }

    #[test]
    fn test_validate_identifier_length_boundary() {
        assert!(validate_identifier(&"a".repeat(128)).is_ok());
        assert!(validate_identifier(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_hive_ident_bare_and_quoted() {
        assert_eq!(hive_ident("ext_part_01"), "ext_part_01");
        assert_eq!(hive_ident("my-table"), "`my-table`");
        assert_eq!(hive_ident("odd`name"), "`odd``name`");
    }

    #[test]
    fn test_unquote_round_trip() {
        assert_eq!(unquote_hive("`ext_part_01`"), "ext_part_01");
        assert_eq!(unquote_hive(&quote_hive("odd`name")), "odd`name");
        assert_eq!(unquote_hive(" plain "), "plain");
    }
}

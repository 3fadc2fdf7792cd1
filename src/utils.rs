// ABOUTME: Utility functions for input validation and log hygiene
// ABOUTME: Validates database paths and sanitizes identifiers before they reach logs

use crate::error::{Error, Result};
use std::path::Path;

/// Validate a database path before opening it
///
/// Accepts either an SQLite URI (`file:...`), which is handed to SQLite
/// untouched, or a path to an existing regular file.
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] if the path is:
/// - Empty or whitespace only
/// - Missing on disk
/// - A directory rather than a file
///
/// # Examples
///
/// ```
/// # use sqlite_dumper::utils::validate_database_path;
/// assert!(validate_database_path("").is_err());
/// assert!(validate_database_path("file:app.db?mode=ro").is_ok());
/// ```
pub fn validate_database_path(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let display = path.to_string_lossy();

    if display.trim().is_empty() {
        return Err(Error::InvalidPath(
            "Database path cannot be empty".to_string(),
        ));
    }

    if display.starts_with("file:") {
        return Ok(());
    }

    if !path.exists() {
        return Err(Error::InvalidPath(format!(
            "{} does not exist.\n\
             Pass the path of an existing SQLite database file",
            display
        )));
    }

    if !path.is_file() {
        return Err(Error::InvalidPath(format!(
            "{} is not a regular file",
            display
        )));
    }

    Ok(())
}

/// Sanitize an identifier (table name, index name, etc.) for display
///
/// Removes control characters and limits length to prevent log injection and
/// keep messages readable. The dump itself never uses this; table names are
/// emitted through the literal formatter instead.
///
/// # Examples
///
/// ```
/// # use sqlite_dumper::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

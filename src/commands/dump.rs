// ABOUTME: Dump command implementation
// ABOUTME: Opens the source database and writes its SQL dump to stdout or a file

use crate::db::SqliteDatabase;
use crate::export::{self, DumpOptions, DumpSummary};
use crate::filters::TableFilter;
use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Dump a database as replayable SQL
///
/// With no `output`, the dump is streamed to stdout. With an `output` path the
/// dump is written to a temporary file beside it and moved into place only
/// once it completed, so a failed dump never replaces an earlier good one.
///
/// # Arguments
///
/// * `db_path` - Path (or `file:` URI) of the SQLite database to dump
/// * `output` - Destination file, or `None` for stdout
/// * `filter` - Tables to include, exclude, or dump schema-only
/// * `skip_confirmation` - Overwrite an existing output file without asking
///
/// # Errors
///
/// This function will return an error if:
/// - The database cannot be opened
/// - Any catalog, schema or row query fails
/// - A cell value cannot be encoded as a literal
/// - The output cannot be written
/// - User declines to overwrite an existing output file
///
/// # Examples
///
/// ```no_run
/// # use anyhow::Result;
/// # use sqlite_dumper::commands::dump;
/// # use sqlite_dumper::filters::TableFilter;
/// # async fn example() -> Result<()> {
/// dump("app.db", Some("app.sql".as_ref()), TableFilter::empty(), true).await?;
/// # Ok(())
/// # }
/// ```
pub async fn dump(
    db_path: &str,
    output: Option<&Path>,
    filter: TableFilter,
    skip_confirmation: bool,
) -> Result<()> {
    tracing::info!("Opening database {}...", db_path);
    let db = SqliteDatabase::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path))?;

    let options = DumpOptions { filter };

    let summary = match output {
        None => {
            let mut out = BufWriter::new(io::stdout());
            export::dump_database(&db, &mut out, &options)
                .await
                .context("Dump failed")?
        }
        Some(path) => dump_to_file(&db, path, &options, skip_confirmation).await?,
    };

    tracing::info!(
        "✅ Dump complete: {} table(s), {} row(s)",
        summary.tables,
        summary.rows
    );
    Ok(())
}

async fn dump_to_file(
    db: &SqliteDatabase,
    path: &Path,
    options: &DumpOptions,
    skip_confirmation: bool,
) -> Result<DumpSummary> {
    if path.exists() && !skip_confirmation && !confirm_overwrite(path)? {
        tracing::warn!("⚠ User cancelled operation");
        bail!("Dump cancelled by user");
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

    let mut out = BufWriter::new(temp);
    let summary = export::dump_database(db, &mut out, options)
        .await
        .context("Dump failed")?;
    out.flush().context("Failed to flush dump output")?;

    let temp = out
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to finish writing dump output")?;
    temp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!("✓ Dump written to {}", path.display());
    Ok(summary)
}

fn confirm_overwrite(path: &Path) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("{} already exists. Overwrite it?", path.display()))
        .default(false)
        .interact()
        .context("Failed to get confirmation")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn source_database(dir: &Path) -> String {
        let path = dir.join("source.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE t (name TEXT);
             INSERT INTO t VALUES ('a');",
        )
        .unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_dump_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = source_database(dir.path());
        let output = dir.path().join("out.sql");

        dump(&db_path, Some(output.as_path()), TableFilter::empty(), true)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            content,
            "PRAGMA foreign_keys=OFF;\nCREATE TABLE t (name TEXT);\nINSERT INTO t VALUES ('a');\n"
        );
    }

    #[tokio::test]
    async fn test_failed_dump_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("bad.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch("CREATE TABLE t (x); INSERT INTO t VALUES (CAST(X'ff' AS TEXT));")
            .unwrap();
        drop(conn);

        let output = dir.path().join("out.sql");
        std::fs::write(&output, "previous dump\n").unwrap();

        let result = dump(
            &db_path.to_string_lossy(),
            Some(output.as_path()),
            TableFilter::empty(),
            true,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous dump\n");
    }

    #[tokio::test]
    async fn test_dump_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.db");
        let result = dump(&missing.to_string_lossy(), None, TableFilter::empty(), true).await;
        assert!(result.is_err());
    }
}

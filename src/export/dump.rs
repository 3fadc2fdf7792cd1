// ABOUTME: Dump orchestrator that renders a database as replayable SQL
// ABOUTME: Emits the pragma, then per table its CREATE, INSERTs and secondary objects

use crate::db::{query, Database};
use crate::error::Result;
use crate::export::catalog;
use crate::export::literal::{format_identifier, format_row};
use crate::filters::TableFilter;
use crate::utils::sanitize_identifier;
use std::io::Write;

/// First line of every dump. Tables are recreated in catalog order, which
/// need not respect foreign keys.
pub const PREAMBLE: &str = "PRAGMA foreign_keys=OFF;";

#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    pub filter: TableFilter,
}

/// Counts of what a finished dump emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub tables: usize,
    pub rows: u64,
    pub secondary_objects: usize,
}

/// Write a complete SQL dump of `db` to `out`
///
/// The walk is strictly sequential, catalog first and then one table at a
/// time. Only one statement is in flight at any moment.
///
/// # Output
///
/// ```text
/// PRAGMA foreign_keys=OFF;
/// CREATE TABLE t (name TEXT);
/// INSERT INTO t VALUES ('a');
/// INSERT INTO t VALUES ('b''s');
/// CREATE INDEX t_name ON t (name);
/// ```
///
/// # Errors
///
/// The first error from any statement, row, or write aborts the dump and is
/// returned as-is. A catalog failure leaves `out` untouched; after that, lines
/// written before the failure stay on `out` and a failed dump must be
/// discarded, not resumed.
pub async fn dump_database<W: Write>(
    db: &(impl Database + ?Sized),
    out: &mut W,
    options: &DumpOptions,
) -> Result<DumpSummary> {
    tracing::info!("Starting database dump...");

    let tables = catalog::list_tables(db).await?;

    writeln!(out, "{}", PREAMBLE)?;
    let mut summary = DumpSummary::default();

    for table in &tables {
        if !options.filter.should_dump_table(table) {
            tracing::debug!("Skipping table '{}'", sanitize_identifier(table));
            continue;
        }

        let schema_only = options.filter.is_schema_only(table);
        let (rows, secondary) = dump_table(db, out, table, schema_only).await?;

        summary.tables += 1;
        summary.rows += rows;
        summary.secondary_objects += secondary;
    }

    out.flush()?;

    tracing::info!(
        "✓ Dumped {} table(s), {} row(s), {} secondary object(s)",
        summary.tables,
        summary.rows,
        summary.secondary_objects
    );

    Ok(summary)
}

async fn dump_table<W: Write>(
    db: &(impl Database + ?Sized),
    out: &mut W,
    table: &str,
    schema_only: bool,
) -> Result<(u64, usize)> {
    let schema = catalog::table_schema(db, table).await?;
    let identifier = format_identifier(table);

    writeln!(out, "{};", schema.create_table)?;

    let rows = if schema_only {
        0
    } else {
        dump_table_rows(db, out, table, &identifier).await?
    };

    for object in &schema.secondary {
        writeln!(out, "{};", object.sql)?;
    }

    tracing::debug!(
        "  Dumped '{}': {} row(s), {} secondary object(s){}",
        sanitize_identifier(table),
        rows,
        schema.secondary.len(),
        if schema_only { " (schema only)" } else { "" }
    );

    Ok((rows, schema.secondary.len()))
}

async fn dump_table_rows<W: Write>(
    db: &(impl Database + ?Sized),
    out: &mut W,
    table: &str,
    identifier: &str,
) -> Result<u64> {
    let (select, target) = match catalog::insertable_columns(db, table).await? {
        None => (format!("SELECT * FROM {}", identifier), identifier.to_string()),
        Some(columns) => {
            let list = columns
                .iter()
                .map(|c| format_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            (
                format!("SELECT {} FROM {}", list, identifier),
                format!("{}({})", identifier, list),
            )
        }
    };

    let mut result = query(db, &select).await?;
    let rows = result.rows();

    let mut count = 0u64;
    while let Some(row) = rows.next_row().await {
        let values = format_row(&row?)?;
        writeln!(out, "INSERT INTO {} VALUES ({});", target, values.join(", "))?;
        count += 1;
    }

    Ok(count)
}

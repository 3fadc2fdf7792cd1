// ABOUTME: Catalog introspection for dumps
// ABOUTME: Discovers user tables and the schema objects bound to each one

use crate::db::{query, Database, Value};
use crate::error::{Error, Result};
use crate::export::literal::{format_sql_text, format_text_literal};

/// Lists user tables, leaving out SQLite's own tables and the bookkeeping
/// tables that Litestream and libSQL's WASM UDF support create.
pub const LIST_TABLES_SQL: &str = "SELECT name FROM sqlite_master \
     WHERE type='table' AND name NOT LIKE 'sqlite_%' \
     AND name NOT IN ('_litestream_seq', '_litestream_lock', 'libsql_wasm_func_table')";

/// A schema object (index, trigger, ...) that belongs to a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaObject {
    pub kind: String,
    pub sql: String,
}

/// Everything needed to recreate one table's schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub create_table: String,
    /// Non-table objects, in catalog order
    pub secondary: Vec<SchemaObject>,
}

/// List user table names in catalog order.
///
/// The names are drained into memory before returning: a single-connection
/// backend cannot run the per-table statements while this one is still open.
pub async fn list_tables(db: &(impl Database + ?Sized)) -> Result<Vec<String>> {
    let rows = query(db, LIST_TABLES_SQL).await?.collect_rows().await?;

    let tables = rows
        .into_iter()
        .map(|row| match row.into_iter().next() {
            Some(Value::Text(name)) => Ok(name),
            other => Err(Error::schema(
                "sqlite_master",
                format!(
                    "table name is {}, expected text",
                    other.as_ref().map_or("missing", Value::kind_name)
                ),
            )),
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!("Found {} user tables", tables.len());
    Ok(tables)
}

/// Read the CREATE statement and secondary objects for `table`.
///
/// Objects without SQL (the implicit indexes behind UNIQUE and PRIMARY KEY
/// constraints) are skipped.
pub async fn table_schema(db: &(impl Database + ?Sized), table: &str) -> Result<TableSchema> {
    let sql = format!(
        "SELECT type, sql FROM sqlite_master WHERE tbl_name = {}",
        format_text_literal(table)
    );
    let mut result = query(db, &sql).await?;
    let rows = result.rows();

    let mut create_table = None;
    let mut secondary = Vec::new();

    while let Some(row) = rows.next_row().await {
        let row = row?;
        let [kind, sql] = row.as_slice() else {
            return Err(Error::schema(
                table,
                format!("catalog row has {} columns, expected 2", row.len()),
            ));
        };

        let kind = kind
            .as_text()
            .ok_or_else(|| Error::schema(table, "could not convert object type to text"))?;

        if *sql == Value::Null {
            tracing::debug!("Skipping implicit {} on {}", kind, table);
            continue;
        }

        let sql =
            format_sql_text(sql).map_err(|e| Error::schema(table, format!("{} ({})", e, kind)))?;

        if kind == "table" {
            create_table = Some(sql);
        } else {
            secondary.push(SchemaObject {
                kind: kind.to_string(),
                sql,
            });
        }
    }

    let create_table = create_table
        .ok_or_else(|| Error::schema(table, "no CREATE TABLE statement in catalog"))?;

    Ok(TableSchema {
        create_table,
        secondary,
    })
}

/// Columns an INSERT may name, or `None` when `SELECT *` lines up with a
/// plain `INSERT ... VALUES`.
///
/// Generated columns appear in `SELECT *` but reject inserted values, so a
/// table that has any is dumped with an explicit column list.
pub async fn insertable_columns(
    db: &(impl Database + ?Sized),
    table: &str,
) -> Result<Option<Vec<String>>> {
    let sql = format!(
        "SELECT name, hidden FROM pragma_table_xinfo({})",
        format_text_literal(table)
    );
    let rows = query(db, &sql).await?.collect_rows().await?;

    let mut columns = Vec::with_capacity(rows.len());
    let mut skipped = false;
    for row in &rows {
        match row.as_slice() {
            [Value::Text(name), Value::Integer(0)] => columns.push(name.clone()),
            [Value::Text(name), Value::Integer(_)] => {
                tracing::debug!("Leaving generated column {} out of {}", name, table);
                skipped = true;
            }
            _ => return Err(Error::schema(table, "could not read column list")),
        }
    }

    Ok(skipped.then_some(columns))
}

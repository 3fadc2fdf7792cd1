// ABOUTME: Table checksums for verifying that a dump replays faithfully
// ABOUTME: Hashes every row's literal encoding and compares source against target

use crate::db::{query, Database};
use crate::error::Result;
use crate::export::catalog;
use crate::export::literal::{format_identifier, format_row};
use crate::filters::TableFilter;
use crate::utils::sanitize_identifier;
use sha2::{Digest, Sha256};

/// Checksum and row count of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChecksum {
    pub checksum: String,
    pub row_count: u64,
}

/// Result of comparing one table between two databases.
///
/// A side is `None` when the table does not exist there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumResult {
    pub table: String,
    pub source: Option<TableChecksum>,
    pub target: Option<TableChecksum>,
    pub schema_only: bool,
}

impl ChecksumResult {
    /// Returns true if the table exists on both sides with identical rows.
    /// Schema-only tables only need to exist and be empty on the target.
    pub fn is_valid(&self) -> bool {
        match (&self.source, &self.target) {
            (Some(_), Some(target)) if self.schema_only => target.row_count == 0,
            (Some(source), Some(target)) => source == target,
            _ => false,
        }
    }
}

/// Compute an order-insensitive checksum of a table's contents
///
/// Each row is hashed from its SQL literal encoding (length-prefixed, so
/// cells cannot bleed into each other); the row digests are sorted and hashed
/// again. Two tables match when they hold the same multiset of rows.
pub async fn table_checksum(db: &(impl Database + ?Sized), table: &str) -> Result<TableChecksum> {
    let sql = format!("SELECT * FROM {}", format_identifier(table));
    let mut result = query(db, &sql).await?;
    let rows = result.rows();

    let mut digests: Vec<Vec<u8>> = Vec::new();
    while let Some(row) = rows.next_row().await {
        let mut hasher = Sha256::new();
        for literal in format_row(&row?)? {
            hasher.update((literal.len() as u64).to_le_bytes());
            hasher.update(literal.as_bytes());
        }
        digests.push(hasher.finalize().to_vec());
    }

    digests.sort_unstable();

    let mut hasher = Sha256::new();
    for digest in &digests {
        hasher.update(digest);
    }

    Ok(TableChecksum {
        checksum: hex::encode(hasher.finalize()),
        row_count: digests.len() as u64,
    })
}

/// A table scheduled for comparison and the sides it exists on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTable {
    pub name: String,
    pub in_source: bool,
    pub in_target: bool,
}

/// Tables to compare: source tables in catalog order, then tables that only
/// exist on the target. Both sides are narrowed by `filter`.
pub async fn comparison_plan(
    source: &(impl Database + ?Sized),
    target: &(impl Database + ?Sized),
    filter: &TableFilter,
) -> Result<Vec<PlannedTable>> {
    let source_tables = catalog::list_tables(source).await?;
    let target_tables = catalog::list_tables(target).await?;

    let mut plan: Vec<PlannedTable> = source_tables
        .iter()
        .filter(|t| filter.should_dump_table(t))
        .map(|t| PlannedTable {
            name: t.clone(),
            in_source: true,
            in_target: target_tables.contains(t),
        })
        .collect();

    plan.extend(
        target_tables
            .iter()
            .filter(|t| filter.should_dump_table(t) && !source_tables.contains(t))
            .map(|t| PlannedTable {
                name: t.clone(),
                in_source: false,
                in_target: true,
            }),
    );

    Ok(plan)
}

/// Compare one planned table between source and target
pub async fn compare_table(
    source: &(impl Database + ?Sized),
    target: &(impl Database + ?Sized),
    table: &PlannedTable,
    filter: &TableFilter,
) -> Result<ChecksumResult> {
    tracing::debug!("Comparing table {}", sanitize_identifier(&table.name));

    let source_checksum = if table.in_source {
        Some(table_checksum(source, &table.name).await?)
    } else {
        None
    };
    let target_checksum = if table.in_target {
        Some(table_checksum(target, &table.name).await?)
    } else {
        None
    };

    Ok(ChecksumResult {
        table: table.name.clone(),
        source: source_checksum,
        target: target_checksum,
        schema_only: filter.is_schema_only(&table.name),
    })
}

/// Compare every table of two databases
pub async fn compare_databases(
    source: &(impl Database + ?Sized),
    target: &(impl Database + ?Sized),
    filter: &TableFilter,
) -> Result<Vec<ChecksumResult>> {
    let plan = comparison_plan(source, target, filter).await?;

    let mut results = Vec::with_capacity(plan.len());
    for table in &plan {
        results.push(compare_table(source, target, table, filter).await?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteDatabase;

    fn database(sql: &str) -> SqliteDatabase {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.execute_batch(sql).unwrap();
        db
    }

    #[tokio::test]
    async fn test_checksum_ignores_row_order() {
        let a = database("CREATE TABLE t (x); INSERT INTO t VALUES (1), ('two'), (NULL);");
        let b = database("CREATE TABLE t (x); INSERT INTO t VALUES (NULL), ('two'), (1);");

        let left = table_checksum(&a, "t").await.unwrap();
        let right = table_checksum(&b, "t").await.unwrap();
        assert_eq!(left, right);
        assert_eq!(left.row_count, 3);
    }

    #[tokio::test]
    async fn test_checksum_distinguishes_types() {
        let a = database("CREATE TABLE t (x); INSERT INTO t VALUES (1);");
        let b = database("CREATE TABLE t (x); INSERT INTO t VALUES ('1');");

        let left = table_checksum(&a, "t").await.unwrap();
        let right = table_checksum(&b, "t").await.unwrap();
        assert_ne!(left.checksum, right.checksum);
    }

    #[tokio::test]
    async fn test_compare_databases_reports_missing_tables() {
        let source = database("CREATE TABLE a (x); CREATE TABLE b (x); INSERT INTO a VALUES (1);");
        let target = database("CREATE TABLE a (x); CREATE TABLE c (x); INSERT INTO a VALUES (1);");

        let results = compare_databases(&source, &target, &TableFilter::empty())
            .await
            .unwrap();

        let summary: Vec<_> = results
            .iter()
            .map(|r| (r.table.as_str(), r.is_valid()))
            .collect();
        assert_eq!(summary, vec![("a", true), ("b", false), ("c", false)]);
        assert!(results[1].target.is_none());
        assert!(results[2].source.is_none());
    }

    #[tokio::test]
    async fn test_schema_only_tables_must_be_empty() {
        let source = database("CREATE TABLE s (x); INSERT INTO s VALUES (1);");
        let empty_target = database("CREATE TABLE s (x);");
        let filter = TableFilter::empty()
            .with_schema_only(vec!["s".to_string()])
            .unwrap();

        let results = compare_databases(&source, &empty_target, &filter)
            .await
            .unwrap();
        assert!(results[0].is_valid());

        let results = compare_databases(&source, &source, &filter).await.unwrap();
        assert!(!results[0].is_valid());
    }
}

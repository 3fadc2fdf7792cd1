// ABOUTME: Verify command implementation - Validate a dump replays faithfully
// ABOUTME: Replays the dump into a scratch database and compares table checksums

use crate::db::SqliteDatabase;
use crate::export::checksum::{compare_table, comparison_plan, ChecksumResult, TableChecksum};
use crate::filters::TableFilter;
use crate::utils::sanitize_identifier;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Verify that a dump file reproduces its source database
///
/// 1. Replays the dump into a fresh in-memory database
/// 2. Lists the tables on both sides
/// 3. Compares each table's row checksum between source and replay
/// 4. Reports mismatches and missing tables
///
/// Pass the same `filter` that produced the dump; tables it excluded are not
/// compared and schema-only tables only need to exist and be empty.
///
/// # Errors
///
/// This function will return an error if:
/// - The source database cannot be opened
/// - The dump file cannot be read or fails to replay
/// - Any table fails verification
///
/// # Examples
///
/// ```no_run
/// # use anyhow::Result;
/// # use sqlite_dumper::commands::verify;
/// # use sqlite_dumper::filters::TableFilter;
/// # async fn example() -> Result<()> {
/// verify("app.db", "app.sql".as_ref(), TableFilter::empty()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn verify(db_path: &str, dump_path: &Path, filter: TableFilter) -> Result<()> {
    tracing::info!("Starting dump verification...");
    tracing::info!("");

    tracing::info!("Opening source database...");
    let source = SqliteDatabase::open(db_path)
        .with_context(|| format!("Failed to open source database {}", db_path))?;

    tracing::info!("Replaying {}...", dump_path.display());
    let dump = std::fs::read_to_string(dump_path)
        .with_context(|| format!("Failed to read dump file {}", dump_path.display()))?;
    let replay = SqliteDatabase::open_in_memory().context("Failed to create scratch database")?;
    replay
        .execute_batch(&dump)
        .context("Dump failed to replay into an empty database")?;
    tracing::info!("✓ Dump replayed");

    tracing::info!("Discovering tables...");
    let plan = comparison_plan(&source, &replay, &filter)
        .await
        .context("Failed to list tables")?;

    if plan.is_empty() {
        tracing::warn!("⚠ No tables found to verify");
        return Ok(());
    }

    tracing::info!("Found {} tables to verify", plan.len());
    tracing::info!("");

    let progress = ProgressBar::new(plan.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("##-"),
    );

    let mut results = Vec::with_capacity(plan.len());
    for table in &plan {
        let result = compare_table(&source, &replay, table, &filter)
            .await
            .with_context(|| format!("Failed to compare table '{}'", table.name))?;
        progress.inc(1);
        progress.set_message(format!("Verified {}", sanitize_identifier(&table.name)));
        results.push(result);
    }

    progress.finish_with_message("Verification complete");
    tracing::info!("");

    let mismatches = report(&results);
    if mismatches > 0 {
        tracing::error!("⚠ DUMP DOES NOT REPRODUCE THE SOURCE!");
        tracing::error!("  {} table(s) differ after replay", mismatches);
        tracing::info!("");
        tracing::info!("Possible causes:");
        tracing::info!("  - The source was written to while the dump was taken");
        tracing::info!("  - The dump was produced with different table rules");
        tracing::info!("  - The dump file was edited or truncated");
        tracing::info!("");

        anyhow::bail!("{} table(s) failed verification", mismatches);
    }

    tracing::info!("✓ ALL TABLES VERIFIED SUCCESSFULLY!");
    tracing::info!("  All {} tables match after replay", results.len());
    Ok(())
}

/// Log one line per table plus a summary block; returns the mismatch count
fn report(results: &[ChecksumResult]) -> usize {
    let mut mismatches = 0;

    for result in results {
        let name = sanitize_identifier(&result.table);
        match (&result.source, &result.target) {
            (Some(source), Some(_)) if result.is_valid() => {
                if result.schema_only {
                    tracing::info!("  ✓ {}: Schema present (data skipped)", name);
                } else {
                    tracing::info!(
                        "  ✓ {}: Match ({} rows, checksum: {})",
                        name,
                        source.row_count,
                        short(source)
                    );
                }
            }
            (Some(source), Some(target)) => {
                tracing::error!(
                    "  ✗ {}: MISMATCH: source={} ({}), replay={} ({})",
                    name,
                    short(source),
                    source.row_count,
                    short(target),
                    target.row_count
                );
                mismatches += 1;
            }
            (Some(_), None) => {
                tracing::error!("  ✗ {}: missing from dump", name);
                mismatches += 1;
            }
            (None, _) => {
                tracing::error!("  ✗ {}: present in dump but not in source", name);
                mismatches += 1;
            }
        }
    }

    tracing::info!("");
    tracing::info!("========================================");
    tracing::info!("Verification Summary");
    tracing::info!("========================================");
    tracing::info!("Total tables: {}", results.len());
    tracing::info!("✓ Matches: {}", results.len() - mismatches);
    tracing::info!("✗ Mismatches: {}", mismatches);
    tracing::info!("========================================");
    tracing::info!("");

    mismatches
}

fn short(checksum: &TableChecksum) -> &str {
    &checksum.checksum[..8]
}

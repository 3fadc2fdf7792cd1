// ABOUTME: TOML configuration for dump table rules
// ABOUTME: Loads include/exclude/schema-only lists and merges them with CLI flags

use crate::filters::TableFilter;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Table rules read from a config file, e.g.
///
/// ```toml
/// [tables]
/// include = ["users", "orders"]
/// exclude = ["audit_log"]
/// schema_only = ["sessions"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DumpRules {
    #[serde(default)]
    pub tables: TableRules,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TableRules {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub schema_only: Vec<String>,
}

impl DumpRules {
    /// Append another set of rules; duplicates are dropped
    pub fn merge(&mut self, other: DumpRules) {
        extend_unique(&mut self.tables.include, other.tables.include);
        extend_unique(&mut self.tables.exclude, other.tables.exclude);
        extend_unique(&mut self.tables.schema_only, other.tables.schema_only);
    }

    pub fn into_filter(self) -> Result<TableFilter> {
        let TableRules {
            include,
            exclude,
            schema_only,
        } = self.tables;

        let filter = TableFilter::new(Some(include), Some(exclude))
            .context("Invalid table rules")?
            .with_schema_only(schema_only)
            .context("Invalid schema-only table list")?;
        Ok(filter)
    }
}

fn extend_unique(list: &mut Vec<String>, extra: Vec<String>) {
    for item in extra {
        if !list.iter().any(|t| t.eq_ignore_ascii_case(&item)) {
            list.push(item);
        }
    }
}

pub fn parse_dump_rules(contents: &str) -> Result<DumpRules> {
    toml::from_str(contents).context("Failed to parse dump rules")
}

/// Load dump rules from a TOML file
pub fn load_dump_rules_from_file(path: impl AsRef<Path>) -> Result<DumpRules> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let rules = parse_dump_rules(&contents)
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    tracing::debug!(
        "Loaded dump rules from {}: {} included, {} excluded, {} schema-only",
        path.display(),
        rules.tables.include.len(),
        rules.tables.exclude.len(),
        rules.tables.schema_only.len()
    );

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_rules() {
        let rules = parse_dump_rules(
            r#"
            [tables]
            include = ["users", "orders"]
            exclude = ["audit_log"]
            schema_only = ["sessions"]
            "#,
        )
        .unwrap();

        assert_eq!(rules.tables.include, vec!["users", "orders"]);
        assert_eq!(rules.tables.exclude, vec!["audit_log"]);
        assert_eq!(rules.tables.schema_only, vec!["sessions"]);
    }

    #[test]
    fn test_parse_empty_rules() {
        assert_eq!(parse_dump_rules("").unwrap(), DumpRules::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(parse_dump_rules("[tables]\ninclud = [\"x\"]").is_err());
    }

    #[test]
    fn test_merge_deduplicates() {
        let mut rules = parse_dump_rules("[tables]\nexclude = [\"a\"]").unwrap();
        rules.merge(DumpRules {
            tables: TableRules {
                include: vec![],
                exclude: vec!["A".to_string(), "b".to_string()],
                schema_only: vec!["c".to_string()],
            },
        });

        assert_eq!(rules.tables.exclude, vec!["a", "b"]);
        assert_eq!(rules.tables.schema_only, vec!["c"]);

        let filter = rules.into_filter().unwrap();
        assert!(!filter.should_dump_table("b"));
        assert!(filter.is_schema_only("c"));
    }

    #[test]
    fn test_conflicting_rules_fail_filter() {
        let rules = parse_dump_rules("[tables]\ninclude = [\"a\"]\nexclude = [\"a\"]").unwrap();
        assert!(rules.into_filter().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tables]\nschema_only = [\"sessions\"]").unwrap();

        let rules = load_dump_rules_from_file(file.path()).unwrap();
        assert_eq!(rules.tables.schema_only, vec!["sessions"]);

        assert!(load_dump_rules_from_file("/nonexistent/dump.toml").is_err());
    }
}

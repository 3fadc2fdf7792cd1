// ABOUTME: Table selection for dumps
// ABOUTME: Decides which tables are dumped and which are dumped schema-only

use crate::error::{Error, Result};

/// Which tables a dump covers.
///
/// SQLite compares identifiers case-insensitively for ASCII, so matching here
/// does too. Exclusion always wins over inclusion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    include_tables: Vec<String>,
    exclude_tables: Vec<String>,
    schema_only_tables: Vec<String>,
}

impl TableFilter {
    /// Filter that dumps every table with its data
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a filter from include/exclude lists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a table is both included and excluded, or
    /// if a table name is blank.
    pub fn new(
        include_tables: Option<Vec<String>>,
        exclude_tables: Option<Vec<String>>,
    ) -> Result<Self> {
        let include_tables = normalize(include_tables.unwrap_or_default())?;
        let exclude_tables = normalize(exclude_tables.unwrap_or_default())?;

        if let Some(conflict) = include_tables
            .iter()
            .find(|name| contains(&exclude_tables, name))
        {
            return Err(Error::Config(format!(
                "Table '{}' is both included and excluded",
                conflict
            )));
        }

        Ok(Self {
            include_tables,
            exclude_tables,
            schema_only_tables: Vec::new(),
        })
    }

    /// Dump these tables' schema but none of their rows
    pub fn with_schema_only(mut self, tables: Vec<String>) -> Result<Self> {
        self.schema_only_tables = normalize(tables)?;
        Ok(self)
    }

    pub fn should_dump_table(&self, table: &str) -> bool {
        if contains(&self.exclude_tables, table) {
            return false;
        }
        self.include_tables.is_empty() || contains(&self.include_tables, table)
    }

    pub fn is_schema_only(&self, table: &str) -> bool {
        contains(&self.schema_only_tables, table)
    }

    pub fn is_empty(&self) -> bool {
        self.include_tables.is_empty()
            && self.exclude_tables.is_empty()
            && self.schema_only_tables.is_empty()
    }
}

fn normalize(tables: Vec<String>) -> Result<Vec<String>> {
    tables
        .into_iter()
        .map(|t| {
            let trimmed = t.trim();
            if trimmed.is_empty() {
                Err(Error::Config("Table name cannot be empty".to_string()))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

fn contains(list: &[String], table: &str) -> bool {
    list.iter().any(|t| t.eq_ignore_ascii_case(table))
}

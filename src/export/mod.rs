// ABOUTME: Dump engine module
// ABOUTME: Handles catalog introspection, literal encoding, dump assembly and checksums

pub mod catalog;
pub mod checksum;
pub mod dump;
pub mod literal;

pub use catalog::{insertable_columns, list_tables, table_schema, SchemaObject, TableSchema};
pub use checksum::{compare_databases, table_checksum, ChecksumResult, TableChecksum};
pub use dump::{dump_database, DumpOptions, DumpSummary, PREAMBLE};
pub use literal::{
    format_identifier, format_literal, format_row, format_sql_text, format_text_literal,
};

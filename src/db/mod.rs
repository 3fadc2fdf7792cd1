// ABOUTME: Database capability consumed by the dump engine
// ABOUTME: Exports the statement stream types, cell values and the SQLite adapter

pub mod sqlite;
pub mod stream;
pub mod value;

pub use sqlite::SqliteDatabase;
pub use stream::{
    statement_channel, AsyncStatementResult, Row, RowResult, RowSender, RowStream,
    StatementResult, StatementSender,
};
pub use value::Value;

use crate::error::Result;

/// Anything that can execute SQL and stream back its results.
///
/// Submission may fail synchronously (the statement could not be handed to
/// the backend at all); everything else is reported through the returned
/// [`AsyncStatementResult`].
pub trait Database {
    fn execute_statements(&self, sql: &str) -> Result<AsyncStatementResult>;
}

impl<D: Database + ?Sized> Database for &D {
    fn execute_statements(&self, sql: &str) -> Result<AsyncStatementResult> {
        (**self).execute_statements(sql)
    }
}

/// Submit `sql` and wait for its outcome
pub async fn query(db: &(impl Database + ?Sized), sql: &str) -> Result<StatementResult> {
    tracing::debug!("Executing: {}", sql);
    db.execute_statements(sql)?.wait().await
}

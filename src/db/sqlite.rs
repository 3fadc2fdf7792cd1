// ABOUTME: SQLite/libSQL adapter for the Database capability
// ABOUTME: Runs each statement on a blocking thread and streams rows back over a channel

use crate::db::stream::{statement_channel, AsyncStatementResult, StatementSender};
use crate::db::{Database, Row, Value};
use crate::error::{Error, Result};
use crate::utils;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A local SQLite database.
///
/// The connection is shared behind a mutex; a statement holds the lock until
/// its row stream is drained or dropped, so statements never interleave.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    /// Open an existing database file read-only
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        utils::validate_database_path(path)?;

        tracing::debug!("Opening SQLite database {}", path.display());
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(Self::from_connection(conn))
    }

    /// Open a fresh, empty in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a batch of statements to completion, discarding any rows.
    ///
    /// Used to load replayed dumps and fixtures; not part of the streaming path.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::Stream("connection lock poisoned".to_string()))?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

impl Database for SqliteDatabase {
    fn execute_statements(&self, sql: &str) -> Result<AsyncStatementResult> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::NoRuntime(e.to_string()))?;

        let (sender, pending) = statement_channel();
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();

        handle.spawn_blocking(move || run_statement(&conn, &sql, sender));

        Ok(pending)
    }
}

fn run_statement(conn: &Mutex<Connection>, sql: &str, sender: StatementSender) {
    let conn = match conn.lock() {
        Ok(conn) => conn,
        Err(_) => {
            sender.fail(Error::Stream("connection lock poisoned".to_string()));
            return;
        }
    };

    let mut stmt = match conn.prepare(sql) {
        Ok(stmt) => stmt,
        Err(e) => {
            sender.fail(e.into());
            return;
        }
    };

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let column_count = columns.len();

    let Some(rows_tx) = sender.start(columns) else {
        return;
    };

    // From here on every SQLite fault belongs to the row stream
    let mut rows = match stmt.query([]) {
        Ok(rows) => rows,
        Err(e) => {
            rows_tx.blocking_send(Err(Error::RowRead(e)));
            return;
        }
    };

    loop {
        let item = match rows.next() {
            Ok(Some(row)) => read_row(row, column_count),
            Ok(None) => break,
            Err(e) => Err(Error::RowRead(e)),
        };

        let failed = item.is_err();
        if !rows_tx.blocking_send(item) || failed {
            break;
        }
    }
}

fn read_row(row: &rusqlite::Row<'_>, column_count: usize) -> Result<Row> {
    (0..column_count)
        .map(|idx| Value::try_from(row.get_ref(idx).map_err(Error::RowRead)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query;

    fn fixture() -> SqliteDatabase {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE t (i INTEGER, r REAL, s TEXT, b BLOB, n);
             INSERT INTO t VALUES (1, 2.5, 'x', X'00ff', NULL);
             INSERT INTO t VALUES (2, -0.25, 'y''z', X'', NULL);",
        )
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_streams_typed_rows() {
        let db = fixture();
        let result = query(&db, "SELECT * FROM t ORDER BY i").await.unwrap();
        assert_eq!(result.columns(), ["i", "r", "s", "b", "n"]);

        let rows = result.collect_rows().await.unwrap();
        assert_eq!(
            rows,
            vec![
                vec![
                    Value::Integer(1),
                    Value::Real(2.5),
                    Value::Text("x".to_string()),
                    Value::Blob(vec![0x00, 0xff]),
                    Value::Null,
                ],
                vec![
                    Value::Integer(2),
                    Value::Real(-0.25),
                    Value::Text("y'z".to_string()),
                    Value::Blob(vec![]),
                    Value::Null,
                ],
            ]
        );
    }

    #[tokio::test]
    async fn test_prepare_error_is_top_level() {
        let db = fixture();
        let err = query(&db, "SELECTT 1").await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[tokio::test]
    async fn test_statement_after_dropped_stream() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE big (n INTEGER);
             WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 2000)
             INSERT INTO big SELECT x FROM c;",
        )
        .unwrap();

        let mut result = query(&db, "SELECT n FROM big").await.unwrap();
        assert!(result.rows().next_row().await.unwrap().is_ok());
        drop(result);

        // The abandoned producer must release the connection
        let rows = query(&db, "SELECT count(*) FROM big")
            .await
            .unwrap()
            .collect_rows()
            .await
            .unwrap();
        assert_eq!(rows, vec![vec![Value::Integer(2000)]]);
    }

    #[tokio::test]
    async fn test_step_error_is_row_stream_error() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE t (n INTEGER);
             INSERT INTO t VALUES (1), (-9223372036854775807 - 1);",
        )
        .unwrap();

        // abs() of the smallest integer overflows on the second step
        let mut result = query(&db, "SELECT abs(n) FROM t ORDER BY rowid")
            .await
            .unwrap();
        let rows = result.rows();

        let first = rows.next_row().await.unwrap().unwrap();
        assert_eq!(first, vec![Value::Integer(1)]);

        let err = rows.next_row().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::RowRead(_)), "{:?}", err);
        assert_eq!(err.kind(), crate::error::ErrorKind::RowStream);
        assert!(rows.next_row().await.is_none());
    }

    #[test]
    fn test_submit_without_runtime_fails() {
        let db = SqliteDatabase::open_in_memory().unwrap();
        let err = db.execute_statements("SELECT 1").unwrap_err();
        assert!(matches!(err, Error::NoRuntime(_)));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteDatabase::open(dir.path().join("missing.db"));
        assert!(matches!(result, Err(Error::InvalidPath(_))));
    }
}

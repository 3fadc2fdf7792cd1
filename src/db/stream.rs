// ABOUTME: Asynchronous statement results and bounded row streams
// ABOUTME: Lets callers consume arbitrarily large results without buffering them

use crate::db::Value;
use crate::error::{Error, Result};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

/// Maximum number of rows a producer may run ahead of its consumer
pub const ROW_BUFFER: usize = 256;

/// One result row, ordered like the statement's projected columns
pub type Row = Vec<Value>;

/// A row, or the fault that ended the stream while producing it
pub type RowResult = Result<Row>;

/// Create the producer and consumer halves for one submitted statement
pub fn statement_channel() -> (StatementSender, AsyncStatementResult) {
    let (tx, rx) = oneshot::channel();
    (StatementSender { tx }, AsyncStatementResult { rx })
}

/// A submitted statement whose outcome has not been observed yet
#[derive(Debug)]
pub struct AsyncStatementResult {
    rx: oneshot::Receiver<Result<StatementResult>>,
}

impl AsyncStatementResult {
    /// Wait until the statement either starts producing rows or fails outright
    pub async fn wait(self) -> Result<StatementResult> {
        self.rx
            .await
            .map_err(|_| Error::Stream("statement ended before producing a result".to_string()))?
    }
}

/// Producer half of [`AsyncStatementResult`]; fires exactly once
#[derive(Debug)]
pub struct StatementSender {
    tx: oneshot::Sender<Result<StatementResult>>,
}

impl StatementSender {
    /// Report that the statement failed before producing any rows
    pub fn fail(self, err: Error) {
        let _ = self.tx.send(Err(err));
    }

    /// Hand the consumer a row stream for `columns`.
    ///
    /// Returns `None` when the consumer has already gone away.
    pub fn start(self, columns: Vec<String>) -> Option<RowSender> {
        let (tx, rx) = mpsc::channel(ROW_BUFFER);
        let rows = RowStream {
            rx,
            arity: columns.len(),
            finished: false,
        };
        self.tx
            .send(Ok(StatementResult { columns, rows }))
            .ok()
            .map(|_| RowSender { tx })
    }
}

/// Producer half of a [`RowStream`]. Dropping it closes the stream.
#[derive(Debug, Clone)]
pub struct RowSender {
    tx: mpsc::Sender<RowResult>,
}

impl RowSender {
    /// Send from a blocking thread. Returns false once the consumer is gone.
    pub fn blocking_send(&self, row: RowResult) -> bool {
        self.tx.blocking_send(row).is_ok()
    }

    /// Send from async code. Returns false once the consumer is gone.
    pub async fn send(&self, row: RowResult) -> bool {
        self.tx.send(row).await.is_ok()
    }
}

/// The synchronous outcome of a statement: its columns and its rows
#[derive(Debug)]
pub struct StatementResult {
    columns: Vec<String>,
    rows: RowStream,
}

impl StatementResult {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&mut self) -> &mut RowStream {
        &mut self.rows
    }

    pub fn into_rows(self) -> RowStream {
        self.rows
    }

    /// Drain every row into memory. Only meant for small catalog queries.
    pub async fn collect_rows(self) -> Result<Vec<Row>> {
        let mut rows = self.rows;
        let mut collected = Vec::new();
        while let Some(row) = rows.next_row().await {
            collected.push(row?);
        }
        Ok(collected)
    }
}

/// Ordered, finite, non-restartable sequence of rows.
///
/// The stream ends when the producer drops its sender. After the first error
/// it yields nothing more, even if the producer keeps sending.
#[derive(Debug)]
pub struct RowStream {
    rx: mpsc::Receiver<RowResult>,
    arity: usize,
    finished: bool,
}

impl RowStream {
    pub async fn next_row(&mut self) -> Option<RowResult> {
        futures::future::poll_fn(|cx| self.poll_row(cx)).await
    }

    fn poll_row(&mut self, cx: &mut Context<'_>) -> Poll<Option<RowResult>> {
        if self.finished {
            return Poll::Ready(None);
        }

        let item = match self.rx.poll_recv(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(item) => item,
        };

        let item = match item {
            Some(Ok(row)) if row.len() != self.arity => Some(Err(Error::Stream(format!(
                "row has {} columns, statement projects {}",
                row.len(),
                self.arity
            )))),
            other => other,
        };

        match &item {
            None => self.finished = true,
            Some(Err(_)) => {
                self.finished = true;
                self.rx.close();
            }
            Some(Ok(_)) => {}
        }

        Poll::Ready(item)
    }
}

impl Stream for RowStream {
    type Item = RowResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_row(cx)
    }
}

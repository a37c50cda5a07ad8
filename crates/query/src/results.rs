//! The consumer half of a running query.

use crate::apply::Apply;
use caskds_core::{Entry, Error, Query, QueryResult, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// A lazy, single-pass stream of query results.
///
/// Records are produced in the background while the caller consumes them.
/// Dropping the stream cancels the producer; [`close`](Self::close) also
/// waits for it to exit.
pub struct QueryResults {
    query: Query,
    rx: mpsc::Receiver<QueryResult>,
    token: CancellationToken,
    producer: Option<JoinHandle<()>>,
    stage: Apply,
}

impl QueryResults {
    pub(crate) fn new(
        query: Query,
        rx: mpsc::Receiver<QueryResult>,
        token: CancellationToken,
        producer: Option<JoinHandle<()>>,
    ) -> Self {
        let stage = Apply::new(&query);
        Self {
            query,
            rx,
            token,
            producer,
            stage,
        }
    }

    /// The query these results were produced for.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Whether the stream has been cancelled or has finished.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Next result, or `None` when the stream is over.
    ///
    /// An `Err` record is always the last one. Nothing is returned after
    /// [`cancel`](Self::cancel).
    pub async fn next(&mut self) -> Option<QueryResult> {
        if self.token.is_cancelled() {
            return None;
        }
        let record = self.stage.next(&mut self.rx).await;
        if record.is_none() {
            // Stops a producer still scanning past the limit.
            self.token.cancel();
        }
        record
    }

    /// Collect every remaining entry, stopping at the first error.
    pub async fn rest(mut self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        while let Some(record) = self.next().await {
            entries.push(record?);
        }
        Ok(entries)
    }

    /// Ask the producer to stop. Does not wait.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait for the producer to exit.
    pub async fn close(mut self) -> Result<()> {
        self.token.cancel();
        // Unsent records would otherwise keep the channel half alive.
        self.rx.close();

        if let Some(producer) = self.producer.take() {
            if let Err(e) = producer.await {
                error!("Query producer panicked: {}", e);
                return Err(Error::Internal(format!("query producer failed: {}", e)));
            }
        }
        debug!("Query closed: {}", self.query);
        Ok(())
    }
}

impl Drop for QueryResults {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for QueryResults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResults")
            .field("query", &self.query)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

//! Query execution.
//!
//! `execute` validates the query and spawns a producer on Tokio's blocking
//! pool. The producer walks the engine's prefix scan, turns each key into an
//! [`Entry`] and pushes it into a bounded channel that the returned
//! [`QueryResults`] drains.
//!
//! Delivery races the send against the cancellation token, so a producer
//! parked on a full channel wakes as soon as the consumer cancels or drops
//! its stream.

use crate::results::QueryResults;
use caskds_core::{codec, Entry, Error, Query, QueryResult, Result};
use caskds_storage::{KeyValueEngine, ScanOutcome, Visit};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default number of records buffered between producer and consumer.
pub const DEFAULT_BUFFER_SIZE: usize = 16;

/// Runs queries against a shared engine.
pub struct QueryExecutor<E: KeyValueEngine> {
    engine: Arc<E>,
    buffer_size: usize,
}

impl<E: KeyValueEngine> Clone for QueryExecutor<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            buffer_size: self.buffer_size,
        }
    }
}

impl<E: KeyValueEngine> QueryExecutor<E> {
    /// Create an executor with the default channel capacity.
    pub fn new(engine: Arc<E>) -> Self {
        Self::with_buffer_size(engine, DEFAULT_BUFFER_SIZE)
    }

    /// Create an executor whose channels hold `buffer_size` records.
    ///
    /// A size of 0 is raised to 1.
    pub fn with_buffer_size(engine: Arc<E>, buffer_size: usize) -> Self {
        Self {
            engine,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Channel capacity per query.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The engine queries run against.
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Start executing `query`.
    ///
    /// Fails immediately with [`Error::InvalidQuery`] for a malformed query
    /// and [`Error::NoRuntime`] outside a Tokio runtime. Scan failures are
    /// delivered later as a terminal `Err` record in the stream.
    ///
    /// Each open [`QueryResults`] occupies one thread of Tokio's blocking
    /// pool until it is drained, cancelled or dropped. Holding more open
    /// streams than the pool allows (512 threads by default) leaves new
    /// queries queued behind them.
    pub fn execute(&self, query: Query) -> Result<QueryResults> {
        query.validate(self.engine.max_key_size())?;
        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let (tx, rx) = mpsc::channel(self.buffer_size);
        let token = CancellationToken::new();
        let cap = query.scan_cap();

        if cap == Some(0) {
            debug!("Query limit is zero, skipping scan: {}", query);
            drop(tx);
            return Ok(QueryResults::new(query, rx, token, None));
        }

        let producer = Producer {
            engine: Arc::clone(&self.engine),
            prefix: query.scan_prefix(),
            resolve_values: query.resolves_values(),
            keys_only: query.keys_only,
            cap,
            tx,
            token: token.clone(),
            handle: handle.clone(),
        };

        debug!("Starting query scan: {}", query);
        let join = handle.spawn_blocking(move || producer.run());
        Ok(QueryResults::new(query, rx, token, Some(join)))
    }
}

/// Background half of a query.
struct Producer<E> {
    engine: Arc<E>,
    prefix: Vec<u8>,
    resolve_values: bool,
    keys_only: bool,
    cap: Option<usize>,
    tx: mpsc::Sender<QueryResult>,
    token: CancellationToken,
    handle: Handle,
}

impl<E: KeyValueEngine> Producer<E> {
    fn run(self) {
        let mut delivered = 0usize;

        let outcome = self.engine.scan_prefix(&self.prefix, &mut |raw| {
            let entry = match self.resolve(raw) {
                Ok(Some(entry)) => entry,
                Ok(None) => return Visit::Continue,
                Err(err) => return Visit::Fail(err),
            };

            if !self.deliver(Ok(entry)) {
                return Visit::Stop;
            }
            delivered += 1;

            match self.cap {
                Some(cap) if delivered >= cap => Visit::LimitReached,
                _ => Visit::Continue,
            }
        });

        match outcome {
            ScanOutcome::Completed => debug!("Query scan completed after {} records", delivered),
            ScanOutcome::LimitReached => debug!("Query scan hit its limit of {} records", delivered),
            ScanOutcome::Stopped => debug!("Query scan stopped by consumer after {} records", delivered),
            ScanOutcome::Failed(err) => {
                warn!("Query scan failed after {} records: {}", delivered, err);
                self.deliver(Err(Error::Storage(err)));
            }
        }
    }

    /// Build the entry for a visited key.
    ///
    /// `Ok(None)` means the key vanished between enumeration and lookup.
    fn resolve(&self, raw: &[u8]) -> caskds_storage::Result<Option<Entry>> {
        let key = codec::decode_key(raw);
        if !self.resolve_values {
            return Ok(Some(Entry::key_only(key)));
        }

        match self.engine.get(raw) {
            Ok(value) => {
                let size = value.len();
                let value = if self.keys_only { None } else { Some(value) };
                Ok(Some(Entry { key, value, size }))
            }
            Err(err) if err.is_not_found() => {
                trace!("Key {} deleted during query, skipping", key);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Send one record, giving up if the consumer cancels first.
    ///
    /// Returns false when the record was not delivered.
    fn deliver(&self, record: QueryResult) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.handle.block_on(async {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => false,
                sent = self.tx.send(record) => sent.is_ok(),
            }
        })
    }
}

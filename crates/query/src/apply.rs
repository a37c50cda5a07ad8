//! Query application stage.
//!
//! Sits between the raw producer channel and the caller. Filters and
//! offset/limit are applied as records stream through; any order forces the
//! whole stream to be read and sorted before the first record is returned.

use caskds_core::{compare_entries, Entry, Filter, Order, Query, QueryResult};
use std::collections::VecDeque;
use tokio::sync::mpsc;

pub(crate) struct Apply {
    filters: Vec<Filter>,
    orders: Vec<Order>,
    skip: usize,
    remaining: Option<usize>,
    sorted: Option<VecDeque<QueryResult>>,
    done: bool,
}

impl Apply {
    pub(crate) fn new(query: &Query) -> Self {
        Apply {
            filters: query.filters.clone(),
            orders: query.orders.clone(),
            skip: query.offset,
            remaining: query.limit,
            sorted: None,
            done: false,
        }
    }

    fn accepts(&self, entry: &Entry) -> bool {
        self.filters.iter().all(|f| f.matches(entry))
    }

    /// Next record after filtering, ordering, offset and limit.
    ///
    /// Returns `None` once the stream is exhausted, the limit is met, or an
    /// error record has been returned.
    pub(crate) async fn next(&mut self, rx: &mut mpsc::Receiver<QueryResult>) -> Option<QueryResult> {
        if self.done || self.remaining == Some(0) {
            self.done = true;
            return None;
        }

        loop {
            let record = if self.orders.is_empty() {
                let record = rx.recv().await;
                match record {
                    Some(Ok(entry)) if !self.accepts(&entry) => continue,
                    other => other,
                }
            } else {
                if self.sorted.is_none() {
                    self.sorted = Some(self.materialize(rx).await);
                }
                self.sorted.as_mut().and_then(VecDeque::pop_front)
            };

            match record {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                Some(Ok(entry)) => {
                    if self.skip > 0 {
                        self.skip -= 1;
                        continue;
                    }
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some(Ok(entry));
                }
            }
        }
    }

    /// Drain the channel, keeping entries that pass the filters, and sort
    /// them. An error record replaces the whole result.
    async fn materialize(&self, rx: &mut mpsc::Receiver<QueryResult>) -> VecDeque<QueryResult> {
        let mut entries = Vec::new();
        while let Some(record) = rx.recv().await {
            match record {
                Ok(entry) if self.accepts(&entry) => entries.push(entry),
                Ok(_) => {}
                Err(err) => return VecDeque::from([Err(err)]),
            }
        }

        entries.sort_by(|a, b| compare_entries(&self.orders, a, b));
        entries.into_iter().map(Ok).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caskds_core::{CompareOp, Error, Key};

    fn entry(key: &str, value: &str) -> Entry {
        Entry {
            key: Key::new(key),
            value: Some(value.as_bytes().to_vec()),
            size: value.len(),
        }
    }

    async fn run(query: &Query, records: Vec<QueryResult>) -> Vec<QueryResult> {
        let (tx, mut rx) = mpsc::channel(records.len().max(1));
        for record in records {
            tx.send(record).await.unwrap();
        }
        drop(tx);

        let mut apply = Apply::new(query);
        let mut out = Vec::new();
        while let Some(record) = apply.next(&mut rx).await {
            out.push(record);
        }
        out
    }

    fn keys(records: &[QueryResult]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.as_ref().unwrap().key.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_passthrough() {
        let records = vec![Ok(entry("/a", "1")), Ok(entry("/b", "2"))];
        let out = run(&Query::new(), records).await;
        assert_eq!(keys(&out), vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn test_offset_then_limit() {
        let records = (0..5).map(|i| Ok(entry(&format!("/k{}", i), "v"))).collect();
        let out = run(&Query::new().offset(1).limit(2), records).await;
        assert_eq!(keys(&out), vec!["/k1", "/k2"]);
    }

    #[tokio::test]
    async fn test_limit_zero_reads_nothing() {
        let records = vec![Ok(entry("/a", "1"))];
        assert!(run(&Query::new().limit(0), records).await.is_empty());
    }

    #[tokio::test]
    async fn test_filter_before_offset() {
        let records = vec![
            Ok(entry("/a", "x")),
            Ok(entry("/b", "y")),
            Ok(entry("/c", "x")),
            Ok(entry("/d", "x")),
        ];
        let query = Query::new()
            .filter(Filter::ValueCompare {
                op: CompareOp::Equal,
                value: b"x".to_vec(),
            })
            .offset(1);
        let out = run(&query, records).await;
        assert_eq!(keys(&out), vec!["/c", "/d"]);
    }

    #[tokio::test]
    async fn test_order_sorts_full_stream() {
        let records = vec![
            Ok(entry("/a", "2")),
            Ok(entry("/b", "3")),
            Ok(entry("/c", "1")),
        ];
        let query = Query::new().order(Order::ByValueDescending).limit(2);
        let out = run(&query, records).await;
        assert_eq!(keys(&out), vec!["/b", "/a"]);
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let records = vec![
            Ok(entry("/a", "1")),
            Err(Error::Internal("boom".into())),
        ];
        let out = run(&Query::new(), records).await;
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(out[1].is_err());
    }

    #[tokio::test]
    async fn test_error_during_sort_replaces_results() {
        let records = vec![
            Ok(entry("/a", "1")),
            Err(Error::Internal("boom".into())),
        ];
        let out = run(&Query::new().order(Order::ByKey), records).await;
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn test_offset_does_not_swallow_error() {
        let records = vec![Err(Error::Internal("boom".into()))];
        let out = run(&Query::new().offset(3), records).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].is_err());
    }
}

//! Chunked prefix enumeration over ordered maps.
//!
//! Both engines keep their index in a `BTreeMap` behind a lock. A scan copies
//! at most `chunk_size` keys out of the map, drops the lock, and runs the
//! visitor over the copy; the next chunk resumes strictly after the last key
//! handed out. Writers are never blocked behind a slow visitor, and a scan
//! never holds more than one chunk of keys in memory.

use crate::engine::{ScanOutcome, Visit};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Copy up to `limit` keys starting with `prefix` and strictly greater than
/// `after` (or starting at `prefix` when `after` is `None`).
pub(crate) fn prefix_chunk<V>(
    map: &BTreeMap<Vec<u8>, V>,
    prefix: &[u8],
    after: Option<&[u8]>,
    limit: usize,
) -> Vec<Vec<u8>> {
    let start = match after {
        Some(key) => Bound::Excluded(key.to_vec()),
        None => Bound::Included(prefix.to_vec()),
    };
    map.range((start, Bound::Unbounded))
        .take_while(|(key, _)| key.starts_with(prefix))
        .take(limit.max(1))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Drive `visit` over chunks produced by `next_chunk` until the keys run
/// out or the visitor ends the scan.
pub(crate) fn run_chunked<F>(mut next_chunk: F, visit: &mut dyn FnMut(&[u8]) -> Visit) -> ScanOutcome
where
    F: FnMut(Option<&[u8]>) -> Vec<Vec<u8>>,
{
    let mut last: Option<Vec<u8>> = None;
    loop {
        let chunk = next_chunk(last.as_deref());
        if chunk.is_empty() {
            return ScanOutcome::Completed;
        }
        for key in &chunk {
            match visit(key) {
                Visit::Continue => {}
                Visit::Stop => return ScanOutcome::Stopped,
                Visit::LimitReached => return ScanOutcome::LimitReached,
                Visit::Fail(err) => return ScanOutcome::Failed(err),
            }
        }
        last = chunk.into_iter().last();
    }
}

//! Conversion between datastore keys/values and raw engine bytes.
//!
//! Keys are stored as their normalized UTF-8 path. Values are stored
//! unchanged.

use crate::key::Key;
use tracing::warn;

/// Engine bytes for `key`.
pub fn encode_key(key: &Key) -> &[u8] {
    key.as_bytes()
}

/// Rebuild a key from engine bytes.
///
/// Keys written through the datastore are always valid UTF-8. Bytes written
/// by other means are decoded lossily so a scan never fails on them.
pub fn decode_key(raw: &[u8]) -> Key {
    match std::str::from_utf8(raw) {
        Ok(s) => Key::from_raw(s.to_owned()),
        Err(_) => {
            warn!("Non UTF-8 key of {} bytes in engine, decoding lossily", raw.len());
            Key::from_raw(String::from_utf8_lossy(raw).into_owned())
        }
    }
}

/// Raw scan prefix matching every key strictly below `prefix`.
///
/// The root key scans everything. Any other key `/a` scans `/a/` so that
/// `/ab` is not a match.
pub fn scan_prefix(prefix: &Key) -> Vec<u8> {
    if prefix.is_root() {
        return Vec::new();
    }
    let mut raw = Vec::with_capacity(prefix.as_bytes().len() + 1);
    raw.extend_from_slice(prefix.as_bytes());
    raw.push(b'/');
    raw
}

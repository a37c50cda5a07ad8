//! Namespaced datastore keys.
//!
//! A key is a `/`-separated path such as `/users/42/profile`. Keys are
//! normalized on construction:
//!
//! - a leading `/` is always present
//! - repeated and trailing separators are dropped
//! - `.` segments are removed and `..` pops the previous segment
//!
//! so `Key::new("users//42/")` and `Key::new("/users/42")` are equal. The
//! empty path is the root key `/`.
//!
//! Keys order by their bytes, which is the order both engines enumerate in.

use serde::{Deserialize, Serialize};
use std::fmt;

const SEPARATOR: char = '/';

/// A normalized, immutable key path.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Build a key from a path, normalizing it.
    pub fn new(path: impl AsRef<str>) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in path.as_ref().split(SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }

        let mut out = String::with_capacity(path.as_ref().len() + 1);
        for segment in &segments {
            out.push(SEPARATOR);
            out.push_str(segment);
        }
        if out.is_empty() {
            out.push(SEPARATOR);
        }
        Key(out)
    }

    /// Wrap a string that is already in normalized form.
    ///
    /// Used for keys read back from the engine, which were normalized when
    /// they were written.
    pub fn from_raw(raw: String) -> Self {
        Key(raw)
    }

    /// The root key `/`.
    pub fn root() -> Self {
        Key(SEPARATOR.to_string())
    }

    /// Whether this is the root key.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key as bytes, exactly as stored in the engine.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Path segments, outermost first. The root key has none.
    pub fn namespaces(&self) -> Vec<&str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
    }

    /// Last path segment (empty for the root key).
    pub fn name(&self) -> &str {
        match self.0.rfind(SEPARATOR) {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The enclosing key. The root is its own parent.
    pub fn parent(&self) -> Key {
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Key::root(),
            Some(idx) => Key(self.0[..idx].to_string()),
        }
    }

    /// Append `child`'s segments below this key.
    pub fn child(&self, child: impl AsRef<str>) -> Key {
        Key::new(format!("{}{}{}", self.0, SEPARATOR, child.as_ref()))
    }

    /// Whether `other` lies strictly below this key.
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == SEPARATOR as u8
    }

    /// Whether this key lies strictly below `other`.
    pub fn is_descendant_of(&self, other: &Key) -> bool {
        other.is_ancestor_of(self)
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::root()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl From<&str> for Key {
    fn from(path: &str) -> Self {
        Key::new(path)
    }
}

impl From<String> for Key {
    fn from(path: String) -> Self {
        Key::new(path)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

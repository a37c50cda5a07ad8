//! Query descriptions and the entries they produce.
//!
//! A [`Query`] names a key prefix plus optional post-processing: filters,
//! orders, an offset and a limit. Execution lives in `caskds-query`; this
//! module only describes queries and knows how to evaluate filters and
//! orders against a single [`Entry`].

use crate::codec;
use crate::error::{Error, Result};
use crate::key::Key;
use std::cmp::Ordering;
use std::fmt;

/// One stored entry returned by a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Stored key
    pub key: Key,
    /// Stored value, `None` in keys-only mode
    pub value: Option<Vec<u8>>,
    /// Value length in bytes, 0 when the value was not resolved
    pub size: usize,
}

impl Entry {
    /// Entry carrying only a key.
    pub fn key_only(key: Key) -> Self {
        Entry {
            key,
            value: None,
            size: 0,
        }
    }

    /// Value bytes, or an empty slice when the value was not resolved.
    pub fn value_bytes(&self) -> &[u8] {
        self.value.as_deref().unwrap_or_default()
    }
}

/// An element of a query result stream.
pub type QueryResult = Result<Entry>;

/// Comparison used by key and value filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
}

impl CompareOp {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Equal => ord == Ordering::Equal,
            CompareOp::NotEqual => ord != Ordering::Equal,
            CompareOp::GreaterThan => ord == Ordering::Greater,
            CompareOp::GreaterThanOrEqual => ord != Ordering::Less,
            CompareOp::LessThan => ord == Ordering::Less,
            CompareOp::LessThanOrEqual => ord != Ordering::Greater,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEqual => ">=",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEqual => "<=",
        }
    }
}

/// A predicate an entry must satisfy to be returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Compare the entry's key against a fixed key.
    KeyCompare {
        /// Comparison
        op: CompareOp,
        /// Right-hand side
        key: Key,
    },
    /// Keep entries whose key string starts with the given text.
    KeyPrefix(String),
    /// Compare the entry's value bytes against fixed bytes.
    ValueCompare {
        /// Comparison
        op: CompareOp,
        /// Right-hand side
        value: Vec<u8>,
    },
}

impl Filter {
    /// Whether `entry` passes this filter.
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Filter::KeyCompare { op, key } => op.holds(entry.key.cmp(key)),
            Filter::KeyPrefix(prefix) => entry.key.as_str().starts_with(prefix.as_str()),
            Filter::ValueCompare { op, value } => {
                op.holds(entry.value_bytes().cmp(value.as_slice()))
            }
        }
    }

    /// Whether evaluating this filter needs the entry's value.
    pub fn needs_value(&self) -> bool {
        matches!(self, Filter::ValueCompare { .. })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::KeyCompare { op, key } => write!(f, "KEY {} {}", op.symbol(), key),
            Filter::KeyPrefix(prefix) => write!(f, "PREFIX({})", prefix),
            Filter::ValueCompare { op, value } => {
                write!(f, "VALUE {} {} bytes", op.symbol(), value.len())
            }
        }
    }
}

/// A sort criterion. Multiple orders are applied lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Key, ascending
    ByKey,
    /// Key, descending
    ByKeyDescending,
    /// Value bytes, ascending
    ByValue,
    /// Value bytes, descending
    ByValueDescending,
}

impl Order {
    /// Compare two entries under this order.
    pub fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        match self {
            Order::ByKey => a.key.cmp(&b.key),
            Order::ByKeyDescending => b.key.cmp(&a.key),
            Order::ByValue => a.value_bytes().cmp(b.value_bytes()),
            Order::ByValueDescending => b.value_bytes().cmp(a.value_bytes()),
        }
    }

    /// Whether this order needs entry values.
    pub fn needs_value(&self) -> bool {
        matches!(self, Order::ByValue | Order::ByValueDescending)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Order::ByKey => "KEY",
            Order::ByKeyDescending => "KEY DESC",
            Order::ByValue => "VALUE",
            Order::ByValueDescending => "VALUE DESC",
        };
        f.write_str(s)
    }
}

/// Compare two entries under a list of orders, first difference wins.
pub fn compare_entries(orders: &[Order], a: &Entry, b: &Entry) -> Ordering {
    orders
        .iter()
        .map(|order| order.compare(a, b))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// A declarative query over the datastore.
///
/// # Example
///
/// ```
/// use caskds_core::{Order, Query};
///
/// let query = Query::new()
///     .prefix("users")
///     .order(Order::ByKeyDescending)
///     .limit(10);
/// assert_eq!(query.prefix.as_str(), "/users");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Only keys strictly below this key are returned (root matches all)
    pub prefix: Key,
    /// Applied in order; an entry must pass all of them
    pub filters: Vec<Filter>,
    /// Sort criteria; an empty list keeps enumeration order
    pub orders: Vec<Order>,
    /// Maximum number of entries to return
    pub limit: Option<usize>,
    /// Entries to skip before returning any
    pub offset: usize,
    /// Skip value resolution
    pub keys_only: bool,
    /// Report value sizes even in keys-only mode
    pub returns_sizes: bool,
}

impl Query {
    /// A query matching every key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to keys below `prefix`.
    pub fn prefix(mut self, prefix: impl Into<Key>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Add a filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a sort criterion.
    pub fn order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    /// Cap the number of entries returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` entries.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Return keys without values.
    pub fn keys_only(mut self, keys_only: bool) -> Self {
        self.keys_only = keys_only;
        self
    }

    /// Report value sizes.
    pub fn returns_sizes(mut self, returns_sizes: bool) -> Self {
        self.returns_sizes = returns_sizes;
        self
    }

    /// Whether the executor has to read values for each visited key.
    pub fn resolves_values(&self) -> bool {
        !self.keys_only || self.returns_sizes
    }

    /// Raw prefix handed to the engine scan.
    pub fn scan_prefix(&self) -> Vec<u8> {
        codec::scan_prefix(&self.prefix)
    }

    /// Number of raw records the scan may stop after, if any.
    ///
    /// Only a plain query can be capped at the source: filters drop records
    /// and orders need to see all of them.
    pub fn scan_cap(&self) -> Option<usize> {
        if !self.filters.is_empty() || !self.orders.is_empty() {
            return None;
        }
        self.limit.map(|limit| limit.saturating_add(self.offset))
    }

    /// Check the query can be executed against an engine with the given
    /// maximum key size.
    pub fn validate(&self, max_key_size: usize) -> Result<()> {
        let prefix_len = self.prefix.as_bytes().len();
        if prefix_len > max_key_size {
            return Err(Error::InvalidQuery(format!(
                "prefix is {} bytes, longer than the maximum key size of {}",
                prefix_len, max_key_size
            )));
        }

        if self.keys_only {
            if let Some(order) = self.orders.iter().find(|o| o.needs_value()) {
                return Err(Error::InvalidQuery(format!(
                    "order by {} requires values but the query is keys-only",
                    order
                )));
            }
            if let Some(filter) = self.filters.iter().find(|f| f.needs_value()) {
                return Err(Error::InvalidQuery(format!(
                    "filter {} requires values but the query is keys-only",
                    filter
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selected = match (self.keys_only, self.returns_sizes) {
            (false, _) => "keys,vals",
            (true, true) => "keys,sizes",
            (true, false) => "keys",
        };
        write!(f, "SELECT {} FROM {}", selected, self.prefix)?;
        for filter in &self.filters {
            write!(f, " FILTER [{}]", filter)?;
        }
        if !self.orders.is_empty() {
            let orders: Vec<String> = self.orders.iter().map(ToString::to_string).collect();
            write!(f, " ORDER [{}]", orders.join(", "))?;
        }
        if self.offset > 0 {
            write!(f, " OFFSET {}", self.offset)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        Ok(())
    }
}

//! Ordered range container with point-containment lookup.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A closed interval of keys bound to nothing by itself; the unit the
/// [`RangeIndex`] is keyed on.
///
/// Spans order by position: a span is less than another iff it ends strictly
/// before the other begins. Two spans that touch or overlap compare equal.
/// This order is total only while all stored spans are pairwise disjoint,
/// which the data sources guarantee; it is what turns a point-containment
/// query into a plain tree search with a degenerate `[p, p]` probe.
#[derive(Debug, Clone)]
pub struct Span<K> {
    low: K,
    high: K,
}

impl<K: Ord> Span<K> {
    /// Create a span covering `low..=high`. `low <= high` is the caller's
    /// responsibility; a reversed span makes lookups touching it undefined.
    pub fn new(low: K, high: K) -> Self {
        debug_assert!(low <= high);
        Self { low, high }
    }

    /// Create the degenerate single-point span `[key, key]`.
    pub fn point(key: K) -> Self
    where
        K: Clone,
    {
        Self {
            low: key.clone(),
            high: key,
        }
    }

    /// Lower bound, inclusive.
    pub fn low(&self) -> &K {
        &self.low
    }

    /// Upper bound, inclusive.
    pub fn high(&self) -> &K {
        &self.high
    }

    /// Whether `key` falls inside this span.
    pub fn contains(&self, key: &K) -> bool {
        self.low <= *key && *key <= self.high
    }
}

impl<K: Ord> PartialEq for Span<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord> Eq for Span<K> {}

impl<K: Ord> PartialOrd for Span<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for Span<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Strict < on both sides. A probe span [p, p] therefore compares
        // equal to exactly the stored span whose interval contains p.
        if self.high < other.low {
            Ordering::Less
        } else if other.high < self.low {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

/// An owned copy of one stored range, as returned by [`RangeIndex::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEntry<K, V> {
    pub low: K,
    pub high: K,
    pub value: V,
}

/// Ordered container mapping closed key ranges to values, answering "which
/// range contains this point" in O(log n).
///
/// Built once during table load, then read-only; the backing `BTreeMap` does
/// no rebalancing or caching on reads, so a populated index is safe to share
/// across threads behind an `Arc`.
///
/// Inserted ranges must be pairwise non-overlapping. The container does not
/// guard against overlap; an insert that collides with a stored range
/// replaces that entry's value (keeping the first-stored bounds) and hands
/// the displaced value back, which loaders use to tally violations at build
/// time. Lookups over a violated region answer from whichever bounds
/// survived.
///
/// Exact-key tables reuse the same container with every entry stored as a
/// degenerate `[key, key]` span:
///
/// ```
/// use geolocip::RangeIndex;
///
/// let mut countries = RangeIndex::new();
/// countries.insert_point("FR".to_string(), "France".to_string());
/// assert_eq!(countries.get(&"FR".to_string()).map(String::as_str), Some("France"));
/// ```
#[derive(Debug)]
pub struct RangeIndex<K, V> {
    spans: BTreeMap<Span<K>, V>,
}

impl<K, V> Default for RangeIndex<K, V> {
    fn default() -> Self {
        Self {
            spans: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, V> RangeIndex<K, V> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the range `low..=high` bound to `value`.
    ///
    /// Amortized O(log n), never fails. Returns the displaced value when the
    /// new range compares equal to a stored one, which given the span order
    /// means identical bounds or an overlap; `None` is the well-formed case.
    pub fn insert(&mut self, low: K, high: K, value: V) -> Option<V> {
        self.spans.insert(Span::new(low, high), value)
    }

    /// Insert a degenerate single-point range for exact-key lookup.
    pub fn insert_point(&mut self, key: K, value: V) -> Option<V> {
        self.spans.insert(Span::point(key), value)
    }

    /// Borrow the value of the range containing `point`, if any.
    ///
    /// O(log n). An empty index answers `None`.
    pub fn get(&self, point: &K) -> Option<&V> {
        self.spans.get(&Span::point(point.clone()))
    }

    /// Like [`get`](Self::get), but exposes the matched span as well.
    pub fn get_entry(&self, point: &K) -> Option<(&Span<K>, &V)> {
        self.spans.get_key_value(&Span::point(point.clone()))
    }

    /// Return an owned copy of the range containing `point`, if any.
    ///
    /// Callers get their own data; nothing returned aliases the tree.
    pub fn lookup(&self, point: &K) -> Option<RangeEntry<K, V>>
    where
        V: Clone,
    {
        self.get_entry(point).map(|(span, value)| RangeEntry {
            low: span.low.clone(),
            high: span.high.clone(),
            value: value.clone(),
        })
    }

    /// Number of stored ranges. Diagnostics only.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether the index holds no ranges.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Iterate stored ranges in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&Span<K>, &V)> {
        self.spans.iter()
    }
}

//! Bounded memo of formatted row strings.

use std::collections::{HashMap, VecDeque};

/// Default number of patterns kept in a [`FormattedRowCache`].
pub const DEFAULT_CACHED_PATTERNS: usize = 64;

/// Formatted row strings keyed by pattern id and row index.
///
/// Owned by whichever component formats rows repeatedly. Entries for a
/// pattern must be dropped with [`FormattedRowCache::invalidate`] whenever
/// that pattern changes; the least recently touched pattern is evicted when
/// the capacity is reached.
#[derive(Debug, Clone)]
pub struct FormattedRowCache {
    capacity: usize,
    rows: HashMap<usize, Vec<Option<String>>>,
    recency: VecDeque<usize>,
}

impl Default for FormattedRowCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHED_PATTERNS)
    }
}

impl FormattedRowCache {
    /// Creates a cache holding rows of at most `capacity` patterns.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rows: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    /// Returns the cached row, formatting it with `format` on a miss.
    pub fn get_or_format<F>(&mut self, pattern_id: usize, row: usize, format: F) -> &str
    where
        F: FnOnce() -> String,
    {
        self.touch(pattern_id);
        let rows = self.rows.entry(pattern_id).or_default();
        if rows.len() <= row {
            rows.resize(row + 1, None);
        }
        rows[row].get_or_insert_with(format).as_str()
    }

    /// Drops every row of one pattern.
    pub fn invalidate(&mut self, pattern_id: usize) {
        self.rows.remove(&pattern_id);
        self.recency.retain(|&id| id != pattern_id);
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.recency.clear();
    }

    /// Number of patterns with cached rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn touch(&mut self, pattern_id: usize) {
        if let Some(pos) = self.recency.iter().position(|&id| id == pattern_id) {
            self.recency.remove(pos);
        } else if self.recency.len() >= self.capacity
            && let Some(evicted) = self.recency.pop_front()
        {
            self.rows.remove(&evicted);
        }
        self.recency.push_back(pattern_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_once_until_invalidated() {
        let mut cache = FormattedRowCache::new(4);
        let mut calls = 0;
        for _ in 0..3 {
            let text = cache.get_or_format(1, 5, || {
                calls += 1;
                "row".to_string()
            });
            assert_eq!(text, "row");
        }
        assert_eq!(calls, 1);

        cache.invalidate(1);
        cache.get_or_format(1, 5, || {
            calls += 1;
            "row2".to_string()
        });
        assert_eq!(calls, 2);
    }

    #[test]
    fn evicts_least_recent_pattern() {
        let mut cache = FormattedRowCache::new(2);
        cache.get_or_format(1, 0, || "a".into());
        cache.get_or_format(2, 0, || "b".into());
        cache.get_or_format(1, 1, || "c".into());
        cache.get_or_format(3, 0, || "d".into());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_or_format(1, 0, || "miss".into()), "a");
        assert_eq!(cache.get_or_format(2, 0, || "miss".into()), "miss");
    }
}

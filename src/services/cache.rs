// src/services/cache.rs

//! In-memory rating cache for one run.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::Platform;
use crate::utils::normalize_whitespace;

/// A remembered lookup result; `rating: None` records a confirmed miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub rating: Option<i32>,
    pub fetched_at: DateTime<Utc>,
}

/// Lookup results keyed by platform and normalized title.
///
/// Entries are only ever added; the first result stored for a key is kept.
#[derive(Debug, Default)]
pub struct RatingCache {
    entries: HashMap<(Platform, String), CacheEntry>,
}

impl RatingCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(platform: Platform, title: &str) -> (Platform, String) {
        (platform, normalize_whitespace(title).to_lowercase())
    }

    pub fn get(&self, platform: Platform, title: &str) -> Option<CacheEntry> {
        self.entries.get(&Self::key(platform, title)).copied()
    }

    pub fn contains(&self, platform: Platform, title: &str) -> bool {
        self.entries.contains_key(&Self::key(platform, title))
    }

    /// Store a result unless the key is already present; returns the kept entry.
    pub fn insert(&mut self, platform: Platform, title: &str, rating: Option<i32>) -> CacheEntry {
        *self
            .entries
            .entry(Self::key(platform, title))
            .or_insert(CacheEntry {
                rating,
                fetched_at: Utc::now(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalizes_case_and_whitespace() {
        let mut cache = RatingCache::new();
        cache.insert(Platform::Codeforces, "  Word  on the Paper ", Some(800));

        assert!(cache.contains(Platform::Codeforces, "word on the paper"));
        assert_eq!(
            cache.get(Platform::Codeforces, "WORD ON THE PAPER").map(|e| e.rating),
            Some(Some(800))
        );
        assert!(!cache.contains(Platform::AtCoder, "Word on the Paper"));
    }

    #[test]
    fn test_first_result_wins() {
        let mut cache = RatingCache::new();
        cache.insert(Platform::LeetCode, "Two Sum", None);
        let kept = cache.insert(Platform::LeetCode, "two sum", Some(1200));

        assert_eq!(kept.rating, None);
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
    }
}

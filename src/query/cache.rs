//! Search cache (spec.md §4.6.4): process-wide, keyed by a fingerprint of
//! the canonicalized query subtree plus the index generation. A single
//! writer populates each key; readers see a snapshot.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Instant;

use super::node::QueryNode;
use crate::postings::Posting;

/// `hash(canonicalized_subtree, index_generation)` (spec.md §4.6.4).
pub fn fingerprint(node: &QueryNode, index_generation: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    node.hash(&mut hasher);
    index_generation.hash(&mut hasher);
    hasher.finish()
}

struct CacheEntry {
    postings: Vec<Posting>,
    cached_at: Instant,
}

/// Process-wide cache of subtree evaluation results.
pub struct SearchCache {
    enabled: bool,
    entries: Mutex<HashMap<u64, CacheEntry>>,
}

impl SearchCache {
    pub fn new(enabled: bool) -> SearchCache {
        SearchCache {
            enabled,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: u64) -> Option<Vec<Posting>> {
        if !self.enabled {
            return None;
        }
        self.entries.lock().unwrap().get(&key).map(|e| e.postings.clone())
    }

    pub fn insert(&self, key: u64, postings: Vec<Posting>) {
        if !self.enabled {
            return;
        }
        self.entries.lock().unwrap().insert(
            key,
            CacheEntry {
                postings,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drops every entry cached before `since` — used when an external
    /// filter list's file mtime moves past a cached evaluation (spec.md
    /// §4.6.4's "cache entries carry a last-modified timestamp invalidated
    /// by file path timestamps for filter lists").
    pub fn invalidate_older_than(&self, since: Instant) {
        self.entries.lock().unwrap().retain(|_, e| e.cached_at >= since);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

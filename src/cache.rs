// In-memory result cache scoped to one checker session
//
// Keys are normalized term text. Lookups and inserts are not coordinated: two
// lookups racing on the same key may both miss and both compute, and the
// later `put` replaces the earlier one. Classification is deterministic for a
// given registry state, so both values are the same.
use crate::classifier::ClassificationResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, Arc<ClassificationResult>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a normalized term
    pub fn get(&self, key: &str) -> Option<Arc<ClassificationResult>> {
        let found = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned());

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store a result; last write wins
    pub fn put(&self, key: &str, result: Arc<ClassificationResult>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), result);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::MatchCategory;

    fn result(term: &str, category: MatchCategory) -> Arc<ClassificationResult> {
        Arc::new(ClassificationResult::new(term, category))
    }

    #[test]
    fn test_get_put() {
        let cache = ResultCache::new();
        assert!(cache.is_empty());
        assert!(cache.get("running shoes").is_none());

        cache.put("running shoes", result("Running Shoes", MatchCategory::FullMatch));
        let hit = cache.get("running shoes").unwrap();
        assert_eq!(hit.category, MatchCategory::FullMatch);
        assert_eq!(cache.len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = ResultCache::new();
        cache.put("boots", result("boots", MatchCategory::NoMatch));
        cache.put("boots", result("Boots", MatchCategory::FullMatch));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("boots").unwrap().term, "Boots");
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}

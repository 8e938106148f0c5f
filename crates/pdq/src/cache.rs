//! Best-effort in-process cache for identity query results.
//!
//! The cache is keyed by the used identifier pair and expires entries after
//! an injected TTL. It is not coherent across processes and is consulted
//! only in front of the identity service, never as a source of truth.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::QueryOutcome;

#[derive(Clone, Debug)]
pub struct PatientCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, (Instant, QueryOutcome)>>>,
}

impl PatientCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn get(&self, key: &str) -> Option<QueryOutcome> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((stored, outcome)) if stored.elapsed() < self.ttl => Some(outcome.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, outcome: &QueryOutcome) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (Instant::now(), outcome.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_entries_within_ttl() {
        let cache = PatientCache::new(Duration::from_secs(60));
        let outcome = QueryOutcome {
            count: 1,
            ..QueryOutcome::default()
        };
        cache.put("pixm:1.2.3|A", &outcome);
        let hit = cache.get("pixm:1.2.3|A").expect("cache hit");
        assert_eq!(hit.count, 1);
    }

    #[test]
    fn expires_entries_past_ttl() {
        let cache = PatientCache::new(Duration::ZERO);
        cache.put("pixm:1.2.3|A", &QueryOutcome::default());
        assert!(cache.get("pixm:1.2.3|A").is_none());
    }

    #[test]
    fn misses_unknown_keys() {
        let cache = PatientCache::new(Duration::from_secs(60));
        assert!(cache.get("pixm:1.2.3|B").is_none());
    }
}

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

use crate::{ast::TemplateExpression, error::ParseError};

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

struct Entry {
    expr: Arc<TemplateExpression>,
    last_used: u64,
}

#[derive(Default)]
struct Slots {
    entries: HashMap<String, Entry>,
    tick: u64,
}

/// Raw template string to parsed expression, keyed byte for byte.
///
/// Bounded: once `capacity` entries are held, inserting evicts the least
/// recently used one. A capacity of zero disables caching. Failed parses are
/// never stored.
pub struct ExpressionCache {
    capacity: usize,
    slots: Mutex<Slots>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ExpressionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Mutex::new(Slots::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, raw: &str) -> Option<Arc<TemplateExpression>> {
        let mut slots = self.slots.lock();
        slots.tick += 1;
        let tick = slots.tick;
        let entry = slots.entries.get_mut(raw)?;
        entry.last_used = tick;
        Some(Arc::clone(&entry.expr))
    }

    /// Returns the cached expression for `raw`, parsing and inserting on a miss.
    pub fn get_or_parse<F>(&self, raw: &str, parse: F) -> Result<Arc<TemplateExpression>, ParseError>
    where
        F: FnOnce(&str) -> Result<TemplateExpression, ParseError>,
    {
        if let Some(expr) = self.get(raw) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(raw, "expression cache hit");
            return Ok(expr);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let expr = Arc::new(parse(raw)?);
        if self.capacity == 0 {
            return Ok(expr);
        }
        Ok(self.insert(raw, expr))
    }

    fn insert(&self, raw: &str, expr: Arc<TemplateExpression>) -> Arc<TemplateExpression> {
        let mut slots = self.slots.lock();
        slots.tick += 1;
        let tick = slots.tick;

        // another caller may have parsed the same string meanwhile; keep the first
        if let Some(existing) = slots.entries.get_mut(raw) {
            existing.last_used = tick;
            return Arc::clone(&existing.expr);
        }

        if slots.entries.len() >= self.capacity
            && let Some(oldest) = slots
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
        {
            slots.entries.remove(&oldest);
            debug!(evicted = %oldest, "expression cache full, evicted least recently used");
        }

        slots.entries.insert(
            raw.to_string(),
            Entry {
                expr: Arc::clone(&expr),
                last_used: tick,
            },
        );
        expr
    }

    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            capacity: self.capacity,
        }
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for ExpressionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionCache")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn second_lookup_is_a_hit() {
        let cache = ExpressionCache::new(8);
        let first = cache.get_or_parse("${a}", parse).expect("parse");
        let second = cache
            .get_or_parse("${a}", |_| panic!("should not reparse"))
            .expect("cached");
        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn keys_are_not_normalized() {
        let cache = ExpressionCache::new(8);
        cache.get_or_parse("${a}", parse).expect("parse");
        cache.get_or_parse("${ a }", parse).expect("parse");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = ExpressionCache::new(8);
        assert!(cache.get_or_parse("${}", parse).is_err());
        assert!(cache.get_or_parse("${}", parse).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = ExpressionCache::new(2);
        cache.get_or_parse("${a}", parse).expect("a");
        cache.get_or_parse("${b}", parse).expect("b");
        cache.get_or_parse("${a}", parse).expect("a again");
        cache.get_or_parse("${c}", parse).expect("c");
        assert_eq!(cache.len(), 2);
        assert!(cache.get("${a}").is_some());
        assert!(cache.get("${b}").is_none());
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let cache = ExpressionCache::new(0);
        cache.get_or_parse("${a}", parse).expect("a");
        assert!(cache.is_empty());
    }
}

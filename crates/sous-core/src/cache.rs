//! Recipe detail cache
//!
//! A bounded cache of persisted recipes keyed by id, with a per-entry TTL
//! and least-recently-used eviction. It holds no global state: whoever
//! composes the application owns an instance and hands it to the
//! components that need it.

use crate::recipe::{PersistedRecipe, RecipeId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Cached recipe with its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub recipe: PersistedRecipe,
    pub cached_at: Instant,
}

impl CacheEntry {
    fn new(recipe: PersistedRecipe) -> Self {
        Self {
            recipe,
            cached_at: Instant::now(),
        }
    }

    /// Check if this cache entry is still valid
    pub fn is_valid(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() < ttl
    }

    pub fn age(&self) -> Duration {
        self.cached_at.elapsed()
    }
}

/// Configuration for cache behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Lifetime of each entry
    pub ttl: Duration,
    /// Whether to enable cache
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            ttl: Duration::from_secs(5 * 60),
            enabled: true,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub average_age: Option<Duration>,
    pub enabled: bool,
}

/// Bounded LRU cache of recipe details
#[derive(Debug)]
pub struct RecipeDetailCache {
    entries: HashMap<RecipeId, CacheEntry>,
    config: CacheConfig,
    /// Least recently used first
    access_order: Vec<RecipeId>,
    hits: u64,
    misses: u64,
}

impl Default for RecipeDetailCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeDetailCache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            access_order: Vec::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Cached recipe if present and not expired. Expired entries are dropped.
    pub fn get(&mut self, id: RecipeId) -> Option<PersistedRecipe> {
        if !self.config.enabled {
            return None;
        }

        let valid = self
            .entries
            .get(&id)
            .map(|entry| entry.is_valid(self.config.ttl));

        match valid {
            Some(true) => {
                self.hits += 1;
                self.touch(id);
                self.entries.get(&id).map(|entry| entry.recipe.clone())
            }
            Some(false) => {
                self.misses += 1;
                self.remove_id(id);
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Cache `recipe`, evicting the least recently used entry when full
    pub fn put(&mut self, recipe: PersistedRecipe) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }

        let id = recipe.id;
        if !self.entries.contains_key(&id) && self.entries.len() >= self.config.max_entries {
            self.evict_lru();
        }

        self.entries.insert(id, CacheEntry::new(recipe));
        self.touch(id);
    }

    /// Remove `id`; returns whether it was cached
    pub fn invalidate(&mut self, id: RecipeId) -> bool {
        self.remove_id(id)
    }

    /// Clear all cache entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let total_entries = self.entries.len();
        let average_age = if total_entries > 0 {
            let total: Duration = self.entries.values().map(CacheEntry::age).sum();
            Some(total / total_entries as u32)
        } else {
            None
        };

        CacheStats {
            total_entries,
            max_entries: self.config.max_entries,
            hits: self.hits,
            misses: self.misses,
            average_age,
            enabled: self.config.enabled,
        }
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&mut self) -> usize {
        let ttl = self.config.ttl;
        let expired: Vec<RecipeId> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_valid(ttl))
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            self.remove_id(*id);
        }
        expired.len()
    }

    fn evict_lru(&mut self) {
        if let Some(oldest) = self.access_order.first().copied() {
            self.remove_id(oldest);
        }
    }

    fn touch(&mut self, id: RecipeId) {
        self.access_order.retain(|existing| *existing != id);
        self.access_order.push(id);
    }

    fn remove_id(&mut self, id: RecipeId) -> bool {
        self.access_order.retain(|existing| *existing != id);
        self.entries.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::UserId;
    use chrono::Utc;

    fn recipe(id: RecipeId) -> PersistedRecipe {
        PersistedRecipe {
            id,
            owner: UserId::new("cook"),
            title: format!("Recipe {}", id),
            content: "Mix".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn small_cache() -> RecipeDetailCache {
        RecipeDetailCache::with_config(CacheConfig {
            max_entries: 2,
            ..Default::default()
        })
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = small_cache();
        cache.put(recipe(1));
        cache.put(recipe(2));

        // 1 becomes most recently used, so 2 is evicted
        assert!(cache.get(1).is_some());
        cache.put(recipe(3));

        assert!(cache.get(2).is_none());
        assert!(cache.get(1).is_some());
        assert!(cache.get(3).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_put_existing_does_not_evict() {
        let mut cache = small_cache();
        cache.put(recipe(1));
        cache.put(recipe(2));
        cache.put(recipe(2));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(1).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let mut cache = RecipeDetailCache::new();
        cache.put(recipe(1));

        tokio::time::advance(Duration::from_secs(4 * 60)).await;
        cache.put(recipe(2));
        assert!(cache.get(1).is_some());

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        assert!(cache.get(1).is_none());
        assert_eq!(cache.purge_expired(), 0);
        assert!(cache.get(2).is_some());

        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_and_stats() {
        let mut cache = RecipeDetailCache::new();
        cache.put(recipe(1));
        assert!(cache.get(1).is_some());
        assert!(cache.invalidate(1));
        assert!(!cache.invalidate(1));
        assert!(cache.get(1).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.max_entries, 50);
        assert_eq!(stats.average_age, None);
    }

    #[test]
    fn test_disabled_cache() {
        let mut cache = RecipeDetailCache::with_config(CacheConfig {
            enabled: false,
            ..Default::default()
        });
        cache.put(recipe(1));
        assert!(cache.get(1).is_none());
        assert!(cache.is_empty());
    }
}

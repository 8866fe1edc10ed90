//! Memoization of layout results.
//!
//! Entries expire after a fixed time-to-live and are evicted oldest-inserted
//! first once the cache grows past its capacity.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use web_time::Instant;

use serde::{Deserialize, Serialize};

use super::{LayoutCalculationResult, LayoutContext};
use crate::{Breakpoint, ComponentId};

/// Configuration for the layout cache and the debounced entry point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutCacheConfig {
    /// How long a result stays valid.
    #[serde(with = "crate::config::duration_ms")]
    pub ttl: Duration,
    /// Maximum number of cached results.
    pub capacity: usize,
    /// Quiet period before a debounced request fires.
    #[serde(with = "crate::config::duration_ms")]
    pub debounce_interval: Duration,
}

impl Default for LayoutCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5),
            capacity: 1000,
            debounce_interval: Duration::from_millis(16), // one frame
        }
    }
}

impl LayoutCacheConfig {
    /// Set the time-to-live.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the debounce interval.
    #[must_use]
    pub fn with_debounce_interval(mut self, interval: Duration) -> Self {
        self.debounce_interval = interval;
        self
    }
}

/// Cache key: the component plus everything in its context that changes
/// the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    component_id: ComponentId,
    viewport_width: u32,
    viewport_height: u32,
    breakpoint: Breakpoint,
    container: [u32; 4],
    column_gutter: u32,
    grid_snapping: bool,
    grid_size: u32,
    columns: u8,
}

impl LayoutKey {
    /// Build the key for a component laid out in `context`.
    #[must_use]
    pub fn new(component_id: &ComponentId, context: &LayoutContext) -> Self {
        let c = context.container;
        Self {
            component_id: component_id.clone(),
            viewport_width: context.viewport.width.to_bits(),
            viewport_height: context.viewport.height.to_bits(),
            breakpoint: context.viewport.breakpoint,
            container: [
                c.x.to_bits(),
                c.y.to_bits(),
                c.width.to_bits(),
                c.height.to_bits(),
            ],
            column_gutter: context.column_gutter.to_bits(),
            grid_snapping: context.config.enable_grid_snapping,
            grid_size: context.config.grid_size.to_bits(),
            columns: context.config.columns,
        }
    }

    /// The component this key belongs to.
    #[must_use]
    pub fn component_id(&self) -> &ComponentId {
        &self.component_id
    }
}

#[derive(Debug)]
struct CacheEntry {
    result: LayoutCalculationResult,
    inserted_at: Instant,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Entries dropped to respect capacity.
    pub evictions: u64,
    /// Entries dropped because their TTL passed.
    pub expirations: u64,
}

/// Time-bounded, capacity-bounded store of layout results.
#[derive(Debug)]
pub struct LayoutCache {
    entries: HashMap<LayoutKey, CacheEntry>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<LayoutKey>,
    config: LayoutCacheConfig,
    stats: CacheStats,
}

impl LayoutCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(config: LayoutCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    /// Look up a live entry. Expired entries are dropped and count as misses.
    pub fn get(&mut self, key: &LayoutKey, now: Instant) -> Option<&LayoutCalculationResult> {
        let expired = match self.entries.get(key) {
            Some(entry) => now.saturating_duration_since(entry.inserted_at) > self.config.ttl,
            None => {
                self.stats.misses += 1;
                return None;
            }
        };

        if expired {
            self.remove(key);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            return None;
        }

        self.stats.hits += 1;
        self.entries.get(key).map(|entry| &entry.result)
    }

    /// Store a result, evicting the oldest entries past capacity.
    pub fn insert(&mut self, key: LayoutKey, result: LayoutCalculationResult, now: Instant) {
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: now,
            },
        );

        while self.entries.len() > self.config.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if self.entries.remove(&oldest).is_some() {
                self.stats.evictions += 1;
                tracing::trace!(component = %oldest.component_id, "Evicted layout cache entry");
            }
        }
    }

    /// Drop every entry belonging to any of the given components.
    pub fn invalidate(&mut self, ids: &HashSet<ComponentId>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !ids.contains(&key.component_id));
        self.order.retain(|key| !ids.contains(&key.component_id));
        before - self.entries.len()
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Cache configuration.
    #[must_use]
    pub fn config(&self) -> &LayoutCacheConfig {
        &self.config
    }

    fn remove(&mut self, key: &LayoutKey) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

//! Texture cache with LRU eviction and in-use protection
//!
//! Maps (page index, scale) to GPU textures for an entire document session.
//! Eviction is least-recently-used among entries that are not currently
//! in use; an in-use entry is never evicted. When every entry is protected
//! the cache grows past its configured capacity (soft capacity) instead of
//! corrupting a draw in progress, and records the pressure.

use crate::GpuTexture;
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Identifies a cached page texture.
///
/// Equality is exact on both fields; the scale is compared by bit pattern,
/// so 1.0 and 1.0000001 are distinct keys. No fuzzy matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    page_index: u32,
    scale_bits: u32,
}

impl CacheKey {
    /// Build a key from a page index and a positive scale.
    pub fn new(page_index: u32, scale: f32) -> Self {
        debug_assert!(scale > 0.0, "cache key scale must be positive");
        Self { page_index, scale_bits: scale.to_bits() }
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn scale(&self) -> f32 {
        f32::from_bits(self.scale_bits)
    }
}

/// Counters describing cache behaviour over the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries currently stored.
    pub entry_count: usize,
    /// Configured capacity in entries.
    pub capacity: usize,
    /// Lookup hits.
    pub hits: u64,
    /// Lookup misses.
    pub misses: u64,
    /// Entries evicted to stay under capacity.
    pub evictions: u64,
    /// Times an insert had to exceed capacity because every evictable
    /// entry was in use.
    pub pressure_growths: u64,
}

impl CacheStats {
    /// Cache hit rate in [0, 1].
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Snapshot of one entry's bookkeeping, for diagnostics and tests.
#[derive(Debug, Clone, Copy)]
pub struct EntryInfo {
    pub width: u32,
    pub height: u32,
    pub in_use: bool,
    pub last_access: Instant,
}

struct Entry {
    texture: GpuTexture,
    in_use: bool,
    last_access: Instant,
}

struct State {
    entries: HashMap<CacheKey, Entry>,
    /// Eviction order: least recently used at the front.
    lru: VecDeque<CacheKey>,
    capacity: usize,
    stats: CacheStats,
}

impl State {
    /// Move a key to the back of the LRU queue.
    fn touch(&mut self, key: CacheKey) {
        self.lru.retain(|&k| k != key);
        self.lru.push_back(key);
    }

    /// Evict the least recently used entry that is not in use.
    ///
    /// Returns `false` if every entry is currently protected.
    fn evict_one(&mut self) -> bool {
        let victim = self
            .lru
            .iter()
            .copied()
            .find(|key| self.entries.get(key).is_some_and(|entry| !entry.in_use));

        let Some(key) = victim else {
            return false;
        };

        self.lru.retain(|&k| k != key);
        // Dropping the entry releases the GPU texture (last handle clone).
        self.entries.remove(&key);
        self.stats.evictions += 1;
        self.stats.entry_count = self.entries.len();
        debug!(
            "evicted page {} @ {:.3} ({} entries)",
            key.page_index(),
            key.scale(),
            self.entries.len()
        );
        true
    }

    /// Make room for one incoming entry, evicting LRU-not-in-use entries.
    ///
    /// Runs before the insert so the incoming texture can never be its own
    /// eviction victim. If every entry is protected the cache grows instead.
    fn make_room_for_one(&mut self) {
        while self.entries.len() + 1 > self.capacity {
            if !self.evict_one() {
                self.stats.pressure_growths += 1;
                warn!(
                    "texture cache at capacity ({}/{}) with all entries in use; growing",
                    self.entries.len(),
                    self.capacity
                );
                break;
            }
        }
    }
}

/// Session-wide texture cache shared by all page-views.
///
/// All mutations are serialized through one internal lock, which also makes
/// lookup-then-protect (`acquire`) atomic with respect to eviction: an entry
/// can never be evicted between its lookup and its being marked in use.
pub struct TextureCache {
    state: Mutex<State>,
}

impl TextureCache {
    /// Create a cache bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                lru: VecDeque::new(),
                capacity: capacity.max(1),
                stats: CacheStats { capacity: capacity.max(1), ..CacheStats::default() },
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a texture without protecting it.
    ///
    /// Refreshes the entry's LRU position and last-access time on hit; no
    /// other side effects.
    pub fn get(&self, key: CacheKey) -> Option<GpuTexture> {
        let mut state = self.lock();

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.last_access = Instant::now();
            let texture = entry.texture.clone();
            state.touch(key);
            state.stats.hits += 1;
            Some(texture)
        } else {
            state.stats.misses += 1;
            None
        }
    }

    /// Look up a texture and mark it in use in one atomic step.
    ///
    /// The returned lease clears the in-use flag when dropped, so the
    /// enter-before-draw / exit-after-draw pairing holds on error paths too.
    pub fn acquire(self: &Arc<Self>, key: CacheKey) -> Option<TextureLease> {
        let mut state = self.lock();

        let Some(entry) = state.entries.get_mut(&key) else {
            state.stats.misses += 1;
            return None;
        };

        entry.in_use = true;
        entry.last_access = Instant::now();
        let texture = entry.texture.clone();
        state.touch(key);
        state.stats.hits += 1;

        Some(TextureLease { cache: Arc::clone(self), key, texture })
    }

    /// Insert or replace the texture for `key`, evicting LRU-not-in-use
    /// entries if the cache is over capacity afterwards.
    pub fn insert(&self, key: CacheKey, texture: GpuTexture) {
        let mut state = self.lock();

        let replaced_in_use = match state.entries.get(&key) {
            Some(existing) => Some(existing.in_use),
            None => None,
        };

        // Replacing an existing key does not change the entry count.
        if replaced_in_use.is_none() {
            state.make_room_for_one();
        }

        state.entries.insert(
            key,
            Entry {
                texture,
                in_use: replaced_in_use.unwrap_or(false),
                last_access: Instant::now(),
            },
        );
        state.touch(key);
        state.stats.entry_count = state.entries.len();
    }

    /// Insert a freshly uploaded texture and immediately protect it, as one
    /// atomic step. Used on a cache miss right before drawing.
    pub fn insert_and_acquire(self: &Arc<Self>, key: CacheKey, texture: GpuTexture) -> TextureLease {
        let mut state = self.lock();
        if !state.entries.contains_key(&key) {
            state.make_room_for_one();
        }

        let lease = TextureLease { cache: Arc::clone(self), key, texture: texture.clone() };
        state.entries.insert(
            key,
            Entry { texture, in_use: true, last_access: Instant::now() },
        );
        state.touch(key);
        state.stats.entry_count = state.entries.len();
        lease
    }

    /// Toggle in-use protection directly.
    ///
    /// Prefer `acquire`; this exists for hosts that manage protection
    /// manually. Returns `false` if the key is absent.
    pub fn mark_in_use(&self, key: CacheKey, in_use: bool) -> bool {
        let mut state = self.lock();
        match state.entries.get_mut(&key) {
            Some(entry) => {
                entry.in_use = in_use;
                true
            }
            None => false,
        }
    }

    /// Remove one entry, releasing its texture. Returns whether it existed.
    pub fn remove(&self, key: CacheKey) -> bool {
        let mut state = self.lock();
        let existed = state.entries.remove(&key).is_some();
        if existed {
            state.lru.retain(|&k| k != key);
            state.stats.entry_count = state.entries.len();
        }
        existed
    }

    /// Drop every entry, releasing all GPU textures.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.lru.clear();
        state.stats.entry_count = 0;
    }

    pub fn contains(&self, key: CacheKey) -> bool {
        self.lock().entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Bookkeeping snapshot for one entry.
    pub fn entry_info(&self, key: CacheKey) -> Option<EntryInfo> {
        let state = self.lock();
        state.entries.get(&key).map(|entry| EntryInfo {
            width: entry.texture.width(),
            height: entry.texture.height(),
            in_use: entry.in_use,
            last_access: entry.last_access,
        })
    }
}

/// RAII protection for a cached texture while it is being drawn.
///
/// Holds its own handle clone, so drawing does not require the cache lock;
/// dropping the lease clears the entry's in-use flag.
pub struct TextureLease {
    cache: Arc<TextureCache>,
    key: CacheKey,
    texture: GpuTexture,
}

impl TextureLease {
    pub fn key(&self) -> CacheKey {
        self.key
    }

    pub fn texture(&self) -> &GpuTexture {
        &self.texture
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }
}

impl Drop for TextureLease {
    fn drop(&mut self) {
        self.cache.mark_in_use(self.key, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockHandle {
        _alive: Arc<()>,
    }

    fn mock_texture(alive: &Arc<()>, width: u32, height: u32) -> GpuTexture {
        GpuTexture::new(MockHandle { _alive: Arc::clone(alive) }, width, height)
    }

    fn plain_texture(width: u32, height: u32) -> GpuTexture {
        GpuTexture::new((), width, height)
    }

    #[test]
    fn test_get_miss_and_hit() {
        let cache = TextureCache::new(4);
        let key = CacheKey::new(0, 1.0);

        assert!(cache.get(key).is_none());
        cache.insert(key, plain_texture(100, 200));

        let texture = cache.get(key).expect("inserted entry should be found");
        assert_eq!(texture.width(), 100);
        assert_eq!(texture.height(), 200);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_scale_keys_are_exact() {
        let cache = TextureCache::new(4);
        let key_a = CacheKey::new(3, 1.0);
        let key_b = CacheKey::new(3, 1.5);

        cache.insert(key_a, plain_texture(100, 100));
        cache.insert(key_b, plain_texture(150, 150));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(key_a).unwrap().width(), 100);
        assert_eq!(cache.get(key_b).unwrap().width(), 150);

        // Nearby but unequal scales are distinct keys.
        assert!(cache.get(CacheKey::new(3, 1.0000001)).is_none());
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = TextureCache::new(2);
        let k1 = CacheKey::new(1, 1.0);
        let k2 = CacheKey::new(2, 1.0);
        let k3 = CacheKey::new(3, 1.0);

        cache.insert(k1, plain_texture(10, 10));
        cache.insert(k2, plain_texture(10, 10));
        cache.insert(k3, plain_texture(10, 10));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(k1));
        assert!(cache.contains(k2));
        assert!(cache.contains(k3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_get_refreshes_lru_order() {
        let cache = TextureCache::new(2);
        let k1 = CacheKey::new(1, 1.0);
        let k2 = CacheKey::new(2, 1.0);
        let k3 = CacheKey::new(3, 1.0);

        cache.insert(k1, plain_texture(10, 10));
        cache.insert(k2, plain_texture(10, 10));

        // Touch k1 so k2 becomes the eviction candidate.
        let _ = cache.get(k1);
        cache.insert(k3, plain_texture(10, 10));

        assert!(cache.contains(k1));
        assert!(!cache.contains(k2));
        assert!(cache.contains(k3));
    }

    #[test]
    fn test_eviction_releases_texture_handle() {
        let cache = TextureCache::new(2);
        let alive = Arc::new(());

        cache.insert(CacheKey::new(1, 1.0), mock_texture(&alive, 10, 10));
        assert_eq!(Arc::strong_count(&alive), 2);

        cache.insert(CacheKey::new(2, 1.0), plain_texture(10, 10));
        cache.insert(CacheKey::new(3, 1.0), plain_texture(10, 10));

        // Page 1 was evicted; its handle is gone.
        assert_eq!(Arc::strong_count(&alive), 1);
    }

    #[test]
    fn test_in_use_entry_survives_eviction_pressure() {
        let cache = Arc::new(TextureCache::new(2));
        let k1 = CacheKey::new(1, 1.0);

        cache.insert(k1, plain_texture(10, 10));
        let lease = cache.acquire(k1).expect("entry should be acquirable");

        cache.insert(CacheKey::new(2, 1.0), plain_texture(10, 10));
        cache.insert(CacheKey::new(3, 1.0), plain_texture(10, 10));

        // Page 1 is protected; page 2 was evicted instead.
        assert!(cache.contains(k1));
        assert_eq!(cache.len(), 2);
        drop(lease);
    }

    #[test]
    fn test_soft_capacity_growth_when_all_in_use() {
        let cache = Arc::new(TextureCache::new(2));
        let k1 = CacheKey::new(1, 1.0);
        let k2 = CacheKey::new(2, 1.0);

        cache.insert(k1, plain_texture(10, 10));
        cache.insert(k2, plain_texture(10, 10));
        let lease1 = cache.acquire(k1).unwrap();
        let lease2 = cache.acquire(k2).unwrap();

        cache.insert(CacheKey::new(3, 1.0), plain_texture(10, 10));

        // Nothing evictable: the cache grows to 3 instead of corrupting a
        // draw in progress.
        assert_eq!(cache.len(), 3);
        assert!(cache.contains(k1));
        assert!(cache.contains(k2));
        assert_eq!(cache.stats().pressure_growths, 1);

        drop(lease1);
        drop(lease2);

        // Once the leases are gone the next insert shrinks back under
        // capacity.
        cache.insert(CacheKey::new(4, 1.0), plain_texture(10, 10));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lease_drop_clears_protection() {
        let cache = Arc::new(TextureCache::new(2));
        let key = CacheKey::new(1, 1.0);
        cache.insert(key, plain_texture(10, 10));

        {
            let _lease = cache.acquire(key).unwrap();
            assert!(cache.entry_info(key).unwrap().in_use);
        }

        assert!(!cache.entry_info(key).unwrap().in_use);
    }

    #[test]
    fn test_insert_and_acquire_is_protected_from_birth() {
        let cache = Arc::new(TextureCache::new(1));
        let k1 = CacheKey::new(1, 1.0);
        let k2 = CacheKey::new(2, 1.0);

        let lease = cache.insert_and_acquire(k1, plain_texture(10, 10));

        // Capacity 1 and k1 is in use: inserting k2 grows the cache.
        cache.insert(k2, plain_texture(10, 10));
        assert!(cache.contains(k1));
        assert_eq!(cache.len(), 2);
        drop(lease);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = TextureCache::new(4);
        let key = CacheKey::new(1, 1.0);

        cache.insert(key, plain_texture(10, 10));
        assert!(cache.remove(key));
        assert!(!cache.remove(key));

        cache.insert(key, plain_texture(10, 10));
        cache.insert(CacheKey::new(2, 1.0), plain_texture(10, 10));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replace_keeps_protection_of_existing_key() {
        let cache = Arc::new(TextureCache::new(2));
        let key = CacheKey::new(1, 1.0);

        cache.insert(key, plain_texture(10, 10));
        let lease = cache.acquire(key).unwrap();

        cache.insert(key, plain_texture(20, 20));
        assert!(cache.entry_info(key).unwrap().in_use);
        assert_eq!(cache.get(key).unwrap().width(), 20);

        drop(lease);
        assert!(!cache.entry_info(key).unwrap().in_use);
    }

    #[test]
    fn test_capacity_is_at_least_one() {
        let cache = TextureCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_hit_rate() {
        let cache = TextureCache::new(4);
        let key = CacheKey::new(1, 1.0);
        cache.insert(key, plain_texture(10, 10));

        let _ = cache.get(key);
        let _ = cache.get(CacheKey::new(2, 1.0));
        let _ = cache.get(CacheKey::new(3, 1.0));

        let rate = cache.stats().hit_rate();
        assert!((rate - 1.0 / 3.0).abs() < 0.01);
    }
}

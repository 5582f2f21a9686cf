//! Pipeline state cache
//!
//! One cache per device maps descriptions to live pipeline states so equal
//! requests share a single native object. Lookup, insertion and every
//! reference count change happen under one mutex.
//!
//! # Construction
//! - [`ConstructionMode::Locked`]: the factory runs inside the critical
//!   section; concurrent misses for one description build once.
//! - [`ConstructionMode::Optimistic`]: the factory runs unlocked and the map
//!   is re-checked on insert; a thread that loses the race destroys its own
//!   native object and takes a reference to the winner.
//!
//! # Eviction
//! - [`EvictionPolicy::Immediate`]: the last release removes the entry and
//!   destroys the native object after the lock is dropped.
//! - [`EvictionPolicy::Deferred`]: zero-count entries stay cached and are
//!   revived by the next equal request; [`PipelineStateCache::trim`] destroys them.

use std::sync::Arc;
use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::description::PipelineStateDescription;
use crate::error::Result;
use crate::hashed::HashedDescription;
use crate::native::{NativePipelineHandle, PipelineFactory};
use crate::pipeline_state::{PipelineState, PipelineStateHandle};
use crate::settings::{CacheSettings, ConstructionMode, EvictionPolicy};

/// Cache statistics for monitoring effectiveness
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from an existing entry
    pub hits: usize,
    /// Requests that found no entry
    pub misses: usize,
    /// Native objects built and inserted
    pub constructions: usize,
    pub construction_failures: usize,
    /// Native objects built by optimistic losers and thrown away
    pub discarded_constructions: usize,
    /// Hits on zero-count entries (deferred eviction only)
    pub revivals: usize,
    /// Entries removed and destroyed
    pub evictions: usize,
    /// Entries currently in the map
    pub live_entries: usize,
}

struct CacheState {
    entries: HashMap<HashedDescription, Arc<PipelineState>>,
    stats: CacheStats,
}

impl CacheState {
    /// Takes a reference on an existing entry
    fn hit(&mut self, key: &HashedDescription) -> Option<Arc<PipelineState>> {
        let pipeline = self.entries.get(key)?.clone();
        if pipeline.add_reference() == 1 {
            self.stats.revivals += 1;
        }
        self.stats.hits += 1;
        Some(pipeline)
    }

    fn insert(&mut self, key: HashedDescription, native: NativePipelineHandle) -> Arc<PipelineState> {
        let pipeline = Arc::new(PipelineState::new(&key, native));
        self.entries.insert(key, pipeline.clone());
        self.stats.constructions += 1;
        self.stats.live_entries = self.entries.len();
        pipeline
    }

    /// Removes `pipeline`'s entry if the map still holds that exact object
    fn evict(&mut self, pipeline: &Arc<PipelineState>) -> bool {
        let key = pipeline.key();
        match self.entries.get(&key) {
            Some(existing) if Arc::ptr_eq(existing, pipeline) => {
                self.entries.remove(&key);
                self.stats.evictions += 1;
                self.stats.live_entries = self.entries.len();
                true
            }
            _ => false,
        }
    }
}

/// State shared between the cache and every handle it has given out
pub(crate) struct CacheShared {
    factory: Arc<dyn PipelineFactory>,
    settings: CacheSettings,
    state: Mutex<CacheState>,
}

impl CacheShared {
    pub(crate) fn add_reference(&self, pipeline: &Arc<PipelineState>) {
        let _guard = self.state.lock();
        pipeline.add_reference();
    }

    pub(crate) fn release(&self, pipeline: &Arc<PipelineState>) -> Result<u32> {
        let mut state = self.state.lock();
        let count = pipeline.release_reference()?;
        if count > 0 || self.settings.eviction == EvictionPolicy::Deferred {
            return Ok(count);
        }

        if !state.evict(pipeline) {
            log::warn!(
                "Pipeline state {} reached zero references but was not cached",
                pipeline.native_handle().raw()
            );
        }
        drop(state);

        pipeline.destroy(self.factory.as_ref());
        Ok(0)
    }
}

impl Drop for CacheShared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let count = state.entries.len();
        for (_, pipeline) in state.entries.drain() {
            // Every handle keeps this state alive, so no entry is referenced here
            debug_assert_eq!(pipeline.reference_count(), 0);
            pipeline.destroy(self.factory.as_ref());
        }
        if count > 0 {
            log::info!("Cleared pipeline state cache: {} entries destroyed", count);
        }
    }
}

/// Deduplicating pipeline state cache
pub struct PipelineStateCache {
    shared: Arc<CacheShared>,
}

impl PipelineStateCache {
    /// Create a cache with settings taken from the environment
    pub fn new(factory: Arc<dyn PipelineFactory>) -> Self {
        Self::with_settings(factory, CacheSettings::from_env())
    }

    pub fn with_settings(factory: Arc<dyn PipelineFactory>, settings: CacheSettings) -> Self {
        Self {
            shared: Arc::new(CacheShared {
                factory,
                settings,
                state: Mutex::new(CacheState {
                    entries: HashMap::with_capacity(settings.initial_capacity),
                    stats: CacheStats::default(),
                }),
            }),
        }
    }

    pub fn settings(&self) -> CacheSettings {
        self.shared.settings
    }

    /// Get or create the pipeline state for `description`
    ///
    /// The description is copied; the caller may keep mutating its own.
    pub fn acquire(&self, description: &PipelineStateDescription) -> Result<PipelineStateHandle> {
        description.validate()?;
        let key = HashedDescription::new(Arc::new(description.clone()));

        let pipeline = match self.shared.settings.construction {
            ConstructionMode::Locked => self.acquire_locked(key)?,
            ConstructionMode::Optimistic => self.acquire_optimistic(key)?,
        };
        Ok(PipelineStateHandle::new(pipeline, self.shared.clone()))
    }

    fn acquire_locked(&self, key: HashedDescription) -> Result<Arc<PipelineState>> {
        let mut state = self.shared.state.lock();
        if let Some(pipeline) = state.hit(&key) {
            log::debug!("Pipeline state cache HIT (hash: {:x})", key.hash_value());
            return Ok(pipeline);
        }

        log::debug!("Pipeline state cache MISS (hash: {:x})", key.hash_value());
        state.stats.misses += 1;

        let native = match self.shared.factory.create(key.description()) {
            Ok(native) => native,
            Err(e) => {
                state.stats.construction_failures += 1;
                log::warn!("Pipeline state construction failed (hash: {:x}): {}", key.hash_value(), e);
                return Err(e);
            }
        };

        log::info!("Created and cached pipeline state {} (hash: {:x})", native.raw(), key.hash_value());
        Ok(state.insert(key, native))
    }

    fn acquire_optimistic(&self, key: HashedDescription) -> Result<Arc<PipelineState>> {
        {
            let mut state = self.shared.state.lock();
            if let Some(pipeline) = state.hit(&key) {
                log::debug!("Pipeline state cache HIT (hash: {:x})", key.hash_value());
                return Ok(pipeline);
            }
            log::debug!("Pipeline state cache MISS (hash: {:x})", key.hash_value());
            state.stats.misses += 1;
        }

        let created = self.shared.factory.create(key.description());

        let mut state = self.shared.state.lock();
        let native = match created {
            Ok(native) => native,
            Err(e) => {
                state.stats.construction_failures += 1;
                log::warn!("Pipeline state construction failed (hash: {:x}): {}", key.hash_value(), e);
                return Err(e);
            }
        };

        // Another thread may have inserted an equal entry while we were building
        if let Some(winner) = state.hit(&key) {
            state.stats.discarded_constructions += 1;
            drop(state);
            log::warn!(
                "Discarding pipeline state {} built concurrently with {} (hash: {:x})",
                native.raw(),
                winner.native_handle().raw(),
                key.hash_value()
            );
            self.shared.factory.destroy(native);
            return Ok(winner);
        }

        log::info!("Created and cached pipeline state {} (hash: {:x})", native.raw(), key.hash_value());
        Ok(state.insert(key, native))
    }

    /// Whether an entry equal to `description` is cached
    pub fn contains(&self, description: &PipelineStateDescription) -> bool {
        let key = HashedDescription::new(Arc::new(description.clone()));
        self.shared.state.lock().entries.contains_key(&key)
    }

    /// Number of cached entries, including zero-count ones awaiting `trim`
    pub fn len(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroy every entry nobody references; returns how many were destroyed
    ///
    /// Only meaningful with [`EvictionPolicy::Deferred`]; with immediate
    /// eviction there is never anything to trim.
    pub fn trim(&self) -> usize {
        let unused: Vec<Arc<PipelineState>> = {
            let mut state = self.shared.state.lock();
            let mut unused = Vec::new();
            state.entries.retain(|_, pipeline| {
                if pipeline.reference_count() == 0 {
                    unused.push(pipeline.clone());
                    false
                } else {
                    true
                }
            });
            state.stats.evictions += unused.len();
            state.stats.live_entries = state.entries.len();
            unused
        };

        for pipeline in &unused {
            pipeline.destroy(self.shared.factory.as_ref());
        }
        if !unused.is_empty() {
            log::info!("Trimmed pipeline state cache: {} entries destroyed", unused.len());
        }
        unused.len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.shared.state.lock().stats
    }

    /// Reset the counters; `live_entries` keeps tracking the map
    pub fn clear_stats(&self) {
        let mut state = self.shared.state.lock();
        let live_entries = state.entries.len();
        state.stats = CacheStats {
            live_entries,
            ..CacheStats::default()
        };
    }
}

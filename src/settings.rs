//! Cache configuration
//!
//! Settings are plain values handed to [`crate::PipelineStateCache::with_settings`].
//! [`CacheSettings::from_env`] gives the process-wide defaults, read once.

use once_cell::sync::Lazy;

// Presence of a variable is enough; the value is ignored (except capacity)
pub const OPTIMISTIC_ENV_VAR: &str = "PSO_CACHE_OPTIMISTIC";
pub const DEFERRED_EVICTION_ENV_VAR: &str = "PSO_CACHE_DEFERRED_EVICTION";
pub const CAPACITY_ENV_VAR: &str = "PSO_CACHE_CAPACITY";

/// Where the native factory runs relative to the cache lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstructionMode {
    /// Factory runs inside the critical section; concurrent misses on equal
    /// descriptions build exactly one native object
    #[default]
    Locked,
    /// Factory runs with the lock released; the map is re-checked on insert
    /// and a losing native object is destroyed
    Optimistic,
}

/// What happens to an entry whose reference count reaches zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Remove from the map and destroy the native object right away
    #[default]
    Immediate,
    /// Keep the entry alive until [`crate::PipelineStateCache::trim`]
    Deferred,
}

/// Pipeline state cache settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub construction: ConstructionMode,
    pub eviction: EvictionPolicy,
    /// Initial map capacity
    pub initial_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            construction: ConstructionMode::Locked,
            eviction: EvictionPolicy::Immediate,
            initial_capacity: 64,
        }
    }
}

static ENV_SETTINGS: Lazy<CacheSettings> = Lazy::new(|| {
    let settings = CacheSettings::from_lookup(|key| std::env::var(key).ok());
    log::debug!("Pipeline state cache settings from environment: {:?}", settings);
    settings
});

impl CacheSettings {
    /// Settings derived from `PSO_CACHE_*` environment variables
    ///
    /// The environment is read the first time this is called; later changes
    /// to the environment are not observed.
    pub fn from_env() -> Self {
        *ENV_SETTINGS
    }

    /// Builds settings from an arbitrary key lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if lookup(OPTIMISTIC_ENV_VAR).is_some() {
            settings.construction = ConstructionMode::Optimistic;
        }
        if lookup(DEFERRED_EVICTION_ENV_VAR).is_some() {
            settings.eviction = EvictionPolicy::Deferred;
        }
        if let Some(raw) = lookup(CAPACITY_ENV_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) => settings.initial_capacity = capacity,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", CAPACITY_ENV_VAR, raw, e),
            }
        }

        settings
    }

    pub fn with_construction(mut self, construction: ConstructionMode) -> Self {
        self.construction = construction;
        self
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }
}

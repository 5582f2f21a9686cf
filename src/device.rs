//! Graphics device - owns the native factory and the pipeline state cache

use std::sync::Arc;

use crate::cache::{CacheStats, PipelineStateCache};
use crate::description::PipelineStateDescription;
use crate::error::Result;
use crate::native::PipelineFactory;
use crate::pipeline_state::PipelineStateHandle;
use crate::settings::CacheSettings;

/// Main device wrapper
///
/// Pipeline states created through one device are deduplicated against each
/// other, never across devices.
pub struct GraphicsDevice {
    label: String,
    factory: Arc<dyn PipelineFactory>,
    pipeline_states: PipelineStateCache,
}

impl GraphicsDevice {
    /// Create a device using cache settings from the environment
    pub fn new(label: impl Into<String>, factory: Arc<dyn PipelineFactory>) -> Self {
        Self::with_settings(label, factory, CacheSettings::from_env())
    }

    pub fn with_settings(
        label: impl Into<String>,
        factory: Arc<dyn PipelineFactory>,
        settings: CacheSettings,
    ) -> Self {
        let label = label.into();
        log::info!("Created device '{}' with pipeline state cache {:?}", label, settings);

        Self {
            pipeline_states: PipelineStateCache::with_settings(factory.clone(), settings),
            factory,
            label,
        }
    }

    /// Get or create a pipeline state equal to `description`
    ///
    /// Equal descriptions return handles to the same object. Each handle
    /// holds one reference; dropping or releasing it gives the reference back.
    pub fn create_pipeline_state(&self, description: &PipelineStateDescription) -> Result<PipelineStateHandle> {
        self.pipeline_states.acquire(description)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn factory(&self) -> &Arc<dyn PipelineFactory> {
        &self.factory
    }

    pub fn pipeline_states(&self) -> &PipelineStateCache {
        &self.pipeline_states
    }

    pub fn pipeline_state_stats(&self) -> CacheStats {
        self.pipeline_states.stats()
    }
}

impl Drop for GraphicsDevice {
    fn drop(&mut self) {
        let stats = self.pipeline_states.stats();
        log::info!(
            "Device '{}' dropped: {} pipeline states cached, {} hits / {} misses",
            self.label,
            stats.live_entries,
            stats.hits,
            stats.misses
        );
    }
}

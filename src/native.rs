//! Native pipeline construction
//!
//! The cache never builds backend objects itself. It hands a description to
//! a [`PipelineFactory`] and keeps the opaque [`NativePipelineHandle`] it gets
//! back until the last reference goes away.
//!
//! [`HeadlessPipelineFactory`] is an in-process factory that translates the
//! description to wgpu state, checks it, and issues sequential handles.
//! It is what tests and GPU-less tools use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::RwLock;
use smallvec::SmallVec;
use wgpu_types as wgt;

use crate::description::PipelineStateDescription;
use crate::error::{PipelineStateError, Result};

/// Opaque handle to a backend pipeline object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativePipelineHandle(u64);

impl NativePipelineHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Builds and destroys backend pipeline objects
///
/// `create` may be called from several threads at once when the cache runs
/// in optimistic mode. `destroy` is called exactly once per handle returned
/// by `create`.
pub trait PipelineFactory: Send + Sync {
    fn create(&self, description: &PipelineStateDescription) -> Result<NativePipelineHandle>;

    fn destroy(&self, handle: NativePipelineHandle);
}

/// Fixed-function state of a description in wgpu terms
#[derive(Debug, Clone)]
pub struct TranslatedStates {
    pub primitive: wgt::PrimitiveState,
    pub depth_stencil: Option<wgt::DepthStencilState>,
    pub multisample: wgt::MultisampleState,
    pub color_targets: SmallVec<[wgt::ColorTargetState; 4]>,
}

/// Translate blend/rasterizer/depth-stencil/output state to wgpu state
///
/// Fails on format combinations no backend accepts.
pub fn translate_states(description: &PipelineStateDescription) -> Result<TranslatedStates> {
    let output = &description.output;
    let raster = &description.rasterizer_state;

    let mut color_targets = SmallVec::new();
    for (index, format) in output.render_target_formats().enumerate() {
        if format.is_depth_stencil_format() {
            return Err(PipelineStateError::unsupported_format(
                format,
                format!("color target {}", index),
            ));
        }
        let blend = description.blend_state.target(index);
        color_targets.push(wgt::ColorTargetState {
            format,
            blend: blend.to_wgpu(),
            write_mask: blend.color_write_channels,
        });
    }

    let depth_stencil = match output.depth_stencil_format {
        Some(format) if !format.is_depth_stencil_format() => {
            return Err(PipelineStateError::unsupported_format(format, "depth-stencil attachment"));
        }
        Some(format) => Some(
            description
                .depth_stencil_state
                .to_wgpu(format, raster.depth_bias_state()),
        ),
        None => None,
    };

    let count = output.multisample_count;
    if !count.is_power_of_two() || count > 16 {
        return Err(PipelineStateError::construction(
            "multisample",
            format!("unsupported sample count {}", count),
        ));
    }

    Ok(TranslatedStates {
        primitive: wgt::PrimitiveState {
            topology: description.primitive_type,
            strip_index_format: None,
            front_face: raster.front_face,
            cull_mode: raster.cull_mode,
            unclipped_depth: !raster.depth_clip_enable,
            polygon_mode: raster.fill_mode,
            conservative: false,
        },
        depth_stencil,
        multisample: wgt::MultisampleState {
            count,
            mask: u64::from(description.sample_mask),
            alpha_to_coverage_enabled: description.blend_state.alpha_to_coverage_enable,
        },
        color_targets,
    })
}

/// What the headless factory remembers about a pipeline
#[derive(Debug, Clone)]
pub struct HeadlessPipelineInfo {
    pub states: TranslatedStates,
    pub vertex_buffer_count: u32,
}

/// In-process factory that needs no GPU
pub struct HeadlessPipelineFactory {
    next_handle: AtomicU64,
    pipelines: RwLock<HashMap<u64, HeadlessPipelineInfo>>,
    created: AtomicU64,
    destroyed: AtomicU64,
}

impl HeadlessPipelineFactory {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1), // Start at 1 so 0 can indicate null
            pipelines: RwLock::new(HashMap::new()),
            created: AtomicU64::new(0),
            destroyed: AtomicU64::new(0),
        }
    }

    /// Number of successful `create` calls
    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Acquire)
    }

    /// Number of `destroy` calls that found a live pipeline
    pub fn destroyed_count(&self) -> u64 {
        self.destroyed.load(Ordering::Acquire)
    }

    pub fn live_count(&self) -> usize {
        self.pipelines.read().len()
    }

    pub fn is_live(&self, handle: NativePipelineHandle) -> bool {
        self.pipelines.read().contains_key(&handle.raw())
    }

    pub fn info(&self, handle: NativePipelineHandle) -> Option<HeadlessPipelineInfo> {
        self.pipelines.read().get(&handle.raw()).cloned()
    }
}

impl Default for HeadlessPipelineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineFactory for HeadlessPipelineFactory {
    fn create(&self, description: &PipelineStateDescription) -> Result<NativePipelineHandle> {
        let states = translate_states(description)?;
        let info = HeadlessPipelineInfo {
            states,
            vertex_buffer_count: description.input_binding_count(),
        };

        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.pipelines.write().insert(handle, info);
        self.created.fetch_add(1, Ordering::AcqRel);
        log::debug!("Headless pipeline {} created", handle);
        Ok(NativePipelineHandle::new(handle))
    }

    fn destroy(&self, handle: NativePipelineHandle) {
        if self.pipelines.write().remove(&handle.raw()).is_some() {
            self.destroyed.fetch_add(1, Ordering::AcqRel);
            log::debug!("Headless pipeline {} destroyed", handle.raw());
        } else {
            log::error!("Destroy of unknown headless pipeline {}", handle.raw());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RenderOutputDescription;
    use crate::state::BlendStateDescription;

    fn description() -> PipelineStateDescription {
        PipelineStateDescription {
            output: RenderOutputDescription::new(
                wgt::TextureFormat::Bgra8Unorm,
                Some(wgt::TextureFormat::Depth32Float),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_translate_states() {
        let mut description = description();
        description.blend_state = BlendStateDescription::alpha_blend();
        description.sample_mask = 0x0000_FFFF;

        let states = translate_states(&description).unwrap();
        assert_eq!(states.color_targets.len(), 1);
        assert!(states.color_targets[0].blend.is_some());
        assert_eq!(states.multisample.mask, 0x0000_FFFF);
        assert_eq!(states.primitive.cull_mode, Some(wgt::Face::Back));

        let depth = states.depth_stencil.unwrap();
        assert_eq!(depth.format, wgt::TextureFormat::Depth32Float);
        assert!(depth.depth_write_enabled);
    }

    #[test]
    fn test_depth_format_as_color_target_is_rejected() {
        let mut description = description();
        description.output = RenderOutputDescription::single(wgt::TextureFormat::Depth32Float);

        let err = translate_states(&description).unwrap_err();
        assert!(matches!(err, PipelineStateError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_color_format_as_depth_is_rejected() {
        let mut description = description();
        description.output.depth_stencil_format = Some(wgt::TextureFormat::Rgba8Unorm);
        assert!(translate_states(&description).is_err());
    }

    #[test]
    fn test_odd_sample_count_is_rejected() {
        let mut description = description();
        description.output.multisample_count = 3;
        assert!(translate_states(&description).is_err());
    }

    #[test]
    fn test_headless_handles_are_sequential_and_tracked() {
        let factory = HeadlessPipelineFactory::new();
        let first = factory.create(&description()).unwrap();
        let second = factory.create(&description()).unwrap();

        assert_eq!(first.raw(), 1);
        assert_eq!(second.raw(), 2);
        assert_eq!(factory.live_count(), 2);

        factory.destroy(first);
        factory.destroy(first);
        assert!(!factory.is_live(first));
        assert!(factory.is_live(second));
        assert_eq!(factory.destroyed_count(), 1);
        assert_eq!(factory.created_count(), 2);
    }

    #[test]
    fn test_failed_create_issues_no_handle() {
        let factory = HeadlessPipelineFactory::new();
        let mut bad = description();
        bad.output.multisample_count = 5;

        assert!(factory.create(&bad).is_err());
        assert_eq!(factory.created_count(), 0);
        assert_eq!(factory.live_count(), 0);
    }
}

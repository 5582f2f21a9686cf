//! Deduplicating, reference-counted pipeline state cache
//!
//! Renderers ask a [`GraphicsDevice`] for pipeline states by description.
//! Equal descriptions share one native object; the object is destroyed when
//! the last [`PipelineStateHandle`] goes away.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pso_cache::{GraphicsDevice, HeadlessPipelineFactory, PipelineStateDescription};
//!
//! let device = GraphicsDevice::new("main", Arc::new(HeadlessPipelineFactory::new()));
//! let mut description = PipelineStateDescription::new();
//! description.set_defaults();
//!
//! let a = device.create_pipeline_state(&description)?;
//! let b = device.create_pipeline_state(&description.clone())?;
//! assert!(pso_cache::PipelineStateHandle::ptr_eq(&a, &b));
//! # Ok::<(), pso_cache::PipelineStateError>(())
//! ```

pub mod bytecode;
pub mod cache;
pub mod description;
pub mod device;
pub mod error;
pub mod hashed;
pub mod input_layout;
pub mod logging;
pub mod native;
pub mod output;
pub mod pipeline_state;
pub mod root_signature;
pub mod settings;
pub mod state;

pub use crate::bytecode::{EffectBytecode, EffectBytecodeId, ShaderStageBytecode};
pub use crate::cache::{CacheStats, PipelineStateCache};
pub use crate::description::PipelineStateDescription;
pub use crate::device::GraphicsDevice;
pub use crate::error::{PipelineStateError, Result};
pub use crate::hashed::HashedDescription;
pub use crate::input_layout::{InputElementDescription, VertexBufferLayout};
pub use crate::logging::init_logging;
pub use crate::native::{HeadlessPipelineFactory, NativePipelineHandle, PipelineFactory};
pub use crate::output::RenderOutputDescription;
pub use crate::pipeline_state::{PipelineState, PipelineStateHandle};
pub use crate::root_signature::{BindingLayoutEntry, BindingLayoutType, RootSignature};
pub use crate::settings::{CacheSettings, ConstructionMode, EvictionPolicy};
pub use crate::state::{
    BlendStateDescription, BlendStateRenderTargetDescription, DepthStencilStateDescription,
    DepthStencilStencilOpDescription, RasterizerStateDescription,
};

pub use wgpu_types;

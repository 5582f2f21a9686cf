//! Fixed-function state blocks: blend, rasterizer and depth-stencil
//!
//! Every block is a small `Copy` value whose `Default` is the canonical
//! default state. Floating point fields compare and hash by bit pattern so
//! the blocks can sit inside a hash key.

use std::hash::{Hash, Hasher};
use wgpu_types as wgt;

/// Maximum number of simultaneously bound color targets
pub const MAX_RENDER_TARGETS: usize = 8;

// === Blend ===

/// Blend configuration of a single color target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateRenderTargetDescription {
    pub blend_enable: bool,
    pub color_source_blend: wgt::BlendFactor,
    pub color_destination_blend: wgt::BlendFactor,
    pub color_blend_function: wgt::BlendOperation,
    pub alpha_source_blend: wgt::BlendFactor,
    pub alpha_destination_blend: wgt::BlendFactor,
    pub alpha_blend_function: wgt::BlendOperation,
    pub color_write_channels: wgt::ColorWrites,
}

impl Default for BlendStateRenderTargetDescription {
    fn default() -> Self {
        Self {
            blend_enable: false,
            color_source_blend: wgt::BlendFactor::One,
            color_destination_blend: wgt::BlendFactor::Zero,
            color_blend_function: wgt::BlendOperation::Add,
            alpha_source_blend: wgt::BlendFactor::One,
            alpha_destination_blend: wgt::BlendFactor::Zero,
            alpha_blend_function: wgt::BlendOperation::Add,
            color_write_channels: wgt::ColorWrites::ALL,
        }
    }
}

impl BlendStateRenderTargetDescription {
    /// The equivalent wgpu blend state, `None` when blending is off
    pub fn to_wgpu(&self) -> Option<wgt::BlendState> {
        if !self.blend_enable {
            return None;
        }
        Some(wgt::BlendState {
            color: wgt::BlendComponent {
                src_factor: self.color_source_blend,
                dst_factor: self.color_destination_blend,
                operation: self.color_blend_function,
            },
            alpha: wgt::BlendComponent {
                src_factor: self.alpha_source_blend,
                dst_factor: self.alpha_destination_blend,
                operation: self.alpha_blend_function,
            },
        })
    }
}

/// Blend state for all color targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateDescription {
    pub alpha_to_coverage_enable: bool,
    /// When false only `render_targets[0]` is meaningful to the backend
    pub independent_blend_enable: bool,
    pub render_targets: [BlendStateRenderTargetDescription; MAX_RENDER_TARGETS],
}

impl Default for BlendStateDescription {
    fn default() -> Self {
        Self {
            alpha_to_coverage_enable: false,
            independent_blend_enable: false,
            render_targets: [BlendStateRenderTargetDescription::default(); MAX_RENDER_TARGETS],
        }
    }
}

impl BlendStateDescription {
    /// Reset to the default state (blending disabled, all channels written)
    pub fn set_defaults(&mut self) {
        *self = Self::default();
    }

    /// Applies the same blend to every render target
    fn uniform(
        source: wgt::BlendFactor,
        destination: wgt::BlendFactor,
        alpha_source: wgt::BlendFactor,
        alpha_destination: wgt::BlendFactor,
    ) -> Self {
        let target = BlendStateRenderTargetDescription {
            blend_enable: true,
            color_source_blend: source,
            color_destination_blend: destination,
            alpha_source_blend: alpha_source,
            alpha_destination_blend: alpha_destination,
            ..Default::default()
        };
        Self {
            render_targets: [target; MAX_RENDER_TARGETS],
            ..Default::default()
        }
    }

    pub fn opaque() -> Self {
        Self::default()
    }

    /// Premultiplied alpha blending
    pub fn alpha_blend() -> Self {
        Self::uniform(
            wgt::BlendFactor::One,
            wgt::BlendFactor::OneMinusSrcAlpha,
            wgt::BlendFactor::One,
            wgt::BlendFactor::OneMinusSrcAlpha,
        )
    }

    pub fn additive() -> Self {
        Self::uniform(
            wgt::BlendFactor::SrcAlpha,
            wgt::BlendFactor::One,
            wgt::BlendFactor::SrcAlpha,
            wgt::BlendFactor::One,
        )
    }

    pub fn non_premultiplied() -> Self {
        Self::uniform(
            wgt::BlendFactor::SrcAlpha,
            wgt::BlendFactor::OneMinusSrcAlpha,
            wgt::BlendFactor::One,
            wgt::BlendFactor::OneMinusSrcAlpha,
        )
    }

    /// Blend description the backend should use for target `index`
    pub fn target(&self, index: usize) -> &BlendStateRenderTargetDescription {
        if self.independent_blend_enable {
            &self.render_targets[index]
        } else {
            &self.render_targets[0]
        }
    }
}

// === Rasterizer ===

/// Rasterizer state
#[derive(Debug, Clone, Copy)]
pub struct RasterizerStateDescription {
    pub fill_mode: wgt::PolygonMode,
    /// `None` disables culling
    pub cull_mode: Option<wgt::Face>,
    pub front_face: wgt::FrontFace,
    pub depth_bias: i32,
    pub slope_scale_depth_bias: f32,
    pub depth_bias_clamp: f32,
    pub depth_clip_enable: bool,
    pub scissor_test_enable: bool,
    pub multisample_anti_alias_line: bool,
}

impl Default for RasterizerStateDescription {
    fn default() -> Self {
        Self {
            fill_mode: wgt::PolygonMode::Fill,
            cull_mode: Some(wgt::Face::Back),
            front_face: wgt::FrontFace::Cw,
            depth_bias: 0,
            slope_scale_depth_bias: 0.0,
            depth_bias_clamp: 0.0,
            depth_clip_enable: true,
            scissor_test_enable: false,
            multisample_anti_alias_line: false,
        }
    }
}

impl RasterizerStateDescription {
    pub fn set_defaults(&mut self) {
        *self = Self::default();
    }

    pub fn cull_none() -> Self {
        Self {
            cull_mode: None,
            ..Default::default()
        }
    }

    pub fn cull_front() -> Self {
        Self {
            cull_mode: Some(wgt::Face::Front),
            ..Default::default()
        }
    }

    pub fn wireframe() -> Self {
        Self {
            fill_mode: wgt::PolygonMode::Line,
            cull_mode: None,
            ..Default::default()
        }
    }

    /// Depth bias in the wgpu layout
    pub fn depth_bias_state(&self) -> wgt::DepthBiasState {
        wgt::DepthBiasState {
            constant: self.depth_bias,
            slope_scale: self.slope_scale_depth_bias,
            clamp: self.depth_bias_clamp,
        }
    }
}

impl PartialEq for RasterizerStateDescription {
    fn eq(&self, other: &Self) -> bool {
        self.fill_mode == other.fill_mode
            && self.cull_mode == other.cull_mode
            && self.front_face == other.front_face
            && self.depth_bias == other.depth_bias
            && self.slope_scale_depth_bias.to_bits() == other.slope_scale_depth_bias.to_bits()
            && self.depth_bias_clamp.to_bits() == other.depth_bias_clamp.to_bits()
            && self.depth_clip_enable == other.depth_clip_enable
            && self.scissor_test_enable == other.scissor_test_enable
            && self.multisample_anti_alias_line == other.multisample_anti_alias_line
    }
}

impl Eq for RasterizerStateDescription {}

impl Hash for RasterizerStateDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fill_mode.hash(state);
        self.cull_mode.hash(state);
        self.front_face.hash(state);
        self.depth_bias.hash(state);
        self.slope_scale_depth_bias.to_bits().hash(state);
        self.depth_bias_clamp.to_bits().hash(state);
        self.depth_clip_enable.hash(state);
        self.scissor_test_enable.hash(state);
        self.multisample_anti_alias_line.hash(state);
    }
}

// === Depth / stencil ===

/// Stencil operations for one face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilStencilOpDescription {
    pub stencil_fail: wgt::StencilOperation,
    pub stencil_depth_buffer_fail: wgt::StencilOperation,
    pub stencil_pass: wgt::StencilOperation,
    pub stencil_function: wgt::CompareFunction,
}

impl Default for DepthStencilStencilOpDescription {
    fn default() -> Self {
        Self {
            stencil_fail: wgt::StencilOperation::Keep,
            stencil_depth_buffer_fail: wgt::StencilOperation::Keep,
            stencil_pass: wgt::StencilOperation::Keep,
            stencil_function: wgt::CompareFunction::Always,
        }
    }
}

impl DepthStencilStencilOpDescription {
    pub fn to_wgpu(&self) -> wgt::StencilFaceState {
        wgt::StencilFaceState {
            compare: self.stencil_function,
            fail_op: self.stencil_fail,
            depth_fail_op: self.stencil_depth_buffer_fail,
            pass_op: self.stencil_pass,
        }
    }
}

/// Depth and stencil test state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilStateDescription {
    pub depth_buffer_enable: bool,
    pub depth_buffer_write_enable: bool,
    pub depth_buffer_function: wgt::CompareFunction,
    pub stencil_enable: bool,
    pub stencil_mask: u8,
    pub stencil_write_mask: u8,
    pub front_face: DepthStencilStencilOpDescription,
    pub back_face: DepthStencilStencilOpDescription,
}

impl Default for DepthStencilStateDescription {
    fn default() -> Self {
        Self {
            depth_buffer_enable: true,
            depth_buffer_write_enable: true,
            depth_buffer_function: wgt::CompareFunction::LessEqual,
            stencil_enable: false,
            stencil_mask: 0xFF,
            stencil_write_mask: 0xFF,
            front_face: DepthStencilStencilOpDescription::default(),
            back_face: DepthStencilStencilOpDescription::default(),
        }
    }
}

impl DepthStencilStateDescription {
    pub fn set_defaults(&mut self) {
        *self = Self::default();
    }

    /// Depth test without depth writes
    pub fn depth_read() -> Self {
        Self {
            depth_buffer_write_enable: false,
            ..Default::default()
        }
    }

    /// No depth test, no depth writes
    pub fn none() -> Self {
        Self {
            depth_buffer_enable: false,
            depth_buffer_write_enable: false,
            ..Default::default()
        }
    }

    /// The equivalent wgpu state for a given depth format
    ///
    /// A disabled depth test maps to `Always` with writes off; wgpu has no
    /// separate enable flag.
    pub fn to_wgpu(
        &self,
        format: wgt::TextureFormat,
        bias: wgt::DepthBiasState,
    ) -> wgt::DepthStencilState {
        let stencil = if self.stencil_enable {
            wgt::StencilState {
                front: self.front_face.to_wgpu(),
                back: self.back_face.to_wgpu(),
                read_mask: u32::from(self.stencil_mask),
                write_mask: u32::from(self.stencil_write_mask),
            }
        } else {
            wgt::StencilState::default()
        };

        wgt::DepthStencilState {
            format,
            depth_write_enabled: self.depth_buffer_enable && self.depth_buffer_write_enable,
            depth_compare: if self.depth_buffer_enable {
                self.depth_buffer_function
            } else {
                wgt::CompareFunction::Always
            },
            stencil,
            bias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_defaults_restores_canonical_state() {
        let mut blend = BlendStateDescription::additive();
        blend.set_defaults();
        assert_eq!(blend, BlendStateDescription::default());
        assert!(blend.target(3).to_wgpu().is_none());

        let mut raster = RasterizerStateDescription::wireframe();
        raster.depth_bias = 4;
        raster.set_defaults();
        assert_eq!(raster.cull_mode, Some(wgt::Face::Back));
        assert_eq!(raster.fill_mode, wgt::PolygonMode::Fill);
        assert!(raster.depth_clip_enable);

        let mut depth = DepthStencilStateDescription::none();
        depth.set_defaults();
        assert!(depth.depth_buffer_enable);
        assert_eq!(depth.depth_buffer_function, wgt::CompareFunction::LessEqual);
    }

    #[test]
    fn test_rasterizer_float_fields_compare_bitwise() {
        let a = RasterizerStateDescription {
            slope_scale_depth_bias: 0.0,
            ..Default::default()
        };
        let b = RasterizerStateDescription {
            slope_scale_depth_bias: -0.0,
            ..Default::default()
        };
        assert_ne!(a, b);

        let nan = RasterizerStateDescription {
            depth_bias_clamp: f32::NAN,
            ..Default::default()
        };
        assert_eq!(nan, nan);
    }

    #[test]
    fn test_blend_target_without_independent_blend() {
        let mut blend = BlendStateDescription::default();
        blend.render_targets[2].blend_enable = true;
        assert!(!blend.target(2).blend_enable);

        blend.independent_blend_enable = true;
        assert!(blend.target(2).blend_enable);
    }

    #[test]
    fn test_disabled_depth_maps_to_always() {
        let state = DepthStencilStateDescription::none()
            .to_wgpu(wgt::TextureFormat::Depth32Float, wgt::DepthBiasState::default());
        assert_eq!(state.depth_compare, wgt::CompareFunction::Always);
        assert!(!state.depth_write_enabled);
    }
}

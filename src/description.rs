//! Pipeline state description
//!
//! A description is the value callers build to ask for a pipeline state. It
//! compares structurally, including the ordered input layout, and its hash is
//! a fixed mix of per-field hashes so equal descriptions always land on the
//! same cache key.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use wgpu_types as wgt;

use crate::bytecode::EffectBytecode;
use crate::error::Result;
use crate::input_layout::{self, InputElementDescription};
use crate::output::RenderOutputDescription;
use crate::root_signature::RootSignature;
use crate::state::{BlendStateDescription, DepthStencilStateDescription, RasterizerStateDescription};

/// Multiplier used when folding field hashes together
const HASH_MULTIPLIER: u64 = 397;

/// Everything needed to build one pipeline state
///
/// `Clone` gives an independent copy: the input layout vector is copied
/// element by element and the signature/bytecode references are shared.
#[derive(Debug, Clone)]
pub struct PipelineStateDescription {
    pub root_signature: Option<Arc<RootSignature>>,
    pub effect_bytecode: Option<Arc<EffectBytecode>>,
    pub blend_state: BlendStateDescription,
    pub sample_mask: u32,
    pub rasterizer_state: RasterizerStateDescription,
    pub depth_stencil_state: DepthStencilStateDescription,
    /// `None` means no input layout at all, which differs from an empty one
    pub input_elements: Option<Vec<InputElementDescription>>,
    pub primitive_type: wgt::PrimitiveTopology,
    pub output: RenderOutputDescription,
}

impl Default for PipelineStateDescription {
    fn default() -> Self {
        Self {
            root_signature: None,
            effect_bytecode: None,
            blend_state: BlendStateDescription::default(),
            sample_mask: 0xFFFF_FFFF,
            rasterizer_state: RasterizerStateDescription::default(),
            depth_stencil_state: DepthStencilStateDescription::default(),
            input_elements: None,
            primitive_type: wgt::PrimitiveTopology::TriangleList,
            output: RenderOutputDescription::default(),
        }
    }
}

impl PipelineStateDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset blend, rasterizer and depth-stencil state to their defaults
    ///
    /// Every other field is left untouched.
    pub fn set_defaults(&mut self) {
        self.blend_state.set_defaults();
        self.rasterizer_state.set_defaults();
        self.depth_stencil_state.set_defaults();
    }

    /// Order-sensitive hash of every field
    ///
    /// Stable for the lifetime of the process; not meant to be persisted.
    pub fn hash_code(&self) -> u64 {
        let mut hash = self.root_signature.as_deref().map_or(0, field_hash);
        let mut mix = |value: u64| hash = hash.wrapping_mul(HASH_MULTIPLIER) ^ value;

        mix(self.effect_bytecode.as_deref().map_or(0, field_hash));
        mix(field_hash(&self.blend_state));
        mix(u64::from(self.sample_mask));
        mix(field_hash(&self.rasterizer_state));
        mix(field_hash(&self.depth_stencil_state));
        if let Some(elements) = &self.input_elements {
            for element in elements {
                mix(field_hash(element));
            }
        }
        mix(field_hash(&self.primitive_type));
        mix(field_hash(&self.output));

        hash
    }

    /// Rejects descriptions the factory could never build
    pub fn validate(&self) -> Result<()> {
        if let Some(elements) = &self.input_elements {
            input_layout::validate(elements)?;
        }
        self.output.validate()
    }

    /// Number of vertex buffer slots the input layout uses
    pub fn input_binding_count(&self) -> u32 {
        self.input_elements
            .as_deref()
            .map_or(0, input_layout::input_binding_count)
    }
}

fn field_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Equal when both are absent, share an allocation, or hold equal values
fn same_reference<T: PartialEq>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b) || **a == **b,
        _ => false,
    }
}

impl PartialEq for PipelineStateDescription {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }

        same_reference(&self.root_signature, &other.root_signature)
            && same_reference(&self.effect_bytecode, &other.effect_bytecode)
            && self.blend_state == other.blend_state
            && self.sample_mask == other.sample_mask
            && self.rasterizer_state == other.rasterizer_state
            && self.depth_stencil_state == other.depth_stencil_state
            && self.primitive_type == other.primitive_type
            && self.output == other.output
            && self.input_elements.as_deref() == other.input_elements.as_deref()
    }
}

impl Eq for PipelineStateDescription {}

impl Hash for PipelineStateDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::ShaderStageBytecode;

    fn effect() -> Arc<EffectBytecode> {
        Arc::new(EffectBytecode::new([
            ShaderStageBytecode::new(wgt::ShaderStages::VERTEX, "vs_main", vec![0x07, 0x23]),
            ShaderStageBytecode::new(wgt::ShaderStages::FRAGMENT, "fs_main", vec![0x02, 0x03]),
        ]))
    }

    fn textured() -> PipelineStateDescription {
        PipelineStateDescription {
            effect_bytecode: Some(effect()),
            input_elements: Some(vec![
                InputElementDescription::new("POSITION", 0, wgt::VertexFormat::Float32x3),
                InputElementDescription::new("TEXCOORD", 0, wgt::VertexFormat::Float32x2),
            ]),
            output: RenderOutputDescription::new(
                wgt::TextureFormat::Rgba8UnormSrgb,
                Some(wgt::TextureFormat::Depth24Plus),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_equal_descriptions_hash_equal() {
        let a = textured();
        let b = textured();

        // Separate bytecode allocations with equal content
        assert!(!Arc::ptr_eq(
            a.effect_bytecode.as_ref().unwrap(),
            b.effect_bytecode.as_ref().unwrap()
        ));
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());
        assert_eq!(a.hash_code(), a.clone().hash_code());
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_sample_mask_distinguishes() {
        let a = textured();
        let mut b = textured();
        b.sample_mask = 0x0000_FFFF;

        assert_ne!(a, b);
        assert_ne!(a.hash_code(), b.hash_code());
    }

    #[test]
    fn test_absent_and_empty_layouts_differ() {
        let mut absent = textured();
        absent.input_elements = None;
        let mut empty = textured();
        empty.input_elements = Some(Vec::new());

        assert_ne!(absent, empty);
        assert_eq!(absent.input_binding_count(), 0);
        assert_eq!(empty.input_binding_count(), 0);
    }

    #[test]
    fn test_input_element_order_matters() {
        let a = textured();
        let mut b = textured();
        b.input_elements.as_mut().unwrap().reverse();

        assert_ne!(a, b);
        assert_ne!(a.hash_code(), b.hash_code());
    }

    #[test]
    fn test_longer_layout_is_not_equal() {
        let a = textured();
        let mut b = textured();
        b.input_elements
            .as_mut()
            .unwrap()
            .push(InputElementDescription::new("COLOR", 0, wgt::VertexFormat::Unorm8x4));

        assert_ne!(a, b);
        assert_ne!(b, a);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = textured();
        let mut copy = original.clone();
        copy.input_elements.as_mut().unwrap()[0].format = wgt::VertexFormat::Float32x4;

        assert_eq!(
            original.input_elements.as_ref().unwrap()[0].format,
            wgt::VertexFormat::Float32x3
        );
        assert_ne!(original, copy);
        // References are shared, not copied
        assert!(Arc::ptr_eq(
            original.effect_bytecode.as_ref().unwrap(),
            copy.effect_bytecode.as_ref().unwrap()
        ));
    }

    #[test]
    fn test_set_defaults_only_touches_state_blocks() {
        let mut description = textured();
        description.sample_mask = 0xF0F0_F0F0;
        description.blend_state = BlendStateDescription::alpha_blend();
        description.rasterizer_state = RasterizerStateDescription::wireframe();
        description.depth_stencil_state = DepthStencilStateDescription::none();

        description.set_defaults();

        assert_eq!(description.blend_state, BlendStateDescription::default());
        assert_eq!(description.rasterizer_state, RasterizerStateDescription::default());
        assert_eq!(description.depth_stencil_state, DepthStencilStateDescription::default());
        assert_eq!(description.sample_mask, 0xF0F0_F0F0);
        assert!(description.effect_bytecode.is_some());
        assert_eq!(description.input_binding_count(), 1);
    }

    #[test]
    fn test_missing_reference_differs_from_present() {
        let a = textured();
        let mut b = textured();
        b.effect_bytecode = None;
        assert_ne!(a, b);

        let mut c = textured();
        c.root_signature = Some(Arc::new(RootSignature::default()));
        assert_ne!(a, c);
    }

    #[test]
    fn test_validate_reports_layout_errors() {
        let mut description = textured();
        assert!(description.validate().is_ok());

        description
            .input_elements
            .as_mut()
            .unwrap()
            .push(InputElementDescription::new("POSITION", 0, wgt::VertexFormat::Float32x3));
        assert!(description.validate().is_err());
    }
}

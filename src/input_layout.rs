//! Vertex input layout
//!
//! Input elements are declared in order; each names a vertex buffer slot and
//! either an explicit byte offset inside that slot or `None` to be placed
//! after the furthest byte used so far in that slot, aligned to the
//! element's format. All elements of one slot share a step mode and rate.

use smallvec::SmallVec;
use wgpu_types as wgt;

use crate::error::{PipelineStateError, Result};

/// Maximum number of vertex buffer slots
pub const MAX_VERTEX_BUFFERS: u32 = 16;
/// Maximum number of input elements in one layout
pub const MAX_VERTEX_ATTRIBUTES: usize = 32;

/// One vertex attribute as declared by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputElementDescription {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: wgt::VertexFormat,
    pub input_slot: u32,
    /// `None` appends after the furthest byte used so far in the same slot
    pub aligned_byte_offset: Option<u32>,
    pub step_mode: wgt::VertexStepMode,
    /// Instances drawn per element advance; only meaningful for instance stepping
    pub instance_data_step_rate: u32,
}

impl InputElementDescription {
    /// Per-vertex element in slot 0, appended after the previous one
    pub fn new(semantic_name: impl Into<String>, semantic_index: u32, format: wgt::VertexFormat) -> Self {
        Self {
            semantic_name: semantic_name.into(),
            semantic_index,
            format,
            input_slot: 0,
            aligned_byte_offset: None,
            step_mode: wgt::VertexStepMode::Vertex,
            instance_data_step_rate: 0,
        }
    }

    pub fn with_slot(mut self, input_slot: u32) -> Self {
        self.input_slot = input_slot;
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.aligned_byte_offset = Some(offset);
        self
    }

    pub fn per_instance(mut self, step_rate: u32) -> Self {
        self.step_mode = wgt::VertexStepMode::Instance;
        self.instance_data_step_rate = step_rate;
        self
    }
}

/// Resolved layout of one vertex buffer slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub slot: u32,
    pub array_stride: u64,
    pub step_mode: wgt::VertexStepMode,
    pub attributes: Vec<wgt::VertexAttribute>,
}

/// Number of distinct vertex buffer slots used by the elements
pub fn input_binding_count(elements: &[InputElementDescription]) -> u32 {
    let mut slots: SmallVec<[u32; 8]> = elements.iter().map(|e| e.input_slot).collect();
    slots.sort_unstable();
    slots.dedup();
    slots.len() as u32
}

/// Checks an input layout for problems the factory would otherwise hit late
pub fn validate(elements: &[InputElementDescription]) -> Result<()> {
    if elements.len() > MAX_VERTEX_ATTRIBUTES {
        return Err(PipelineStateError::invalid_description(
            "input_elements",
            format!("{} elements exceeds the limit of {}", elements.len(), MAX_VERTEX_ATTRIBUTES),
        ));
    }

    for (index, element) in elements.iter().enumerate() {
        let field = || format!("input_elements[{}]", index);

        if element.semantic_name.is_empty() {
            return Err(PipelineStateError::invalid_description(field(), "empty semantic name"));
        }
        if element.input_slot >= MAX_VERTEX_BUFFERS {
            return Err(PipelineStateError::invalid_description(
                field(),
                format!("input slot {} exceeds the limit of {}", element.input_slot, MAX_VERTEX_BUFFERS - 1),
            ));
        }
        if element.step_mode == wgt::VertexStepMode::Instance && element.instance_data_step_rate == 0 {
            return Err(PipelineStateError::invalid_description(
                field(),
                "instance stepped element with a step rate of 0",
            ));
        }

        let mismatched = elements[..index].iter().find(|previous| {
            previous.input_slot == element.input_slot
                && (previous.step_mode != element.step_mode
                    || (element.step_mode == wgt::VertexStepMode::Instance
                        && previous.instance_data_step_rate != element.instance_data_step_rate))
        });
        if let Some(previous) = mismatched {
            return Err(PipelineStateError::invalid_description(
                field(),
                format!(
                    "slot {} mixes step mode {:?}/{} with {:?}/{}",
                    element.input_slot,
                    previous.step_mode,
                    previous.instance_data_step_rate,
                    element.step_mode,
                    element.instance_data_step_rate
                ),
            ));
        }

        let duplicate = elements[..index].iter().any(|previous| {
            previous.semantic_index == element.semantic_index
                && previous.semantic_name.eq_ignore_ascii_case(&element.semantic_name)
        });
        if duplicate {
            return Err(PipelineStateError::invalid_description(
                field(),
                format!("duplicate semantic {}{}", element.semantic_name, element.semantic_index),
            ));
        }
    }

    Ok(())
}

/// Groups elements into per-slot buffer layouts, ordered by slot
///
/// Shader locations follow declaration order. Strides are rounded up to 4
/// bytes as wgpu requires.
pub fn vertex_buffer_layouts(elements: &[InputElementDescription]) -> SmallVec<[VertexBufferLayout; 4]> {
    let mut layouts: SmallVec<[VertexBufferLayout; 4]> = SmallVec::new();

    for (location, element) in elements.iter().enumerate() {
        let position = match layouts.iter().position(|l| l.slot == element.input_slot) {
            Some(position) => position,
            None => {
                layouts.push(VertexBufferLayout {
                    slot: element.input_slot,
                    array_stride: 0,
                    step_mode: element.step_mode,
                    attributes: Vec::new(),
                });
                layouts.len() - 1
            }
        };
        let layout = &mut layouts[position];

        // Append-aligned elements follow the furthest byte used so far,
        // rounded up to min(4, format size)
        let offset = match element.aligned_byte_offset {
            Some(offset) => u64::from(offset),
            None => {
                let alignment = element.format.size().min(4);
                layout.array_stride.div_ceil(alignment) * alignment
            }
        };
        layout.attributes.push(wgt::VertexAttribute {
            format: element.format,
            offset,
            shader_location: location as u32,
        });
        layout.array_stride = layout.array_stride.max(offset + element.format.size());
    }

    for layout in layouts.iter_mut() {
        layout.array_stride = (layout.array_stride + 3) & !3;
    }
    layouts.sort_by_key(|l| l.slot);
    layouts
}

//! Render output formats

use wgpu_types as wgt;

use crate::error::{PipelineStateError, Result};
use crate::state::MAX_RENDER_TARGETS;

/// Formats of the attachments a pipeline renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderOutputDescription {
    pub render_target_count: u32,
    pub render_target_formats: [Option<wgt::TextureFormat>; MAX_RENDER_TARGETS],
    pub depth_stencil_format: Option<wgt::TextureFormat>,
    pub multisample_count: u32,
    pub scissor_test_enable: bool,
}

impl Default for RenderOutputDescription {
    fn default() -> Self {
        Self {
            render_target_count: 0,
            render_target_formats: [None; MAX_RENDER_TARGETS],
            depth_stencil_format: None,
            multisample_count: 1,
            scissor_test_enable: false,
        }
    }
}

impl RenderOutputDescription {
    /// One color target with an optional depth attachment
    pub fn new(color: wgt::TextureFormat, depth: Option<wgt::TextureFormat>) -> Self {
        let mut output = Self {
            depth_stencil_format: depth,
            ..Default::default()
        };
        output.render_target_count = 1;
        output.render_target_formats[0] = Some(color);
        output
    }

    /// One color target, no depth
    pub fn single(color: wgt::TextureFormat) -> Self {
        Self::new(color, None)
    }

    pub fn with_multisample_count(mut self, count: u32) -> Self {
        self.multisample_count = count;
        self
    }

    /// The formats of the active color targets
    pub fn render_target_formats(&self) -> impl Iterator<Item = wgt::TextureFormat> + '_ {
        self.render_target_formats
            .iter()
            .take(self.render_target_count as usize)
            .flatten()
            .copied()
    }

    pub fn validate(&self) -> Result<()> {
        let count = self.render_target_count as usize;
        if count > MAX_RENDER_TARGETS {
            return Err(PipelineStateError::invalid_description(
                "output.render_target_count",
                format!("{} exceeds the limit of {}", count, MAX_RENDER_TARGETS),
            ));
        }
        for (index, format) in self.render_target_formats.iter().enumerate() {
            match (index < count, format) {
                (true, None) => {
                    return Err(PipelineStateError::invalid_description(
                        format!("output.render_target_formats[{}]", index),
                        "active render target has no format",
                    ))
                }
                (false, Some(_)) => {
                    return Err(PipelineStateError::invalid_description(
                        format!("output.render_target_formats[{}]", index),
                        format!("format set beyond render_target_count {}", count),
                    ))
                }
                _ => {}
            }
        }
        if self.multisample_count == 0 {
            return Err(PipelineStateError::invalid_description(
                "output.multisample_count",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_target() {
        let output = RenderOutputDescription::new(
            wgt::TextureFormat::Bgra8UnormSrgb,
            Some(wgt::TextureFormat::Depth32Float),
        );
        assert!(output.validate().is_ok());
        let formats: Vec<_> = output.render_target_formats().collect();
        assert_eq!(formats, vec![wgt::TextureFormat::Bgra8UnormSrgb]);
    }

    #[test]
    fn test_empty_output_is_valid() {
        assert!(RenderOutputDescription::default().validate().is_ok());
    }

    #[test]
    fn test_count_and_formats_must_agree() {
        let mut output = RenderOutputDescription::single(wgt::TextureFormat::Rgba8Unorm);
        output.render_target_count = 2;
        assert!(output.validate().is_err());

        output.render_target_count = 0;
        assert!(output.validate().is_err());

        output.render_target_count = 9;
        assert!(output.validate().is_err());
    }

    #[test]
    fn test_zero_samples_rejected() {
        let output = RenderOutputDescription::single(wgt::TextureFormat::Rgba8Unorm).with_multisample_count(0);
        assert!(output.validate().is_err());
    }
}

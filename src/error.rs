//! Error types for the pipeline state cache
//!
//! Three families of failure reach callers: the native factory refusing to
//! build a configuration, a description that is malformed before it ever
//! reaches the factory, and reference-count misuse.

use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline state operations
pub type Result<T> = std::result::Result<T, PipelineStateError>;

/// Main error type for the pipeline state cache
#[derive(Error, Debug)]
pub enum PipelineStateError {
    // === Construction errors ===
    #[error("Pipeline state construction failed: {pipeline}: {reason}")]
    Construction {
        pipeline: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported format {format} for {usage}")]
    UnsupportedFormat { format: String, usage: String },

    // === Description errors ===
    #[error("Invalid pipeline state description: {field}: {reason}")]
    InvalidDescription { field: String, reason: String },

    // === Lifecycle errors ===
    #[error("Pipeline state released more times than acquired (count was {count})")]
    ReleaseUnderflow { count: u32 },
}

// Helper constructors for common error patterns
impl PipelineStateError {
    /// Create a construction error without an underlying cause
    pub fn construction(pipeline: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Construction {
            pipeline: pipeline.to_string(),
            reason: reason.to_string(),
            source: None,
        }
    }

    /// Create a construction error wrapping a backend error
    pub fn construction_with_source(
        pipeline: impl fmt::Display,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Construction {
            pipeline: pipeline.to_string(),
            reason: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid description error
    pub fn invalid_description(field: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::InvalidDescription {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an unsupported format error
    pub fn unsupported_format(format: impl fmt::Debug, usage: impl fmt::Display) -> Self {
        Self::UnsupportedFormat {
            format: format!("{:?}", format),
            usage: usage.to_string(),
        }
    }

    /// Whether the error came from the native factory rather than the caller
    pub fn is_construction_failure(&self) -> bool {
        matches!(self, Self::Construction { .. } | Self::UnsupportedFormat { .. })
    }
}

//! Error taxonomy for the editing engine.
//!
//! An empty detection or merge region is not an error: it is reported as
//! [`crate::engine::merge::MergeOutcome::EmptyRegion`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A configuration value or gap-filling level could not be coerced.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A buffer does not share the dimensions of the base image.
    #[error("mask is {found:?} (height, width) but the base image is {expected:?}")]
    MalformedMask {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Contour tracing gave up on a pathological mask.
    #[error("detection pass failed: {0}")]
    DetectionFailed(String),

    #[error("configuration could not be parsed: {0}")]
    Config(#[from] toml::de::Error),
}

impl EngineError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

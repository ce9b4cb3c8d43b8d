//! Error types shared by the extraction entry points.
//!
//! Internal reads never fail; only the top-level decode functions surface a
//! typed error to the caller.

use thiserror::Error;

/// Result type for extraction entry points
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Failures a caller of the decode entry points can observe.
///
/// Malformed input below the top level never raises: bounds failures clamp
/// or yield zero values, and speculative parses that come up empty simply
/// fall through to the next strategy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// Input buffer is too short to even hold a container header
    #[error("Input too short: required at least {required} bytes, got {actual} bytes")]
    InputTooShort { required: usize, actual: usize },

    /// Every drawable-location strategy exhausted without usable geometry
    #[error("No drawable geometry found in input")]
    NoGeometryFound,

    /// No texture dictionary could be located, or every entry was rejected
    #[error("No textures found in input")]
    NoTexturesFound,
}

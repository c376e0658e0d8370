//! Animation error types

use thiserror::Error;

/// Malformed animation configuration
///
/// Raised while an [`Animation`](crate::Animation) is being constructed, before
/// any frame is scheduled. Sampling never produces these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Fewer than two keyframes were supplied
    #[error("at least 2 keyframes are required, got {count}")]
    TooFewKeyframes { count: usize },

    /// A keyframe value is NaN or infinite
    #[error("keyframe {index} is not a finite number")]
    InvalidKeyframe { index: usize },

    /// An easing list does not have one entry per segment
    #[error("easing list has {actual} entries but the keyframes form {expected} segments")]
    EasingCountMismatch { expected: usize, actual: usize },

    /// An offset list does not have one entry per keyframe
    #[error("offset list has {actual} entries but there are {expected} keyframes")]
    OffsetCountMismatch { expected: usize, actual: usize },

    /// An offset lies outside [0, 1]
    #[error("offset {index} ({value}) is outside [0, 1]")]
    OffsetOutOfRange { index: usize, value: f64 },

    /// An offset is smaller than its predecessor
    #[error("offset {index} is smaller than the offset before it")]
    NonMonotonicOffsets { index: usize },

    /// A duration given in seconds is negative or not finite
    #[error("duration of {seconds}s must be finite and non-negative")]
    InvalidDuration { seconds: f64 },

    /// An easing could not be parsed or has out-of-range parameters
    #[error("invalid easing: {0}")]
    InvalidEasing(String),
}

/// Marker the completion signal is rejected with when an animation is cancelled
///
/// This is not a fault: callers awaiting completion should treat it as
/// "the animation did not run to its end".
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("animation was cancelled")]
pub struct Cancelled;

/// Result type for animation construction
pub type Result<T> = std::result::Result<T, ConfigError>;

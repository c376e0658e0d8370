//! Cadence Animation
//!
//! Time-driven keyframe interpolation for a single numeric value.
//!
//! # Features
//!
//! - **Easing**: CSS-style curves, cubic-bezier, steps, per-segment lists
//! - **Easing Generators**: Springs (or your own) reshape keyframes and duration
//! - **Timing**: Delay, end delay, repeat and alternating directions
//! - **Playback Control**: Play, pause, finish, cancel, reverse, seek and rate
//! - **Injected Clock**: Frames come from a [`FrameClock`], so tests run deterministically

pub mod animation;
pub mod completion;
pub mod easing;
pub mod error;
pub mod interpolate;
pub mod options;
pub mod scheduler;
pub mod spring;
pub mod timing;

pub use animation::{Animation, PlayState};
pub use completion::{Completion, CompletionState, Finished};
pub use easing::{
    Easing, EasingGenerator, EasingSpec, GeneratedAnimation, GeneratorInput, SegmentEasing,
    StepPosition,
};
pub use error::{Cancelled, ConfigError, Result};
pub use interpolate::Interpolator;
pub use options::AnimationOptions;
pub use scheduler::{FrameCallback, FrameClock, FrameId, FrameScheduler};
pub use spring::{Spring, SpringConfig, SpringGenerator, SpringPreset};
pub use timing::{Direction, TimingConfig, TimingSample};

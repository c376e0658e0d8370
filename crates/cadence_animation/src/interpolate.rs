//! Keyframe interpolation
//!
//! An [`Interpolator`] maps normalized progress in [0, 1] to an output
//! value by locating the keyframe segment that contains the progress,
//! easing the progress within that segment and blending the two keyframes.

use crate::easing::{Easing, SegmentEasing};
use crate::error::{ConfigError, Result};
use smallvec::SmallVec;

type Values = SmallVec<[f64; 8]>;

/// Evenly spaced offsets for `count` keyframes: `[0, 1/(n-1), ..., 1]`
pub fn default_offsets(count: usize) -> Values {
    match count {
        0 => Values::new(),
        1 => smallvec::smallvec![0.0],
        _ => {
            let last = (count - 1) as f64;
            (0..count).map(|i| i as f64 / last).collect()
        }
    }
}

/// Linear interpolation of scalars
#[inline]
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

#[derive(Clone, Debug, PartialEq)]
enum Kind {
    /// Two keyframes, evenly spaced, one easing
    Pair { from: f64, to: f64, easing: Easing },
    Segments {
        keyframes: Values,
        offsets: Values,
        easing: SegmentEasing,
    },
}

/// Progress-to-value function built once per animation
#[derive(Clone, Debug, PartialEq)]
pub struct Interpolator {
    kind: Kind,
}

impl Interpolator {
    /// Build an interpolator, validating keyframes, offsets and easing count
    pub fn new(keyframes: &[f64], offsets: Option<&[f64]>, easing: SegmentEasing) -> Result<Self> {
        if keyframes.len() < 2 {
            return Err(ConfigError::TooFewKeyframes {
                count: keyframes.len(),
            });
        }
        if let Some(index) = keyframes.iter().position(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidKeyframe { index });
        }
        if let SegmentEasing::PerSegment(list) = &easing {
            if list.len() != keyframes.len() - 1 {
                return Err(ConfigError::EasingCountMismatch {
                    expected: keyframes.len() - 1,
                    actual: list.len(),
                });
            }
        }
        if let Some(offsets) = offsets {
            validate_offsets(offsets, keyframes.len())?;
        }

        let evenly_spaced = offsets.map_or(true, |o| o == [0.0, 1.0]);
        if keyframes.len() == 2 && evenly_spaced {
            return Ok(Self {
                kind: Kind::Pair {
                    from: keyframes[0],
                    to: keyframes[1],
                    easing: easing.for_segment(0),
                },
            });
        }

        Ok(Self {
            kind: Kind::Segments {
                keyframes: keyframes.iter().copied().collect(),
                offsets: offsets
                    .map(|o| o.iter().copied().collect())
                    .unwrap_or_else(|| default_offsets(keyframes.len())),
                easing,
            },
        })
    }

    /// Sample the output value at `progress`; progress outside [0, 1] is clamped
    pub fn sample(&self, progress: f64) -> f64 {
        let progress = progress.clamp(0.0, 1.0);

        match &self.kind {
            Kind::Pair { from, to, easing } => lerp(*from, *to, easing.apply(progress)),
            Kind::Segments {
                keyframes,
                offsets,
                easing,
            } => {
                let index = segment_index(offsets, progress);
                let start = offsets[index];
                let width = offsets[index + 1] - start;
                let local = if width > 0.0 {
                    ((progress - start) / width).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let eased = easing.for_segment(index).apply(local);
                lerp(keyframes[index], keyframes[index + 1], eased)
            }
        }
    }

    /// Number of segments between keyframes
    pub fn segment_count(&self) -> usize {
        match &self.kind {
            Kind::Pair { .. } => 1,
            Kind::Segments { keyframes, .. } => keyframes.len() - 1,
        }
    }
}

/// Index of the segment `[offsets[i], offsets[i + 1]]` holding `progress`;
/// the last segment includes progress = 1
fn segment_index(offsets: &[f64], progress: f64) -> usize {
    let at_or_before = offsets.partition_point(|offset| *offset <= progress);
    at_or_before.saturating_sub(1).min(offsets.len() - 2)
}

fn validate_offsets(offsets: &[f64], keyframe_count: usize) -> Result<()> {
    if offsets.len() != keyframe_count {
        return Err(ConfigError::OffsetCountMismatch {
            expected: keyframe_count,
            actual: offsets.len(),
        });
    }
    for (index, value) in offsets.iter().copied().enumerate() {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::OffsetOutOfRange { index, value });
        }
        if index > 0 && value < offsets[index - 1] {
            return Err(ConfigError::NonMonotonicOffsets { index });
        }
    }
    Ok(())
}

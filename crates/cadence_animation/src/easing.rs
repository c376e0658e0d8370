//! Easing functions and easing resolution
//!
//! An easing maps linear progress in [0, 1] to eased progress. Animations
//! accept an [`EasingSpec`]: one easing for every segment, one easing per
//! segment, or an [`EasingGenerator`] that computes its own easing and may
//! rewrite the keyframes and duration (spring physics, for example).

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Where a `steps()` easing jumps
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepPosition {
    /// Jump at the start of each step
    Start,
    /// Jump at the end of each step
    #[default]
    End,
}

/// Easing function type
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum Easing {
    #[default]
    Linear,
    /// CSS `ease`, cubic-bezier(0.25, 0.1, 0.25, 1)
    Ease,
    /// CSS `ease-in`, cubic-bezier(0.42, 0, 1, 1)
    EaseIn,
    /// CSS `ease-out`, cubic-bezier(0, 0, 0.58, 1)
    EaseOut,
    /// CSS `ease-in-out`, cubic-bezier(0.42, 0, 0.58, 1)
    EaseInOut,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    CubicBezier(f64, f64, f64, f64),
    Steps(u32, StepPosition),
}

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::Ease => cubic_bezier_ease(t, 0.25, 0.1, 0.25, 1.0),
            Easing::EaseIn => cubic_bezier_ease(t, 0.42, 0.0, 1.0, 1.0),
            Easing::EaseOut => cubic_bezier_ease(t, 0.0, 0.0, 0.58, 1.0),
            Easing::EaseInOut => cubic_bezier_ease(t, 0.42, 0.0, 0.58, 1.0),
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
            Easing::Steps(steps, position) => steps_ease(t, *steps, *position),
        }
    }

    /// Check parameters of the parametric easings
    pub fn validate(&self) -> Result<()> {
        match *self {
            Easing::CubicBezier(x1, y1, x2, y2) => {
                let finite = [x1, y1, x2, y2].iter().all(|v| v.is_finite());
                if !finite || !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
                    return Err(ConfigError::InvalidEasing(format!(
                        "cubic-bezier x control points must lie in [0, 1], got ({x1}, {y1}, {x2}, {y2})"
                    )));
                }
                Ok(())
            }
            Easing::Steps(0, _) => Err(ConfigError::InvalidEasing(
                "steps() needs at least one step".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl FromStr for Easing {
    type Err = ConfigError;

    /// Parse a CSS-like easing string such as `ease-out`,
    /// `cubic-bezier(0.2, 0, 0, 1)` or `steps(4, start)`
    fn from_str(s: &str) -> Result<Self> {
        let src = s.trim().to_ascii_lowercase();
        let invalid = || ConfigError::InvalidEasing(s.to_string());

        let easing = match src.as_str() {
            "linear" => Easing::Linear,
            "ease" => Easing::Ease,
            "ease-in" => Easing::EaseIn,
            "ease-out" => Easing::EaseOut,
            "ease-in-out" => Easing::EaseInOut,
            "ease-in-quad" => Easing::EaseInQuad,
            "ease-out-quad" => Easing::EaseOutQuad,
            "ease-in-out-quad" => Easing::EaseInOutQuad,
            "ease-in-cubic" => Easing::EaseInCubic,
            "ease-out-cubic" => Easing::EaseOutCubic,
            "ease-in-out-cubic" => Easing::EaseInOutCubic,
            "ease-in-quart" => Easing::EaseInQuart,
            "ease-out-quart" => Easing::EaseOutQuart,
            "ease-in-out-quart" => Easing::EaseInOutQuart,
            "step-start" => Easing::Steps(1, StepPosition::Start),
            "step-end" => Easing::Steps(1, StepPosition::End),
            _ => {
                if let Some(args) = function_args(&src, "cubic-bezier") {
                    let values: SmallVec<[f64; 4]> = args
                        .split(',')
                        .map(|a| a.trim().parse::<f64>())
                        .collect::<std::result::Result<_, _>>()
                        .map_err(|_| invalid())?;
                    match values.as_slice() {
                        [x1, y1, x2, y2] => Easing::CubicBezier(*x1, *y1, *x2, *y2),
                        _ => return Err(invalid()),
                    }
                } else if let Some(args) = function_args(&src, "steps") {
                    let mut parts = args.split(',').map(str::trim);
                    let count = parts
                        .next()
                        .and_then(|n| n.parse::<u32>().ok())
                        .ok_or_else(invalid)?;
                    let position = match parts.next() {
                        None | Some("end") | Some("jump-end") => StepPosition::End,
                        Some("start") | Some("jump-start") => StepPosition::Start,
                        Some(_) => return Err(invalid()),
                    };
                    if parts.next().is_some() {
                        return Err(invalid());
                    }
                    Easing::Steps(count, position)
                } else {
                    return Err(invalid());
                }
            }
        };

        easing.validate()?;
        Ok(easing)
    }
}

impl TryFrom<String> for Easing {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Return the text between `name(` and the closing `)`
fn function_args<'a>(src: &'a str, name: &str) -> Option<&'a str> {
    src.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn steps_ease(t: f64, steps: u32, position: StepPosition) -> f64 {
    let steps = steps.max(1) as f64;
    let stepped = match position {
        StepPosition::Start => (t * steps).ceil(),
        StepPosition::End => (t * steps).floor(),
    };
    (stepped / steps).clamp(0.0, 1.0)
}

/// Cubic bezier easing calculation (matches CSS spec / browser implementations).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    // Endpoints are always exact
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let x = t;

    // Solve for parameter `p` where bezier_x(p) == x using Newton-Raphson,
    // falling back to binary search if the slope is too flat.
    let mut p = x;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2);
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    // Binary search fallback (always converges)
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-7 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2)
}

/// Evaluate cubic bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

/// Derivative of cubic bezier: B'(t) = 3(1-t)²·p1 + 6(1-t)t·(p2-p1) + 3t²·(1-p2)
#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

// ============================================================================
// Easing generators
// ============================================================================

/// What an easing generator is given
#[derive(Clone, Copy, Debug)]
pub struct GeneratorInput<'a> {
    /// The caller's keyframes
    pub keyframes: &'a [f64],
    /// The caller's duration
    pub duration: Duration,
}

/// What an easing generator hands back
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedAnimation {
    /// Easing to use in place of the generator
    pub easing: SegmentEasing,
    /// Replacement keyframes, if the generator reshapes the motion
    pub keyframes: Option<Vec<f64>>,
    /// Replacement duration, if the generator dictates its own timing
    pub duration: Option<Duration>,
}

/// A capability that computes its own easing, and optionally its own
/// keyframes and duration, from the caller's inputs
///
/// Called exactly once while an animation is constructed.
pub trait EasingGenerator: Send + Sync {
    fn create_animation(&self, input: GeneratorInput<'_>) -> GeneratedAnimation;
}

/// Easing as supplied by the caller
#[derive(Clone)]
pub enum EasingSpec {
    /// One easing applied within every segment
    Single(Easing),
    /// One easing per segment (`keyframes.len() - 1` entries)
    PerSegment(Vec<Easing>),
    /// Generator consulted once at construction
    Generator(Arc<dyn EasingGenerator>),
}

impl Default for EasingSpec {
    fn default() -> Self {
        EasingSpec::Single(Easing::Ease)
    }
}

impl fmt::Debug for EasingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EasingSpec::Single(easing) => f.debug_tuple("Single").field(easing).finish(),
            EasingSpec::PerSegment(list) => f.debug_tuple("PerSegment").field(list).finish(),
            EasingSpec::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

impl From<Easing> for EasingSpec {
    fn from(easing: Easing) -> Self {
        EasingSpec::Single(easing)
    }
}

impl From<Vec<Easing>> for EasingSpec {
    fn from(list: Vec<Easing>) -> Self {
        EasingSpec::PerSegment(list)
    }
}

impl EasingSpec {
    /// Wrap a generator
    pub fn generator(generator: impl EasingGenerator + 'static) -> Self {
        EasingSpec::Generator(Arc::new(generator))
    }
}

/// Easing after resolution, ready for the interpolator
#[derive(Clone, Debug, PartialEq)]
pub enum SegmentEasing {
    Uniform(Easing),
    PerSegment(SmallVec<[Easing; 4]>),
}

impl SegmentEasing {
    /// Easing to apply within segment `index`
    #[inline]
    pub fn for_segment(&self, index: usize) -> Easing {
        match self {
            SegmentEasing::Uniform(easing) => *easing,
            SegmentEasing::PerSegment(list) => list.get(index).copied().unwrap_or_default(),
        }
    }
}

/// Output of [`resolve`]: the easing plus the keyframes and duration it applies to
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedEasing {
    pub easing: SegmentEasing,
    pub keyframes: Vec<f64>,
    pub duration: Duration,
}

/// Turn an [`EasingSpec`] into concrete per-segment easing
///
/// A generator runs here, once, and may replace `keyframes` and `duration`
/// before anything else sees them. A per-segment list must have exactly one
/// entry per segment of the final keyframes.
pub fn resolve(spec: &EasingSpec, keyframes: &[f64], duration: Duration) -> Result<ResolvedEasing> {
    let (easing, keyframes, duration) = match spec {
        EasingSpec::Single(easing) => (SegmentEasing::Uniform(*easing), keyframes.to_vec(), duration),
        EasingSpec::PerSegment(list) => (
            SegmentEasing::PerSegment(list.iter().copied().collect()),
            keyframes.to_vec(),
            duration,
        ),
        EasingSpec::Generator(generator) => {
            let generated = generator.create_animation(GeneratorInput { keyframes, duration });
            tracing::debug!(
                replaced_keyframes = generated.keyframes.is_some(),
                replaced_duration = ?generated.duration,
                "easing generator resolved"
            );
            (
                generated.easing,
                generated.keyframes.unwrap_or_else(|| keyframes.to_vec()),
                generated.duration.unwrap_or(duration),
            )
        }
    };

    match &easing {
        SegmentEasing::Uniform(easing) => easing.validate()?,
        SegmentEasing::PerSegment(list) => {
            let expected = keyframes.len().saturating_sub(1);
            if list.len() != expected {
                return Err(ConfigError::EasingCountMismatch {
                    expected,
                    actual: list.len(),
                });
            }
            for easing in list {
                easing.validate()?;
            }
        }
    }

    Ok(ResolvedEasing {
        easing,
        keyframes,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 16] = [
        Easing::Linear,
        Easing::Ease,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::EaseInQuad,
        Easing::EaseOutQuad,
        Easing::EaseInOutQuad,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
        Easing::EaseInQuart,
        Easing::EaseOutQuart,
        Easing::EaseInOutQuart,
        Easing::CubicBezier(0.2, 0.0, 0.0, 1.0),
        Easing::Steps(4, StepPosition::End),
    ];

    #[test]
    fn test_endpoints_are_exact() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-9, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_ease_in_out_is_symmetric() {
        let a = Easing::EaseInOut.apply(0.3);
        let b = Easing::EaseInOut.apply(0.7);
        assert!((a + b - 1.0).abs() < 1e-4);
        assert!((Easing::EaseInOut.apply(0.5) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_linear_bezier_matches_linear() {
        let bezier = Easing::CubicBezier(0.0, 0.0, 1.0, 1.0);
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!((bezier.apply(t) - t).abs() < 1e-5);
        }
    }

    #[test]
    fn test_steps() {
        let end = Easing::Steps(4, StepPosition::End);
        assert_eq!(end.apply(0.1), 0.0);
        assert_eq!(end.apply(0.3), 0.25);
        assert_eq!(end.apply(0.99), 0.75);

        let start = Easing::Steps(4, StepPosition::Start);
        assert_eq!(start.apply(0.1), 0.25);
        assert_eq!(start.apply(0.0), 0.0);
    }

    #[test]
    fn test_parse_named() {
        assert_eq!("linear".parse::<Easing>(), Ok(Easing::Linear));
        assert_eq!(" Ease-Out ".parse::<Easing>(), Ok(Easing::EaseOut));
        assert_eq!("ease-in-out-cubic".parse::<Easing>(), Ok(Easing::EaseInOutCubic));
        assert_eq!(
            "step-start".parse::<Easing>(),
            Ok(Easing::Steps(1, StepPosition::Start))
        );
    }

    #[test]
    fn test_parse_functions() {
        assert_eq!(
            "cubic-bezier(0.2, 0, 0, 1)".parse::<Easing>(),
            Ok(Easing::CubicBezier(0.2, 0.0, 0.0, 1.0))
        );
        assert_eq!(
            "steps(3, start)".parse::<Easing>(),
            Ok(Easing::Steps(3, StepPosition::Start))
        );
        assert_eq!(
            "steps(5)".parse::<Easing>(),
            Ok(Easing::Steps(5, StepPosition::End))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in [
            "bouncy",
            "cubic-bezier(1, 2, 3)",
            "cubic-bezier(1.5, 0, 0, 1)",
            "steps(0)",
            "steps(2, middle)",
            "steps(x)",
        ] {
            assert!(
                matches!(bad.parse::<Easing>(), Err(ConfigError::InvalidEasing(_))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_resolve_list_length_must_match_segments() {
        let spec = EasingSpec::PerSegment(vec![Easing::Linear, Easing::EaseIn]);
        let err = resolve(&spec, &[0.0, 1.0], Duration::from_secs(1)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::EasingCountMismatch {
                expected: 1,
                actual: 2
            }
        );

        let ok = resolve(&spec, &[0.0, 1.0, 0.0], Duration::from_secs(1)).unwrap();
        assert_eq!(ok.easing.for_segment(1), Easing::EaseIn);
    }

    struct Reshape;

    impl EasingGenerator for Reshape {
        fn create_animation(&self, input: GeneratorInput<'_>) -> GeneratedAnimation {
            let last = *input.keyframes.last().unwrap_or(&0.0);
            GeneratedAnimation {
                easing: SegmentEasing::Uniform(Easing::Linear),
                keyframes: Some(vec![0.0, last * 2.0, last]),
                duration: Some(input.duration * 2),
            }
        }
    }

    #[test]
    fn test_generator_rewrites_keyframes_and_duration() {
        let spec = EasingSpec::generator(Reshape);
        let resolved = resolve(&spec, &[0.0, 10.0], Duration::from_millis(300)).unwrap();
        assert_eq!(resolved.keyframes, vec![0.0, 20.0, 10.0]);
        assert_eq!(resolved.duration, Duration::from_millis(600));
        assert_eq!(resolved.easing, SegmentEasing::Uniform(Easing::Linear));
    }

    #[test]
    fn test_deserialize_from_string() {
        let easing: Easing = serde_json::from_str("\"ease-in\"").unwrap();
        assert_eq!(easing, Easing::EaseIn);
        assert!(serde_json::from_str::<Easing>("\"wobble\"").is_err());
    }
}

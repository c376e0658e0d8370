//! Spring easing
//!
//! A damped harmonic oscillator stepped with fixed-step RK4. Springs are not
//! animated frame by frame here: [`SpringGenerator`] runs the simulation
//! ahead of time and bakes the trajectory into keyframes for an ordinary
//! linear, timed animation.

use crate::easing::{Easing, EasingGenerator, GeneratedAnimation, GeneratorInput, SegmentEasing};
use serde::Deserialize;
use std::time::Duration;

/// Physical parameters of a spring
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    pub stiffness: f64,
    pub damping: f64,
    pub mass: f64,
}

impl SpringConfig {
    pub fn new(stiffness: f64, damping: f64, mass: f64) -> Self {
        Self {
            stiffness,
            damping,
            mass,
        }
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        SpringPreset::Stiff.config()
    }
}

/// Named spring tunings, written as `spring = "wobbly"` in config files
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpringPreset {
    /// Slow with a little overshoot
    Gentle,
    /// Visible bounce
    Wobbly,
    Stiff,
    Snappy,
    /// Critically damped, never overshoots
    Molasses,
}

impl SpringPreset {
    pub fn config(self) -> SpringConfig {
        let (stiffness, damping) = match self {
            SpringPreset::Gentle => (120.0, 14.0),
            SpringPreset::Wobbly => (180.0, 12.0),
            SpringPreset::Stiff => (400.0, 30.0),
            SpringPreset::Snappy => (600.0, 40.0),
            SpringPreset::Molasses => (100.0, 20.0),
        };
        SpringConfig::new(stiffness, damping, 1.0)
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Position and velocity of the simulated mass, or their rates of change
#[derive(Clone, Copy, Debug, PartialEq)]
struct Phase {
    position: f64,
    velocity: f64,
}

impl Phase {
    /// `self + rate * h`
    fn advance(self, rate: Phase, h: f64) -> Phase {
        Phase {
            position: self.position + rate.position * h,
            velocity: self.velocity + rate.velocity * h,
        }
    }
}

/// Settle thresholds for a spring travelling `distance`
///
/// Small travel distances need proportionally tighter thresholds, or a
/// spring from 0 to 1 would count as settled before it moved.
fn rest_thresholds(distance: f64) -> (f64, f64) {
    if distance.abs() > 5.0 {
        (0.5, 10.0)
    } else {
        (0.005, 0.05)
    }
}

/// A spring pulling a value from `from` towards a fixed target
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    target: f64,
    phase: Phase,
    rest_delta: f64,
    rest_speed: f64,
}

impl Spring {
    pub fn new(config: SpringConfig, from: f64, to: f64) -> Self {
        let (rest_delta, rest_speed) = rest_thresholds(to - from);
        Self {
            config,
            target: to,
            phase: Phase {
                position: from,
                velocity: 0.0,
            },
            rest_delta,
            rest_speed,
        }
    }

    /// Initial velocity in units per second
    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.phase.velocity = velocity;
        self
    }

    pub fn with_rest_thresholds(mut self, rest_delta: f64, rest_speed: f64) -> Self {
        self.rest_delta = rest_delta;
        self.rest_speed = rest_speed;
        self
    }

    pub fn position(&self) -> f64 {
        self.phase.position
    }

    /// Close enough to the target, and slow enough, to stop
    pub fn is_settled(&self) -> bool {
        (self.phase.position - self.target).abs() < self.rest_delta
            && self.phase.velocity.abs() < self.rest_speed
    }

    /// Advance the simulation by `dt` seconds
    ///
    /// A settled spring snaps onto its target and stays there.
    pub fn step(&mut self, dt: f64) {
        if self.is_settled() {
            self.phase = Phase {
                position: self.target,
                velocity: 0.0,
            };
            return;
        }

        let k1 = self.rate(self.phase);
        let k2 = self.rate(self.phase.advance(k1, dt / 2.0));
        let k3 = self.rate(self.phase.advance(k2, dt / 2.0));
        let k4 = self.rate(self.phase.advance(k3, dt));
        let slope = Phase {
            position: (k1.position + 2.0 * (k2.position + k3.position) + k4.position) / 6.0,
            velocity: (k1.velocity + 2.0 * (k2.velocity + k3.velocity) + k4.velocity) / 6.0,
        };
        self.phase = self.phase.advance(slope, dt);
    }

    fn rate(&self, phase: Phase) -> Phase {
        let SpringConfig {
            stiffness,
            damping,
            mass,
        } = self.config;
        let displacement = phase.position - self.target;
        Phase {
            position: phase.velocity,
            velocity: -(stiffness * displacement + damping * phase.velocity) / mass,
        }
    }
}

// ============================================================================
// Spring easing generator
// ============================================================================

/// Simulation step used when baking a spring into keyframes
const SAMPLE_STEP_MS: u64 = 10;

/// Upper bound on the baked simulation
const MAX_DURATION_MS: u64 = 10_000;

/// Easing generator that replaces an animation's keyframes with a sampled
/// spring simulation from the first to the last keyframe
///
/// The generated animation uses linear easing and lasts exactly as long as
/// the spring takes to come to rest.
///
/// In config files it is either a preset name or a table of
/// `stiffness`, `damping`, `mass`, `velocity`, `rest-delta` and `rest-speed`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(from = "SpringRepr")]
pub struct SpringGenerator {
    pub config: SpringConfig,
    /// Initial velocity in units per second
    pub velocity: f64,
    /// Settle distance; defaults to a value scaled to the travel distance
    pub rest_delta: Option<f64>,
    /// Settle speed; defaults to a value scaled to the travel distance
    pub rest_speed: Option<f64>,
}

impl SpringGenerator {
    pub fn new(config: SpringConfig) -> Self {
        Self {
            config,
            velocity: 0.0,
            rest_delta: None,
            rest_speed: None,
        }
    }

    /// Builder: initial velocity in units per second
    pub fn velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder: explicit rest thresholds
    pub fn rest(mut self, rest_delta: f64, rest_speed: f64) -> Self {
        self.rest_delta = Some(rest_delta);
        self.rest_speed = Some(rest_speed);
        self
    }

    /// Sample the spring from `origin` to `target`, returning the positions
    /// at every step (first = origin, last = target) and the settle time
    pub fn bake(&self, origin: f64, target: f64) -> (Vec<f64>, Duration) {
        let (rest_delta, rest_speed) = rest_thresholds(target - origin);
        let mut spring = Spring::new(self.config, origin, target)
            .with_velocity(self.velocity)
            .with_rest_thresholds(
                self.rest_delta.unwrap_or(rest_delta),
                self.rest_speed.unwrap_or(rest_speed),
            );

        let dt = SAMPLE_STEP_MS as f64 / 1000.0;
        let mut positions = vec![origin];
        let mut elapsed_ms = 0;
        while !spring.is_settled() && elapsed_ms < MAX_DURATION_MS {
            spring.step(dt);
            elapsed_ms += SAMPLE_STEP_MS;
            positions.push(spring.position());
        }

        if let Some(last) = positions.last_mut() {
            *last = target;
        }
        if positions.len() < 2 {
            positions.push(target);
        }

        (positions, Duration::from_millis(elapsed_ms))
    }
}

impl Default for SpringGenerator {
    fn default() -> Self {
        Self::new(SpringConfig::default())
    }
}

impl From<SpringPreset> for SpringGenerator {
    fn from(preset: SpringPreset) -> Self {
        Self::new(preset.config())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SpringRepr {
    Preset(SpringPreset),
    Table(SpringTable),
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct SpringTable {
    #[serde(flatten)]
    config: SpringConfig,
    velocity: f64,
    rest_delta: Option<f64>,
    rest_speed: Option<f64>,
}

impl From<SpringRepr> for SpringGenerator {
    fn from(repr: SpringRepr) -> Self {
        match repr {
            SpringRepr::Preset(preset) => preset.into(),
            SpringRepr::Table(table) => Self {
                config: table.config,
                velocity: table.velocity,
                rest_delta: table.rest_delta,
                rest_speed: table.rest_speed,
            },
        }
    }
}

impl EasingGenerator for SpringGenerator {
    fn create_animation(&self, input: GeneratorInput<'_>) -> GeneratedAnimation {
        let (origin, target) = match (input.keyframes.first(), input.keyframes.last()) {
            (Some(origin), Some(target)) => (*origin, *target),
            _ => {
                return GeneratedAnimation {
                    easing: SegmentEasing::Uniform(Easing::Linear),
                    keyframes: None,
                    duration: None,
                }
            }
        };

        let (keyframes, duration) = self.bake(origin, target);
        tracing::debug!(
            samples = keyframes.len(),
            duration_ms = duration.as_millis() as u64,
            "baked spring keyframes"
        );

        GeneratedAnimation {
            easing: SegmentEasing::Uniform(Easing::Linear),
            keyframes: Some(keyframes),
            // A spring that is already at rest keeps the caller's timing
            duration: (!duration.is_zero()).then_some(duration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_from_config() {
        let wobbly: SpringGenerator = serde_json::from_str(r#""wobbly""#).unwrap();
        assert_eq!(wobbly, SpringGenerator::new(SpringPreset::Wobbly.config()));

        let table: SpringGenerator =
            serde_json::from_str(r#"{ "damping": 8.0, "rest-delta": 0.1 }"#).unwrap();
        assert_eq!(table.config.damping, 8.0);
        assert_eq!(table.config.stiffness, SpringPreset::Stiff.config().stiffness);
        assert_eq!(table.rest_delta, Some(0.1));
        assert_eq!(table.rest_speed, None);

        assert!(serde_json::from_str::<SpringGenerator>(r#""bouncy""#).is_err());
    }

    #[test]
    fn test_critically_damped_matches_closed_form() {
        // x(t) = 1 - (1 + wt) e^(-wt) with w = sqrt(k / m) = 10
        let mut spring =
            Spring::new(SpringPreset::Molasses.config(), 0.0, 1.0).with_rest_thresholds(0.0, 0.0);
        for _ in 0..50 {
            spring.step(0.01);
        }
        let expected = 1.0 - 6.0 * (-5.0f64).exp();
        assert!((spring.position() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_settled_spring_snaps_to_target() {
        let mut spring = Spring::new(SpringConfig::default(), 9.999, 10.0);
        assert!(spring.is_settled());
        spring.step(0.01);
        assert_eq!(spring.position(), 10.0);
    }

    #[test]
    fn test_bake_starts_at_origin_and_ends_at_target() {
        let generator = SpringGenerator::from(SpringPreset::Wobbly);
        let (positions, duration) = generator.bake(0.0, 1.0);

        assert_eq!(positions.first().copied(), Some(0.0));
        assert_eq!(positions.last().copied(), Some(1.0));
        assert!(duration > Duration::ZERO);
        assert!(duration < Duration::from_millis(MAX_DURATION_MS));
        assert_eq!(
            positions.len() as u64 - 1,
            duration.as_millis() as u64 / SAMPLE_STEP_MS
        );
        assert!(positions.iter().any(|p| *p > 1.0), "wobbly springs overshoot");
    }

    #[test]
    fn test_rest_thresholds_scale_with_distance() {
        let generator = SpringGenerator::default();

        // Long travel settles on coarse thresholds
        let (_, coarse) = generator.bake(0.0, 100.0);
        let (_, fine) = generator.rest(0.005, 0.05).bake(0.0, 100.0);
        assert!(coarse < fine);

        // Short travel settles on fine ones
        let (_, fine) = generator.bake(0.0, 1.0);
        let (_, coarse) = generator.rest(0.5, 10.0).bake(0.0, 1.0);
        assert!(coarse < fine);
    }

    #[test]
    fn test_bake_stops_at_duration_cap() {
        // Undamped: oscillates forever
        let generator = SpringGenerator::new(SpringConfig::new(100.0, 0.0, 1.0));
        let (positions, duration) = generator.bake(0.0, 10.0);

        assert_eq!(duration, Duration::from_millis(MAX_DURATION_MS));
        assert_eq!(positions.len() as u64, MAX_DURATION_MS / SAMPLE_STEP_MS + 1);
        assert_eq!(positions.last().copied(), Some(10.0));
    }

    #[test]
    fn test_generator_replaces_keyframes() {
        let generator = SpringGenerator::default();
        let generated = generator.create_animation(GeneratorInput {
            keyframes: &[10.0, 110.0],
            duration: Duration::from_millis(300),
        });

        let keyframes = generated.keyframes.expect("spring generates keyframes");
        assert_eq!(keyframes[0], 10.0);
        assert_eq!(*keyframes.last().unwrap(), 110.0);
        assert!(generated.duration.is_some());
        assert_eq!(generated.easing, SegmentEasing::Uniform(Easing::Linear));
    }

    #[test]
    fn test_generator_at_rest_keeps_duration() {
        let generated = SpringGenerator::default().create_animation(GeneratorInput {
            keyframes: &[5.0, 5.0],
            duration: Duration::from_millis(300),
        });

        assert_eq!(generated.keyframes, Some(vec![5.0, 5.0]));
        assert_eq!(generated.duration, None);
    }
}

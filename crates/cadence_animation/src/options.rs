//! Animation options
//!
//! Everything an [`Animation`](crate::Animation) is built from besides its
//! keyframes. Options can be assembled in code with the builder methods or
//! deserialized from a config file, where durations are written in seconds
//! and easing is a string, a list of strings or a spring table:
//!
//! ```toml
//! duration = 0.8
//! delay = 0.1
//! repeat = 1
//! direction = "alternate"
//! easing = "cubic-bezier(0.2, 0, 0, 1)"
//! ```
//!
//! ```toml
//! easing = { spring = { stiffness = 170.0, damping = 26.0 } }
//! ```
//!
//! ```toml
//! easing = { spring = "wobbly" }
//! ```

use crate::easing::{Easing, EasingGenerator, EasingSpec};
use crate::error::ConfigError;
use crate::spring::SpringGenerator;
use crate::timing::Direction;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Default iteration length
pub const DEFAULT_DURATION: Duration = Duration::from_millis(300);

/// Construction options
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnimationOptions {
    /// Easing within each segment, per segment, or a generator
    pub easing: EasingSpec,
    /// Length of one iteration
    #[serde(deserialize_with = "seconds")]
    pub duration: Duration,
    /// Time before the first iteration starts
    #[serde(deserialize_with = "seconds")]
    pub delay: Duration,
    /// Time after the last iteration before the animation finishes
    #[serde(deserialize_with = "seconds")]
    pub end_delay: Duration,
    /// Additional iterations after the first
    pub repeat: u32,
    /// Keyframe positions in [0, 1]; evenly spaced when absent
    pub offset: Option<Vec<f64>>,
    pub direction: Direction,
    /// Start playing on construction
    pub autoplay: bool,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            easing: EasingSpec::default(),
            duration: DEFAULT_DURATION,
            delay: Duration::ZERO,
            end_delay: Duration::ZERO,
            repeat: 0,
            offset: None,
            direction: Direction::Normal,
            autoplay: true,
        }
    }
}

impl AnimationOptions {
    pub fn easing(mut self, easing: impl Into<EasingSpec>) -> Self {
        self.easing = easing.into();
        self
    }

    /// Use an easing generator, consulted once at construction
    pub fn generator(mut self, generator: impl EasingGenerator + 'static) -> Self {
        self.easing = EasingSpec::generator(generator);
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn end_delay(mut self, end_delay: Duration) -> Self {
        self.end_delay = end_delay;
        self
    }

    pub fn repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn offset(mut self, offset: impl Into<Vec<f64>>) -> Self {
        self.offset = Some(offset.into());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }
}

/// Duration from a float number of seconds
pub fn duration_from_secs(seconds: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::InvalidDuration { seconds })
}

fn seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = f64::deserialize(deserializer)?;
    duration_from_secs(seconds).map_err(serde::de::Error::custom)
}

// ============================================================================
// Easing from config
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum EasingRepr {
    One(Easing),
    Many(Vec<Easing>),
    Spring { spring: SpringGenerator },
}

impl<'de> Deserialize<'de> for EasingSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match EasingRepr::deserialize(deserializer)? {
            EasingRepr::One(easing) => EasingSpec::Single(easing),
            EasingRepr::Many(list) => EasingSpec::PerSegment(list),
            EasingRepr::Spring { spring } => EasingSpec::generator(spring),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spring::SpringConfig;

    #[test]
    fn test_defaults() {
        let options = AnimationOptions::default();
        assert_eq!(options.duration, Duration::from_millis(300));
        assert_eq!(options.delay, Duration::ZERO);
        assert_eq!(options.end_delay, Duration::ZERO);
        assert_eq!(options.repeat, 0);
        assert_eq!(options.direction, Direction::Normal);
        assert!(options.offset.is_none());
        assert!(options.autoplay);
        assert!(matches!(options.easing, EasingSpec::Single(Easing::Ease)));
    }

    #[test]
    fn test_builder() {
        let options = AnimationOptions::default()
            .easing(Easing::EaseOut)
            .duration(Duration::from_secs(2))
            .delay(Duration::from_millis(100))
            .end_delay(Duration::from_millis(50))
            .repeat(3)
            .offset([0.0, 0.3, 1.0])
            .direction(Direction::Alternate)
            .autoplay(false);

        assert!(matches!(options.easing, EasingSpec::Single(Easing::EaseOut)));
        assert_eq!(options.duration, Duration::from_secs(2));
        assert_eq!(options.repeat, 3);
        assert_eq!(options.offset.as_deref(), Some(&[0.0, 0.3, 1.0][..]));
        assert!(!options.autoplay);
    }

    #[test]
    fn test_deserialize_json() {
        let options: AnimationOptions = serde_json::from_str(
            r#"{
                "duration": 1.5,
                "end-delay": 0.25,
                "direction": "alternate-reverse",
                "easing": ["linear", "ease-in"]
            }"#,
        )
        .unwrap();

        assert_eq!(options.duration, Duration::from_millis(1500));
        assert_eq!(options.end_delay, Duration::from_millis(250));
        assert_eq!(options.direction, Direction::AlternateReverse);
        match options.easing {
            EasingSpec::PerSegment(list) => assert_eq!(list, vec![Easing::Linear, Easing::EaseIn]),
            other => panic!("expected per-segment easing, got {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_spring() {
        let options: AnimationOptions =
            serde_json::from_str(r#"{ "easing": { "spring": { "stiffness": 300.0 } } }"#).unwrap();
        assert!(matches!(options.easing, EasingSpec::Generator(_)));
    }

    #[test]
    fn test_deserialize_spring_preset() {
        let options: AnimationOptions =
            serde_json::from_str(r#"{ "easing": { "spring": "gentle" } }"#).unwrap();
        assert!(matches!(options.easing, EasingSpec::Generator(_)));
        assert!(serde_json::from_str::<AnimationOptions>(r#"{ "easing": { "spring": "boing" } }"#).is_err());
    }

    #[test]
    fn test_spring_generator_fields() {
        let spring: SpringGenerator =
            serde_json::from_str(r#"{ "stiffness": 300.0, "velocity": 4.0 }"#).unwrap();
        assert_eq!(spring.config.stiffness, 300.0);
        assert_eq!(spring.config.damping, SpringConfig::default().damping);
        assert_eq!(spring.velocity, 4.0);
    }

    #[test]
    fn test_rejects_negative_duration() {
        assert_eq!(
            duration_from_secs(-1.0),
            Err(ConfigError::InvalidDuration { seconds: -1.0 })
        );
        assert!(serde_json::from_str::<AnimationOptions>(r#"{ "delay": -0.5 }"#).is_err());
        assert!(serde_json::from_str::<AnimationOptions>(r#"{ "easing": "wobble" }"#).is_err());
    }
}

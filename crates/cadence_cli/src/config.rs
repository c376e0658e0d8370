//! Animation definition files
//!
//! An animation file is TOML with a `keyframes` array and any of the
//! animation options at the top level:
//!
//! ```toml
//! keyframes = [0.0, 100.0, 40.0]
//! duration = 1.2
//! easing = ["ease-out", "ease-in-out"]
//! offset = [0.0, 0.7, 1.0]
//! repeat = 1
//! direction = "alternate"
//! ```

use anyhow::{Context, Result};
use cadence_animation::{Animation, AnimationOptions, FrameClock};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Parsed animation file
#[derive(Debug, Clone, Deserialize)]
pub struct AnimationFile {
    #[serde(default = "default_keyframes")]
    pub keyframes: Vec<f64>,
    #[serde(flatten)]
    pub options: AnimationOptions,
}

fn default_keyframes() -> Vec<f64> {
    vec![0.0, 1.0]
}

impl AnimationFile {
    /// Load and parse an animation file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("No animation file at {}", path.display());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Build the animation on `clock`, delivering samples to `output`
    pub fn build<C, F>(&self, clock: C, output: F) -> Result<Animation>
    where
        C: FrameClock + 'static,
        F: FnMut(f64) + Send + 'static,
    {
        Animation::new(clock, output, &self.keyframes, self.options.clone())
            .context("Invalid animation definition")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_animation::{Direction, EasingSpec, FrameScheduler};
    use std::time::Duration;

    #[test]
    fn test_parse_full_file() {
        let file = AnimationFile::from_toml(
            r#"
            keyframes = [0.0, 100.0, 40.0]
            duration = 1.2
            delay = 0.5
            end-delay = 0.25
            easing = ["ease-out", "ease-in-out"]
            offset = [0.0, 0.7, 1.0]
            repeat = 1
            direction = "alternate"
            autoplay = false
            "#,
        )
        .unwrap();

        assert_eq!(file.keyframes, vec![0.0, 100.0, 40.0]);
        assert_eq!(file.options.duration, Duration::from_millis(1200));
        assert_eq!(file.options.delay, Duration::from_millis(500));
        assert_eq!(file.options.end_delay, Duration::from_millis(250));
        assert_eq!(file.options.repeat, 1);
        assert_eq!(file.options.direction, Direction::Alternate);
        assert!(!file.options.autoplay);
        assert!(matches!(file.options.easing, EasingSpec::PerSegment(ref l) if l.len() == 2));
    }

    #[test]
    fn test_defaults_when_empty() {
        let file = AnimationFile::from_toml("").unwrap();
        assert_eq!(file.keyframes, vec![0.0, 1.0]);
        assert_eq!(file.options.duration, Duration::from_millis(300));
        assert!(file.options.autoplay);
    }

    #[test]
    fn test_spring_easing_table() {
        let file = AnimationFile::from_toml(
            r#"
            keyframes = [0.0, 10.0]
            easing = { spring = { stiffness = 200.0, damping = 20.0 } }
            "#,
        )
        .unwrap();
        assert!(matches!(file.options.easing, EasingSpec::Generator(_)));
    }

    #[test]
    fn test_spring_preset_by_name() {
        let file = AnimationFile::from_toml(
            r#"
            keyframes = [0.0, 10.0]
            easing = { spring = "wobbly" }
            "#,
        )
        .unwrap();
        let animation = file.build(FrameScheduler::new(), |_| {}).unwrap();
        assert!(animation.keyframe_count() > 2);
    }

    #[test]
    fn test_bad_easing_is_rejected() {
        assert!(AnimationFile::from_toml(r#"easing = "cubic-bezier(2, 0, 0, 1)""#).is_err());
    }

    #[test]
    fn test_build_reports_invalid_keyframes() {
        let file = AnimationFile::from_toml("keyframes = [1.0]").unwrap();
        let err = file.build(FrameScheduler::new(), |_| {}).unwrap_err();
        assert!(format!("{err:#}").contains("at least 2 keyframes"));
    }
}

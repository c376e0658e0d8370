//! Host scenarios
//!
//! A scenario is a JSON list of steps the host performs against an
//! animation: advancing the frame clock and calling playback controls.

use anyhow::{Context, Result};
use cadence_animation::{Animation, CompletionState, FrameClock, FrameScheduler, PlayState};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sequence of host steps
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Load a scenario from JSON text.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load a scenario from file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Tick at `interval_ms` until the animation settles, at most `max_frames` times
    pub fn until_settled(interval_ms: f64, max_frames: usize) -> Self {
        Self {
            steps: vec![
                ScenarioStep::Play,
                ScenarioStep::Settle {
                    interval_ms,
                    max_frames,
                },
            ],
        }
    }
}

/// One host action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Run one frame `ms` after the current time
    Advance { ms: f64 },
    /// Run `count` frames `interval_ms` apart
    Frames { count: usize, interval_ms: f64 },
    /// Run frames until the animation is no longer running
    Settle { interval_ms: f64, max_frames: usize },
    /// Move the clock without running a frame
    Wait { ms: f64 },
    Play,
    Pause,
    Reverse,
    Finish,
    Cancel,
    Commit,
    Seek { ms: f64 },
    Rate { value: f64 },
}

/// Machine-readable result of a scenario run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub play_state: String,
    pub current_time_ms: f64,
    pub playback_rate: f64,
    pub frames: u64,
    pub clock_ms: f64,
    pub completion: String,
    pub final_value: Option<f64>,
}

/// Apply every step of `scenario` to `animation`
pub fn run(scenario: &Scenario, animation: &Animation, clock: &FrameScheduler) -> RunReport {
    for (index, step) in scenario.steps.iter().enumerate() {
        tracing::debug!(index, ?step, "scenario step");
        apply(step, animation, clock);
    }

    let completion = animation.finished();
    let (completion_label, final_value) = match completion.state() {
        CompletionState::Pending => ("pending", None),
        CompletionState::Resolved(value) => ("resolved", Some(value)),
        CompletionState::Rejected(_) => ("rejected", None),
    };

    RunReport {
        play_state: format!("{:?}", animation.play_state()).to_lowercase(),
        current_time_ms: animation.current_time(),
        playback_rate: animation.playback_rate(),
        frames: clock.frame_count(),
        clock_ms: clock.now(),
        completion: completion_label.to_string(),
        final_value,
    }
}

fn apply(step: &ScenarioStep, animation: &Animation, clock: &FrameScheduler) {
    match *step {
        ScenarioStep::Advance { ms } => {
            clock.advance(ms);
        }
        ScenarioStep::Frames { count, interval_ms } => {
            clock.run_frames(count, interval_ms);
        }
        ScenarioStep::Settle {
            interval_ms,
            max_frames,
        } => {
            let mut frames = 0;
            while animation.play_state() == PlayState::Running && frames < max_frames {
                clock.advance(interval_ms);
                frames += 1;
            }
            if animation.play_state() == PlayState::Running {
                tracing::warn!(max_frames, "animation still running after frame limit");
            }
        }
        ScenarioStep::Wait { ms } => clock.set_now(clock.now() + ms.max(0.0)),
        ScenarioStep::Play => animation.play(),
        ScenarioStep::Pause => animation.pause(),
        ScenarioStep::Reverse => animation.reverse(),
        ScenarioStep::Finish => animation.finish(),
        ScenarioStep::Cancel => animation.cancel(),
        ScenarioStep::Commit => animation.commit_styles(),
        ScenarioStep::Seek { ms } => animation.set_current_time(ms),
        ScenarioStep::Rate { value } => animation.set_playback_rate(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_animation::{AnimationOptions, Easing};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn linear_second(clock: &FrameScheduler) -> (Animation, Arc<Mutex<Vec<f64>>>) {
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink = values.clone();
        let animation = Animation::new(
            clock.clone(),
            move |v| sink.lock().unwrap().push(v),
            &[0.0, 1.0],
            AnimationOptions::default()
                .duration(Duration::from_secs(1))
                .easing(Easing::Linear),
        )
        .unwrap();
        (animation, values)
    }

    #[test]
    fn test_parse_steps() {
        let scenario = Scenario::from_json(
            r#"{ "steps": [
                { "type": "advance", "ms": 16 },
                { "type": "frames", "count": 3, "interval_ms": 16.6 },
                { "type": "pause" },
                { "type": "seek", "ms": 250 },
                { "type": "rate", "value": -1 }
            ] }"#,
        )
        .unwrap();

        assert_eq!(scenario.steps[0], ScenarioStep::Advance { ms: 16.0 });
        assert_eq!(scenario.steps[2], ScenarioStep::Pause);
        assert_eq!(scenario.steps[4], ScenarioStep::Rate { value: -1.0 });
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        assert!(Scenario::from_json(r#"{ "steps": [{ "type": "jump" }] }"#).is_err());
    }

    #[test]
    fn test_run_until_settled() {
        let clock = FrameScheduler::new();
        let (animation, values) = linear_second(&clock);

        let report = run(&Scenario::until_settled(100.0, 100), &animation, &clock);
        assert_eq!(report.play_state, "finished");
        assert_eq!(report.completion, "resolved");
        assert_eq!(report.final_value, Some(1.0));
        assert_eq!(report.frames, 10);
        assert_eq!(values.lock().unwrap().len(), 10);
    }

    #[test]
    fn test_pause_and_cancel_steps() {
        let clock = FrameScheduler::new();
        let (animation, values) = linear_second(&clock);

        let scenario = Scenario {
            steps: vec![
                ScenarioStep::Advance { ms: 200.0 },
                ScenarioStep::Pause,
                ScenarioStep::Frames {
                    count: 5,
                    interval_ms: 100.0,
                },
                ScenarioStep::Cancel,
            ],
        };
        let report = run(&scenario, &animation, &clock);

        assert_eq!(report.play_state, "idle");
        assert_eq!(report.completion, "rejected");
        assert_eq!(*values.lock().unwrap().last().unwrap(), 0.0);
        // One frame before the pause plus the cancel resample
        assert_eq!(values.lock().unwrap().len(), 2);
    }
}

//! Timing model
//!
//! Pure mapping from a frame timestamp plus a snapshot of playback state to
//! iteration index, iteration progress and the direction-adjusted progress
//! handed to the interpolator. Nothing here mutates; the playback controller
//! feeds [`TimingInput`] in and stores what it needs from [`TimingSample`].

use serde::Deserialize;
use std::time::Duration;

/// Playback direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Every iteration plays 0 -> 1
    #[default]
    Normal,
    /// Every iteration plays 1 -> 0
    Reverse,
    /// Even iterations play forward, odd iterations backward
    Alternate,
    /// Even iterations play backward, odd iterations forward
    AlternateReverse,
}

impl Direction {
    /// Whether iteration `iteration` runs 1 -> 0
    pub fn is_flipped(self, iteration: u64) -> bool {
        let odd = iteration % 2 == 1;
        match self {
            Direction::Normal => false,
            Direction::Reverse => true,
            Direction::Alternate => odd,
            Direction::AlternateReverse => !odd,
        }
    }
}

/// Immutable timing parameters, all in seconds
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingConfig {
    duration: f64,
    delay: f64,
    end_delay: f64,
    repeat: u32,
    direction: Direction,
    total_duration: f64,
}

impl TimingConfig {
    pub fn new(
        duration: Duration,
        delay: Duration,
        end_delay: Duration,
        repeat: u32,
        direction: Direction,
    ) -> Self {
        let duration = duration.as_secs_f64();
        Self {
            duration,
            delay: delay.as_secs_f64(),
            end_delay: end_delay.as_secs_f64(),
            repeat,
            direction,
            total_duration: duration * (repeat as f64 + 1.0),
        }
    }

    /// Length of one iteration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn end_delay(&self) -> f64 {
        self.end_delay
    }

    pub fn repeat(&self) -> u32 {
        self.repeat
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// `duration * (repeat + 1)` in seconds
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }
}

/// Playback state at the moment of sampling
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingInput {
    /// Frame timestamp in milliseconds
    pub timestamp: f64,
    /// Timestamp of logical t = 0 in milliseconds
    pub start_time: f64,
    /// Frozen elapsed time in milliseconds; replaces the live timestamp when set
    pub pause_time: Option<f64>,
    /// Signed playback rate
    pub rate: f64,
    /// Whether the animation is in the finished state
    pub finished: bool,
}

/// Result of sampling the timing model
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingSample {
    /// Raw elapsed time in milliseconds, before delay and looping (`currentTime`)
    pub elapsed: f64,
    /// Seconds since the end of the delay, never negative
    pub local_time: f64,
    /// Zero-based iteration index
    pub iteration: u64,
    /// Progress through the current iteration before direction is applied
    pub iteration_progress: f64,
    /// Direction-adjusted progress in [0, 1] to feed the interpolator
    pub progress: f64,
    /// Whether the animation has run past its end delay (or was forced finished)
    pub is_finished: bool,
}

/// Sample the timing model
pub fn sample(config: &TimingConfig, input: &TimingInput) -> TimingSample {
    let elapsed = match input.pause_time {
        Some(held) => held,
        None => (input.timestamp - input.start_time) * input.rate,
    };

    let mut local_time = (elapsed / 1000.0 - config.delay).max(0.0);
    if input.finished {
        local_time = config.total_duration;
    }

    let (iteration, iteration_progress) = if local_time >= config.total_duration {
        // Past the active interval: hold the end of the last iteration; the
        // direction flip below still applies, so reversed runs end on the
        // first keyframe
        (config.repeat as u64, 1.0)
    } else {
        let progress = local_time / config.duration;
        let mut iteration = progress.floor();
        let mut iteration_progress = progress - iteration;
        // An exact boundary is the end of the previous iteration
        if iteration_progress == 0.0 && progress >= 1.0 {
            iteration_progress = 1.0;
            iteration -= 1.0;
        }
        (iteration as u64, iteration_progress)
    };

    let directed = if config.direction.is_flipped(iteration) {
        1.0 - iteration_progress
    } else {
        iteration_progress
    };

    TimingSample {
        elapsed,
        local_time,
        iteration,
        iteration_progress,
        progress: directed.clamp(0.0, 1.0),
        is_finished: input.finished
            || local_time >= config.total_duration + config.end_delay,
    }
}

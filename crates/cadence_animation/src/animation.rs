//! Playback controller
//!
//! [`Animation`] owns one keyframe animation: the immutable timing
//! configuration, the interpolator, and the mutable playback state
//! (`start_time`, `pause_time`, `rate`, ...). It drives itself by
//! scheduling one-shot callbacks on a [`FrameClock`], samples on each
//! frame and hands the value to the output callback.
//!
//! # Example
//!
//! ```
//! use cadence_animation::{Animation, AnimationOptions, Easing, FrameScheduler, PlayState};
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//!
//! let clock = FrameScheduler::new();
//! let value = Arc::new(Mutex::new(0.0));
//! let sink = value.clone();
//!
//! let animation = Animation::new(
//!     clock.clone(),
//!     move |v| *sink.lock().unwrap() = v,
//!     &[0.0, 100.0],
//!     AnimationOptions::default()
//!         .duration(Duration::from_secs(1))
//!         .easing(Easing::Linear),
//! )
//! .unwrap();
//!
//! clock.tick(500.0);
//! assert_eq!(*value.lock().unwrap(), 50.0);
//!
//! clock.tick(1000.0);
//! assert_eq!(animation.play_state(), PlayState::Finished);
//! ```

use crate::completion::Completion;
use crate::easing;
use crate::error::{ConfigError, Result};
use crate::interpolate::Interpolator;
use crate::options::AnimationOptions;
use crate::scheduler::{FrameClock, FrameId};
use crate::timing::{self, TimingConfig, TimingInput, TimingSample};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

/// Coarse lifecycle phase of an animation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlayState {
    /// Built but not playing; also the state after `cancel()`
    #[default]
    Idle,
    Running,
    Paused,
    /// Ran to the end, or `finish()` was called
    Finished,
}

type Output = Box<dyn FnMut(f64) + Send>;

// ============================================================================
// Internal state
// ============================================================================

struct PlaybackState {
    timing: TimingConfig,
    interpolator: Interpolator,
    play_state: PlayState,
    /// Timestamp of logical t = 0, in ms
    start_time: Option<f64>,
    /// Frozen elapsed time in ms while paused (or held at rate 0)
    pause_time: Option<f64>,
    rate: f64,
    /// Last computed elapsed time in ms
    t: f64,
    /// Elapsed time `cancel()` resamples at; `None` means the start
    committed_time: Option<f64>,
    frame: Option<FrameId>,
}

impl PlaybackState {
    /// Elapsed time in ms at `now` without sampling
    fn elapsed_at(&self, now: f64) -> f64 {
        match (self.pause_time, self.start_time, self.play_state) {
            (Some(held), _, _) => held,
            (None, Some(start), PlayState::Running | PlayState::Paused) => {
                (now - start) * self.rate
            }
            // Finished holds the end, even when `finish()` cut playback short
            (None, _, PlayState::Finished) => self.t.max(self.end_time()),
            _ => self.t,
        }
    }

    /// Elapsed time in ms at which the animation is over
    fn end_time(&self) -> f64 {
        (self.timing.delay() + self.timing.total_duration() + self.timing.end_delay()) * 1000.0
    }

    fn sample(&mut self, timestamp: f64) -> (TimingSample, f64) {
        let input = TimingInput {
            timestamp,
            start_time: self.start_time.unwrap_or(timestamp),
            pause_time: self.pause_time,
            rate: self.rate,
            finished: self.play_state == PlayState::Finished,
        };
        let sample = timing::sample(&self.timing, &input);
        self.t = sample.elapsed;
        (sample, self.interpolator.sample(sample.progress))
    }
}

struct Shared {
    state: Mutex<PlaybackState>,
    output: Mutex<Output>,
    /// Latest value delivered while the output callback was running
    pending: Mutex<Option<f64>>,
    completion: Completion,
    clock: Arc<dyn FrameClock>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand a value to the output callback, with no playback lock held
    ///
    /// A value produced from inside the callback (say `cancel()` called by
    /// the output itself) is parked and delivered once the outer call
    /// returns, so the last value seen always matches the play state.
    fn deliver(&self, value: f64) {
        let mut output = match self.output.try_lock() {
            Ok(output) => output,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::trace!(value, "output callback busy, deferring sample");
                *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
                return;
            }
        };

        output(value);
        while let Some(next) = self.take_pending() {
            output(next);
        }
    }

    fn take_pending(&self) -> Option<f64> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn cancel_frame(&self, state: &mut PlaybackState) {
        if let Some(id) = state.frame.take() {
            self.clock.cancel_frame(id);
        }
    }

    fn schedule(shared: &Arc<Shared>, state: &mut PlaybackState) {
        if state.frame.is_some() {
            return;
        }
        let weak = Arc::downgrade(shared);
        let id = shared.clock.schedule_frame(Box::new(move |timestamp| {
            if let Some(shared) = weak.upgrade() {
                Shared::on_frame(&shared, timestamp);
            }
        }));
        state.frame = Some(id);
    }

    /// One tick of the running animation
    fn on_frame(shared: &Arc<Shared>, timestamp: f64) {
        let (value, finished) = {
            let mut state = shared.lock();
            state.frame = None;
            if state.play_state != PlayState::Running {
                return;
            }

            let (sample, value) = state.sample(timestamp);
            tracing::trace!(
                timestamp,
                elapsed = sample.elapsed,
                iteration = sample.iteration,
                progress = sample.progress,
                value,
                "tick"
            );

            if sample.is_finished {
                state.play_state = PlayState::Finished;
                state.pause_time = None;
                tracing::debug!(value, "animation finished");
            } else {
                Shared::schedule(shared, &mut state);
            }
            (value, sample.is_finished)
        };

        shared.deliver(value);
        if finished {
            shared.completion.resolve(value);
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = state.frame.take() {
            self.clock.cancel_frame(id);
        }
        if self.completion.reject() {
            tracing::debug!("animation dropped before completing");
        }
    }
}

// ============================================================================
// Public handle
// ============================================================================

/// Handle to a running keyframe animation
///
/// Clones share the same animation. When the last clone is dropped the
/// pending frame is cancelled and an unsettled completion is rejected.
#[derive(Clone)]
pub struct Animation {
    shared: Arc<Shared>,
}

impl Animation {
    /// Build an animation of `keyframes` that writes each sample to `output`
    ///
    /// Configuration is validated here, before any frame is scheduled. An
    /// easing generator runs exactly once and may replace the keyframes and
    /// duration. With `autoplay` set (the default) the animation starts
    /// immediately at `clock.now()`.
    pub fn new<C, F>(clock: C, output: F, keyframes: &[f64], options: AnimationOptions) -> Result<Self>
    where
        C: FrameClock + 'static,
        F: FnMut(f64) + Send + 'static,
    {
        if keyframes.len() < 2 {
            return Err(ConfigError::TooFewKeyframes {
                count: keyframes.len(),
            });
        }

        let resolved = easing::resolve(&options.easing, keyframes, options.duration)?;

        // Offsets describe the caller's keyframes; a generator that
        // resamples them into a different count makes them meaningless
        let offsets = if resolved.keyframes.len() == keyframes.len() {
            options.offset.as_deref()
        } else {
            if options.offset.is_some() {
                tracing::debug!(
                    keyframes = resolved.keyframes.len(),
                    "ignoring offsets for generated keyframes"
                );
            }
            None
        };
        let interpolator = Interpolator::new(&resolved.keyframes, offsets, resolved.easing)?;

        let timing = TimingConfig::new(
            resolved.duration,
            options.delay,
            options.end_delay,
            options.repeat,
            options.direction,
        );
        tracing::debug!(
            keyframes = resolved.keyframes.len(),
            duration = timing.duration(),
            total_duration = timing.total_duration(),
            repeat = timing.repeat(),
            direction = ?timing.direction(),
            "animation created"
        );

        let animation = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PlaybackState {
                    timing,
                    interpolator,
                    play_state: PlayState::Idle,
                    start_time: None,
                    pause_time: None,
                    rate: 1.0,
                    t: 0.0,
                    committed_time: None,
                    frame: None,
                }),
                output: Mutex::new(Box::new(output)),
                pending: Mutex::new(None),
                completion: Completion::new(),
                clock: Arc::new(clock),
            }),
        };

        if options.autoplay {
            animation.play();
        }
        Ok(animation)
    }

    /// Start or resume playback
    ///
    /// Resuming from a pause keeps elapsed time continuous. Playing from
    /// `idle` or `finished` starts over at the current time. Does nothing
    /// while already running.
    pub fn play(&self) {
        let mut state = self.shared.lock();
        if state.play_state == PlayState::Running {
            return;
        }

        let now = self.shared.clock.now();
        match state.pause_time {
            Some(held) if state.rate != 0.0 => {
                state.start_time = Some(now - held / state.rate);
                state.pause_time = None;
            }
            // Rate 0 keeps holding the frozen time
            Some(_) => state.start_time = Some(now),
            None => {
                if state.start_time.is_none()
                    || matches!(state.play_state, PlayState::Idle | PlayState::Finished)
                {
                    state.start_time = Some(now);
                }
            }
        }

        let from = state.play_state;
        state.committed_time = None;
        state.play_state = PlayState::Running;
        Shared::schedule(&self.shared, &mut state);
        tracing::debug!(?from, now, start_time = ?state.start_time, "play");
    }

    /// Freeze playback at the current time
    ///
    /// No further output is delivered until [`play`](Self::play). Calling it
    /// while already paused changes nothing.
    pub fn pause(&self) {
        let mut state = self.shared.lock();
        if state.play_state == PlayState::Paused {
            return;
        }

        let now = self.shared.clock.now();
        let held = state.elapsed_at(now);
        state.pause_time = Some(held);
        state.t = held;
        self.shared.cancel_frame(&mut state);
        state.play_state = PlayState::Paused;
        tracing::debug!(elapsed = held, "pause");
    }

    /// Jump to the end, deliver the final value and resolve completion
    pub fn finish(&self) {
        let value = {
            let mut state = self.shared.lock();
            self.shared.cancel_frame(&mut state);
            state.play_state = PlayState::Finished;
            state.pause_time = None;
            let now = self.shared.clock.now();
            let (_, value) = state.sample(now);
            state.t = state.t.max(state.end_time());
            tracing::debug!(value, "finish");
            value
        };

        self.shared.deliver(value);
        self.shared.completion.resolve(value);
    }

    /// Stop, restore the value at the start (or at the last
    /// [`commit_styles`](Self::commit_styles)) and reject completion
    ///
    /// Safe from any state, including before the first frame.
    pub fn cancel(&self) {
        let value = {
            let mut state = self.shared.lock();
            self.shared.cancel_frame(&mut state);
            state.play_state = PlayState::Idle;

            state.pause_time = Some(state.committed_time.unwrap_or(0.0));
            let now = self.shared.clock.now();
            let (_, value) = state.sample(now);
            state.pause_time = None;
            state.start_time = None;
            tracing::debug!(value, elapsed = state.t, "cancel");
            value
        };

        self.shared.deliver(value);
        self.shared.completion.reject();
    }

    /// Flip the playback direction from the current position
    pub fn reverse(&self) {
        let mut state = self.shared.lock();
        let rate = -state.rate;
        self.apply_rate(&mut state, rate);
        tracing::debug!(rate, "reverse");
    }

    /// Elapsed time in milliseconds as of the last sample
    pub fn current_time(&self) -> f64 {
        self.shared.lock().t
    }

    /// Seek to `time` milliseconds of elapsed time
    ///
    /// When paused, stopped or at rate 0 the time is held until playback
    /// resumes; while running the start time is shifted so the next frame
    /// samples from `time`.
    pub fn set_current_time(&self, time: f64) {
        let mut state = self.shared.lock();
        if state.play_state == PlayState::Running && state.rate != 0.0 {
            let now = self.shared.clock.now();
            state.start_time = Some(now - time / state.rate);
            state.pause_time = None;
        } else {
            state.pause_time = Some(time);
        }
        state.t = time;
        tracing::debug!(time, "seek");
    }

    pub fn playback_rate(&self) -> f64 {
        self.shared.lock().rate
    }

    /// Change the playback rate without moving the current position
    ///
    /// Only time after the change accumulates at the new speed. A rate of 0
    /// holds the current position; a negative rate plays backwards towards
    /// the start, where the animation rests without finishing.
    pub fn set_playback_rate(&self, rate: f64) {
        if !rate.is_finite() {
            tracing::warn!(rate, "ignoring non-finite playback rate");
            return;
        }
        let mut state = self.shared.lock();
        self.apply_rate(&mut state, rate);
        tracing::debug!(rate, "playback rate");
    }

    fn apply_rate(&self, state: &mut PlaybackState, rate: f64) {
        if state.play_state == PlayState::Running {
            let now = self.shared.clock.now();
            let current = state.elapsed_at(now);
            if rate == 0.0 {
                state.pause_time = Some(current);
            } else {
                state.start_time = Some(now - current / rate);
                state.pause_time = None;
            }
        }
        state.rate = rate;
    }

    pub fn play_state(&self) -> PlayState {
        self.shared.lock().play_state
    }

    /// Completion signal, settled once with the final value or [`Cancelled`](crate::Cancelled)
    pub fn finished(&self) -> Completion {
        self.shared.completion.clone()
    }

    /// Make the current position the one `cancel()` restores
    ///
    /// Has no effect once the animation has finished.
    pub fn commit_styles(&self) {
        let mut state = self.shared.lock();
        if state.play_state == PlayState::Finished {
            tracing::warn!("commit_styles on a finished animation is ignored");
            return;
        }
        let now = self.shared.clock.now();
        let committed = state.elapsed_at(now);
        state.committed_time = Some(committed);
        tracing::debug!(elapsed = committed, "commit styles");
    }

    /// Timing parameters after easing resolution
    pub fn timing(&self) -> TimingConfig {
        self.shared.lock().timing
    }

    /// Length of one iteration in seconds
    pub fn duration(&self) -> f64 {
        self.timing().duration()
    }

    /// Length of all iterations in seconds, excluding delays
    pub fn total_duration(&self) -> f64 {
        self.timing().total_duration()
    }

    /// Keyframes actually interpolated, after any easing generator ran
    pub fn keyframe_count(&self) -> usize {
        self.shared.lock().interpolator.segment_count() + 1
    }

    /// Value at `progress` through one iteration, without touching playback
    pub fn value_at(&self, progress: f64) -> f64 {
        self.shared.lock().interpolator.sample(progress)
    }
}

impl std::fmt::Debug for Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("Animation")
            .field("play_state", &state.play_state)
            .field("current_time", &state.t)
            .field("rate", &state.rate)
            .field("timing", &state.timing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use crate::scheduler::FrameScheduler;
    use std::time::Duration;

    fn linear(ms: u64) -> AnimationOptions {
        AnimationOptions::default()
            .duration(Duration::from_millis(ms))
            .easing(Easing::Linear)
    }

    fn silent(clock: &FrameScheduler, options: AnimationOptions) -> Animation {
        Animation::new(clock.clone(), |_| {}, &[0.0, 1.0], options).unwrap()
    }

    #[test]
    fn test_elapsed_at_uses_hold() {
        let clock = FrameScheduler::new();
        let animation = silent(&clock, linear(1000));
        clock.tick(300.0);
        animation.pause();
        clock.set_now(900.0);
        let state = animation.shared.lock();
        assert_eq!(state.elapsed_at(900.0), 300.0);
    }

    #[test]
    fn test_play_is_idempotent_while_running() {
        let clock = FrameScheduler::new();
        let animation = silent(&clock, linear(1000));
        assert_eq!(clock.pending_frames(), 1);
        animation.play();
        animation.play();
        assert_eq!(clock.pending_frames(), 1);
    }

    #[test]
    fn test_pause_cancels_frame() {
        let clock = FrameScheduler::new();
        let animation = silent(&clock, linear(1000));
        animation.pause();
        assert_eq!(clock.pending_frames(), 0);
        assert!(animation.shared.lock().frame.is_none());
    }

    #[test]
    fn test_non_finite_rate_ignored() {
        let clock = FrameScheduler::new();
        let animation = silent(&clock, linear(1000));
        animation.set_playback_rate(f64::NAN);
        assert_eq!(animation.playback_rate(), 1.0);
    }

    #[test]
    fn test_value_at_does_not_touch_playback() {
        let clock = FrameScheduler::new();
        let animation = silent(&clock, linear(1000));
        assert_eq!(animation.value_at(0.25), 0.25);
        assert_eq!(animation.current_time(), 0.0);
        assert_eq!(animation.play_state(), PlayState::Running);
    }

    #[test]
    fn test_keyframe_count_reflects_generator() {
        let clock = FrameScheduler::new();
        let animation = silent(&clock, linear(1000));
        assert_eq!(animation.keyframe_count(), 2);

        let sprung = Animation::new(
            clock.clone(),
            |_| {},
            &[0.0, 100.0],
            AnimationOptions::default().generator(crate::spring::SpringGenerator::default()),
        )
        .unwrap();
        assert!(sprung.keyframe_count() > 2);
    }
}

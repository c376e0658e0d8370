//! Frame scheduling
//!
//! Animations never read a global clock. They are handed a [`FrameClock`]
//! that can schedule a one-shot callback for the next display frame, cancel
//! it, and report the current time.
//!
//! [`FrameScheduler`] is the host-driven implementation: the embedding
//! application (or a test) calls [`FrameScheduler::tick`] once per refresh
//! with the frame timestamp, and every callback registered before that tick
//! runs exactly once with it.

use slotmap::{new_key_type, SlotMap};
use std::sync::{Arc, Mutex, MutexGuard};

new_key_type! {
    /// Handle to a scheduled frame callback
    pub struct FrameId;
}

/// One-shot frame callback, invoked with the frame timestamp in milliseconds
pub type FrameCallback = Box<dyn FnOnce(f64) + Send>;

/// The frame clock collaborator animations are driven by
pub trait FrameClock: Send + Sync {
    /// Run `callback` once on the next frame
    fn schedule_frame(&self, callback: FrameCallback) -> FrameId;

    /// Drop a scheduled callback; unknown or already-run ids are ignored
    fn cancel_frame(&self, id: FrameId);

    /// Monotonic time in milliseconds
    fn now(&self) -> f64;
}

// ============================================================================
// Host-driven scheduler
// ============================================================================

struct SchedulerInner {
    callbacks: SlotMap<FrameId, FrameCallback>,
    /// Registration order, so callbacks run first-come first-served
    order: Vec<FrameId>,
    now: f64,
    frame_count: u64,
}

/// Frame clock driven by explicit [`tick`](Self::tick) calls
///
/// Cloning yields another handle to the same queue, so one clone can be
/// given to animations while another drives frames.
#[derive(Clone)]
pub struct FrameScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    /// Scheduler whose clock reads `now` until the first tick
    pub fn starting_at(now: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerInner {
                callbacks: SlotMap::with_key(),
                order: Vec::new(),
                now,
                frame_count: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Run one frame at `timestamp`
    ///
    /// Callbacks scheduled while this frame runs wait for the next tick.
    /// Returns the number of callbacks invoked.
    pub fn tick(&self, timestamp: f64) -> usize {
        let due = {
            let mut inner = self.lock();
            let timestamp = if timestamp < inner.now {
                tracing::warn!(
                    timestamp,
                    now = inner.now,
                    "frame timestamp went backwards, clamping"
                );
                inner.now
            } else {
                timestamp
            };
            inner.now = timestamp;
            inner.frame_count += 1;

            let order = std::mem::take(&mut inner.order);
            let mut due = Vec::with_capacity(order.len());
            for id in order {
                if let Some(callback) = inner.callbacks.remove(id) {
                    due.push(callback);
                }
            }
            due
        };

        let now = self.now();
        let count = due.len();
        for callback in due {
            callback(now);
        }
        tracing::trace!(timestamp = now, callbacks = count, "frame");
        count
    }

    /// Tick `dt` milliseconds after the current time
    pub fn advance(&self, dt: f64) -> usize {
        let next = self.now() + dt.max(0.0);
        self.tick(next)
    }

    /// Run `count` frames spaced `interval` milliseconds apart
    pub fn run_frames(&self, count: usize, interval: f64) -> usize {
        (0..count).map(|_| self.advance(interval)).sum()
    }

    /// Move the clock without running a frame
    ///
    /// Time never moves backwards; an earlier `timestamp` is ignored.
    pub fn set_now(&self, timestamp: f64) {
        let mut inner = self.lock();
        if timestamp > inner.now {
            inner.now = timestamp;
        }
    }

    pub fn pending_frames(&self) -> usize {
        self.lock().callbacks.len()
    }

    pub fn has_pending_frames(&self) -> bool {
        self.pending_frames() > 0
    }

    /// Number of frames ticked so far
    pub fn frame_count(&self) -> u64 {
        self.lock().frame_count
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for FrameScheduler {
    fn schedule_frame(&self, callback: FrameCallback) -> FrameId {
        let mut inner = self.lock();
        let id = inner.callbacks.insert(callback);
        inner.order.push(id);
        id
    }

    fn cancel_frame(&self, id: FrameId) {
        let mut inner = self.lock();
        if inner.callbacks.remove(id).is_some() {
            inner.order.retain(|queued| *queued != id);
        }
    }

    fn now(&self) -> f64 {
        self.lock().now
    }
}

impl<C: FrameClock + ?Sized> FrameClock for Arc<C> {
    fn schedule_frame(&self, callback: FrameCallback) -> FrameId {
        (**self).schedule_frame(callback)
    }

    fn cancel_frame(&self, id: FrameId) {
        (**self).cancel_frame(id)
    }

    fn now(&self) -> f64 {
        (**self).now()
    }
}

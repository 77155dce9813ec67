use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of frame timestamps, in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Milliseconds elapsed on the monotonic clock since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock advanced by hand. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            millis: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, millis: f64) {
        self.millis.set(millis);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.millis.set(self.millis.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.millis.get()
    }
}

/// The one number shared between the render tick (writer) and the status
/// updater (reader).
///
/// Assumes a single writer and a single reader. Both tasks run on the same
/// event loop, so relaxed loads and stores suffice and a stale read shows the
/// previous tick's rate. The atomic keeps this valid if the reader moves to
/// another thread; nothing stronger is guaranteed.
#[derive(Debug, Clone, Default)]
pub struct FpsCell {
    bits: Arc<AtomicU64>,
}

impl FpsCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn store(&self, fps: f64) {
        self.bits.store(fps.to_bits(), Ordering::Relaxed);
    }
}

/// Result of advancing the [`FrameClock`] by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    pub delta_ms: f64,
    pub fps: f64,
}

/// Single-sample frame rate from one inter-frame interval.
///
/// A zero interval gives a non-finite rate; callers pass it through as is.
pub fn instantaneous_fps(delta_ms: f64) -> f64 {
    1000.0 / delta_ms
}

/// Timestamp of the previous tick plus the latest instantaneous rate.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_frame_ms: f64,
    fps: FpsCell,
}

impl FrameClock {
    /// Starts the clock at `start_ms` with a rate of zero.
    pub fn new(start_ms: f64) -> Self {
        let fps = FpsCell::new();
        fps.store(0.0);
        Self {
            last_frame_ms: start_ms,
            fps,
        }
    }

    /// Records a tick at `now_ms`. No smoothing: every tick replaces the
    /// stored rate with a fresh single-interval estimate.
    pub fn advance(&mut self, now_ms: f64) -> FrameSample {
        let delta_ms = now_ms - self.last_frame_ms;
        self.last_frame_ms = now_ms;
        let fps = instantaneous_fps(delta_ms);
        self.fps.store(fps);
        FrameSample { delta_ms, fps }
    }

    pub fn last_frame_ms(&self) -> f64 {
        self.last_frame_ms
    }

    /// Handle for readers of the latest rate.
    pub fn fps(&self) -> FpsCell {
        self.fps.clone()
    }
}

use std::time::{Duration, Instant};

use tracing::info;

use crate::timing::FpsCell;

/// Write-only port onto the text element showing the frame rate.
pub trait StatusSink {
    fn show(&mut self, text: &str);
}

/// Status sink that reports through the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn show(&mut self, text: &str) {
        info!(target: "mirrortrace::fps", "{text}");
    }
}

/// Formats a rate as `FPS: X.X fps` with one decimal. `{:.1}` rounds the
/// exact binary value and sends exact ties to the even digit, so `31.25`
/// prints as `31.2`. Non-finite rates print as `inf`, `-inf` or `NaN`.
pub fn format_fps(fps: f64) -> String {
    format!("FPS: {fps:.1} fps")
}

/// Periodic reader of the shared rate.
///
/// Refreshes happen on a fixed period that is independent of the render
/// rate. A poll that arrives more than one period late refreshes once and
/// re-anchors to the current time instead of bursting.
pub struct FpsDisplay<S> {
    sink: S,
    fps: FpsCell,
    period: Duration,
    next_due: Instant,
}

impl<S: StatusSink> FpsDisplay<S> {
    /// First refresh is due one period after `now`.
    pub fn new(sink: S, fps: FpsCell, period: Duration, now: Instant) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            sink,
            fps,
            period,
            next_due: now + period,
        }
    }

    pub fn next_deadline(&self) -> Instant {
        self.next_due
    }

    /// Refreshes if a period has elapsed. Returns whether the sink was written.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.refresh();
        self.next_due += self.period;
        if self.next_due <= now {
            self.next_due = now + self.period;
        }
        true
    }

    /// Writes the current rate to the sink unconditionally.
    pub fn refresh(&mut self) {
        let text = format_fps(self.fps.load());
        self.sink.show(&text);
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    const PERIOD: Duration = Duration::from_millis(300);

    #[test]
    fn formats_one_decimal() {
        assert_eq!(format_fps(60.0), "FPS: 60.0 fps");
        assert_eq!(format_fps(59.98800239952), "FPS: 60.0 fps");
        assert_eq!(format_fps(0.0), "FPS: 0.0 fps");
        assert_eq!(format_fps(144.27), "FPS: 144.3 fps");
        assert_eq!(format_fps(31.25), "FPS: 31.2 fps");
        assert_eq!(format_fps(31.75), "FPS: 31.8 fps");
    }

    #[test]
    fn formats_non_finite_rates() {
        assert_eq!(format_fps(f64::INFINITY), "FPS: inf fps");
        assert_eq!(format_fps(f64::NAN), "FPS: NaN fps");
    }

    #[test]
    fn refreshes_only_when_period_elapsed() {
        let start = Instant::now();
        let sink = RecordingSink::default();
        let fps = FpsCell::new();
        fps.store(60.0);
        let mut display = FpsDisplay::new(sink.clone(), fps.clone(), PERIOD, start);

        assert!(!display.poll(start + Duration::from_millis(100)));
        assert!(display.poll(start + PERIOD));
        fps.store(30.0);
        assert!(!display.poll(start + Duration::from_millis(500)));
        assert!(display.poll(start + Duration::from_millis(600)));

        assert_eq!(sink.lines(), vec!["FPS: 60.0 fps", "FPS: 30.0 fps"]);
    }

    #[test]
    fn late_poll_refreshes_once_and_reanchors() {
        let start = Instant::now();
        let sink = RecordingSink::default();
        let mut display = FpsDisplay::new(sink.clone(), FpsCell::new(), PERIOD, start);

        let late = start + Duration::from_millis(2000);
        assert!(display.poll(late));
        assert!(!display.poll(late));
        assert_eq!(display.next_deadline(), late + PERIOD);
        assert_eq!(sink.lines().len(), 1);
    }

    #[test]
    fn shows_whatever_the_tick_last_stored() {
        let start = Instant::now();
        let sink = RecordingSink::default();
        let fps = FpsCell::new();
        let mut display = FpsDisplay::new(sink.clone(), fps.clone(), PERIOD, start);
        fps.store(f64::INFINITY);
        display.refresh();
        assert_eq!(sink.lines(), vec!["FPS: inf fps"]);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Requests the next display-synchronised tick.
///
/// The harness calls this once at the end of every tick. Each request yields
/// at most one further tick.
pub trait TickScheduler {
    fn schedule_next(&mut self);
}

/// Scheduler that only counts requests; the caller drains them.
#[derive(Debug, Default)]
pub struct QueuedScheduler {
    pending: usize,
}

impl QueuedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one pending request.
    pub fn take(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }

    pub fn pending(&self) -> usize {
        self.pending
    }
}

impl TickScheduler for QueuedScheduler {
    fn schedule_next(&mut self) {
        self.pending += 1;
    }
}

/// Stops the loop: once cancelled, ticks stop rescheduling themselves.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_requests_drain_one_at_a_time() {
        let mut scheduler = QueuedScheduler::new();
        scheduler.schedule_next();
        scheduler.schedule_next();
        assert_eq!(scheduler.pending(), 2);
        assert!(scheduler.take());
        assert!(scheduler.take());
        assert!(!scheduler.take());
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }
}

//! Deadline-based debounce for delayed requests such as hover.

use std::time::{Duration, Instant};

/// Fires once `delay` has passed since the last [`Debounce::schedule`].
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    /// Create an idle debounce.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)start the delay at `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Drop a scheduled firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// When the next firing is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a firing is scheduled.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` once, when the deadline has passed at `now`.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reschedule_pushes_deadline() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_millis(150));
        debounce.schedule(start);
        debounce.schedule(start + Duration::from_millis(100));

        assert!(!debounce.fire(start + Duration::from_millis(200)));
        assert!(debounce.fire(start + Duration::from_millis(250)));
        assert!(!debounce.fire(start + Duration::from_millis(300)));
        assert!(!debounce.is_pending());
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::ZERO);
        debounce.schedule(start);
        debounce.cancel();
        assert!(!debounce.fire(start));
        assert_eq!(debounce.deadline(), None);
    }
}

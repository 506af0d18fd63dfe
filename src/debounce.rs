use std::time::{Duration, Instant};

/// Quiet period a burst of randomize requests must observe before one applies.
pub const RANDOMIZE_WINDOW: Duration = Duration::from_millis(800);
/// Time after an apply during which new requests are ignored.
pub const RANDOMIZE_SETTLE: Duration = Duration::from_millis(300);

/// Trailing-edge debouncer with an in-flight lockout.
///
/// Each `trigger` restarts the quiet window; `poll` fires once the window
/// elapses and then locks out triggers for the settle period.
#[derive(Clone, Debug)]
pub struct Debouncer {
    window: Duration,
    settle: Duration,
    deadline: Option<Instant>,
    settling_until: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration, settle: Duration) -> Self {
        Self {
            window,
            settle,
            deadline: None,
            settling_until: None,
        }
    }

    pub fn for_randomize() -> Self {
        Self::new(RANDOMIZE_WINDOW, RANDOMIZE_SETTLE)
    }

    /// Request a fire. Ignored (returns false) while a previous fire is settling.
    pub fn trigger(&mut self, now: Instant) -> bool {
        if self.in_flight(now) {
            return false;
        }
        self.deadline = Some(now + self.window);
        true
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                if self.in_flight(now) {
                    return false;
                }
                self.settling_until = Some(now + self.settle);
                true
            }
            _ => false,
        }
    }

    pub fn in_flight(&self, now: Instant) -> bool {
        self.settling_until.is_some_and(|until| now < until)
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::for_randomize()
    }
}

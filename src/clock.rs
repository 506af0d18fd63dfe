//! Animation time and the rate-limited tick schedule that advances it.

use std::time::{Duration, Instant};

/// Field re-evaluation cadence (20 ticks per second).
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound of the audio-derived time increment.
pub const MAX_AUDIO_INCREMENT: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerState {
    Idle,
    Armed { due: Instant },
}

/// Cancellable repeating timer with at most one tick outstanding.
///
/// A due tick is delivered by `poll`, which re-arms the timer one interval
/// after the delivery instant. Missed intervals are not replayed. After
/// `cancel` no tick is delivered until `start` is called again.
#[derive(Clone, Debug)]
pub struct FrameTimer {
    interval: Duration,
    state: TimerState,
}

impl FrameTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: TimerState::Idle,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn start(&mut self, now: Instant) {
        self.state = TimerState::Armed { due: now + self.interval };
    }

    pub fn cancel(&mut self) {
        self.state = TimerState::Idle;
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, TimerState::Armed { .. })
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Armed { due } if now >= due => {
                self.state = TimerState::Armed { due: now + self.interval };
                true
            }
            _ => false,
        }
    }

    /// Time left before the next tick, `None` when idle.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        match self.state {
            TimerState::Armed { due } => Some(due.saturating_duration_since(now)),
            TimerState::Idle => None,
        }
    }
}

/// Owner of the animation time `t`.
#[derive(Clone, Debug)]
pub struct AnimationClock {
    t: f64,
    running: bool,
    audio_reactive: bool,
    timer: FrameTimer,
}

impl AnimationClock {
    /// A running clock at `t = 0`; the first tick is due one interval after `now`.
    pub fn new(now: Instant) -> Self {
        let mut timer = FrameTimer::new(TICK_INTERVAL);
        timer.start(now);
        Self {
            t: 0.0,
            running: true,
            audio_reactive: false,
            timer,
        }
    }

    pub fn paused() -> Self {
        Self {
            t: 0.0,
            running: false,
            audio_reactive: false,
            timer: FrameTimer::new(TICK_INTERVAL),
        }
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_audio_reactive(&mut self, on: bool) {
        self.audio_reactive = on;
    }

    /// Flip between running and paused. Returns the new running state.
    pub fn toggle(&mut self, now: Instant) -> bool {
        if self.running {
            self.stop();
        } else {
            self.running = true;
            self.timer.start(now);
        }
        self.running
    }

    /// Pause and drop any scheduled tick.
    pub fn stop(&mut self) {
        self.running = false;
        self.timer.cancel();
    }

    pub fn step_forward(&mut self) {
        self.t += 1.0;
    }

    pub fn step_backward(&mut self) {
        self.t -= 1.0;
    }

    /// Per-tick increment: 1, or the normalized audio energy in audio-reactive mode.
    pub fn increment(&self, energy: Option<f32>) -> f64 {
        match (self.audio_reactive, energy) {
            (true, Some(e)) if e.is_finite() => e.clamp(0.0, MAX_AUDIO_INCREMENT) as f64,
            _ => 1.0,
        }
    }

    /// Deliver at most one due tick. Returns true when `t` advanced.
    pub fn poll(&mut self, now: Instant, energy: Option<f32>) -> bool {
        if !self.running || !self.timer.poll(now) {
            return false;
        }
        self.t += self.increment(energy);
        true
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.timer.time_until_due(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_delivers_one_tick_per_interval() {
        let t0 = Instant::now();
        let mut timer = FrameTimer::new(Duration::from_millis(50));
        timer.start(t0);
        assert!(!timer.poll(t0 + Duration::from_millis(49)));
        assert!(timer.poll(t0 + Duration::from_millis(50)));
        // A late poll still delivers only one tick.
        assert!(timer.poll(t0 + Duration::from_millis(500)));
        assert!(!timer.poll(t0 + Duration::from_millis(520)));
    }

    #[test]
    fn increment_falls_back_without_energy() {
        let mut clock = AnimationClock::paused();
        clock.set_audio_reactive(true);
        assert_eq!(clock.increment(None), 1.0);
        assert_eq!(clock.increment(Some(f32::NAN)), 1.0);
        assert_eq!(clock.increment(Some(5.0)), 2.0);
        assert_eq!(clock.increment(Some(0.5)), 0.5);
    }
}

//! Status ticker: rotating flavor text while Analyzing. Cosmetic only.

use std::time::Duration;
use rand::seq::SliceRandom;
use rand::Rng;

pub const STATUS_IDLE: &str = "READY";
pub const STATUS_INITIALIZING: &str = "INITIALIZING...";

pub const STATUS_MESSAGES: [&str; 6] = [
    "READING BIOMETRICS...",
    "ANALYZING MICRO-TREMORS...",
    "CHECKING VOICE PATTERN...",
    "CROSS-REFERENCING DATABASE...",
    "DETECTING SWEAT RESPONSE...",
    "CALCULATING PROBABILITY...",
];

/// Periodic timer that picks a random status message each interval
#[derive(Debug, Clone)]
pub struct StatusTicker {
    interval: Duration,
    next_due: Option<Duration>,
    ticks: u64,
}

/// Shortest period the ticker will run at
const MIN_INTERVAL: Duration = Duration::from_millis(1);

impl StatusTicker {
    /// Intervals below 1 ms are raised to 1 ms
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            next_due: None,
            ticks: 0,
        }
    }

    /// Arm the ticker; first tick one interval after `now`
    pub fn start(&mut self, now: Duration) {
        self.next_due = Some(now + self.interval);
        self.ticks = 0;
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Ticks fired since `start`
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Fire at most once per poll. A slow host skips missed ticks rather
    /// than bursting them.
    pub fn poll<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) -> Option<&'static str> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        let mut next = due + self.interval;
        while next <= now {
            next += self.interval;
        }
        self.next_due = Some(next);
        self.ticks += 1;
        STATUS_MESSAGES.choose(rng).copied()
    }
}

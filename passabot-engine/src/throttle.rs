//! Notification throttling.
//!
//! Availability that persists for many consecutive cycles is still reported
//! every cycle, but after a streak of `threshold` cycles the messages are
//! delivered silently. The first cycle after an empty one always alerts.

/// Default streak length after which messages go silent.
pub const DEFAULT_SILENCE_THRESHOLD: u32 = 20;

/// What to do with the records of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing was found; nothing to send.
    Nothing,
    /// Send with an audible alert.
    Loud,
    /// Send without an alert.
    Silent,
}

impl Delivery {
    /// Returns true for [`Delivery::Silent`].
    pub fn is_silent(self) -> bool {
        self == Self::Silent
    }
}

/// Streak counter owned by one poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationThrottle {
    streak: u32,
    threshold: u32,
}

impl Default for NotificationThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_THRESHOLD)
    }
}

impl NotificationThrottle {
    /// Creates a throttle with an empty streak.
    pub fn new(threshold: u32) -> Self {
        Self {
            streak: 0,
            threshold: threshold.max(1),
        }
    }

    /// Current streak length.
    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Streak length at which messages go silent.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Records the outcome of a cycle with `count` eligible records.
    pub fn observe(&mut self, count: usize) -> Delivery {
        if count == 0 {
            self.streak = 0;
            return Delivery::Nothing;
        }

        self.streak = self.streak.saturating_add(1);
        if self.streak >= self.threshold {
            Delivery::Silent
        } else {
            Delivery::Loud
        }
    }
}

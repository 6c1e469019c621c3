//! Absolute deadlines for blocking driver calls.
//!
//! A [`Deadline`] is fixed once at the start of a call. Each underlying
//! transport operation receives only the [`remaining`](Deadline::remaining)
//! budget, so repeated reads never extend the caller's timeout.

use std::time::{Duration, Instant};

/// Point in time after which a blocking call gives up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    started: Instant,
    at: Instant,
}

impl Deadline {
    /// Deadline expiring `timeout` from now.
    ///
    /// Timeouts too large to represent saturate to roughly a century.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        let started = Instant::now();
        let at = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + Duration::from_secs(100 * 365 * 24 * 3600));
        Self { started, at }
    }

    /// Time left before expiry, zero once elapsed.
    #[must_use]
    pub fn remaining(&self) -> Duration { self.at.saturating_duration_since(Instant::now()) }

    /// Returns true once the deadline has been reached.
    #[must_use]
    pub fn has_elapsed(&self) -> bool { Instant::now() >= self.at }

    /// Budget the deadline was created with.
    #[must_use]
    pub fn budget(&self) -> Duration { self.at.duration_since(self.started) }
}

//! Metric helpers for `iodrivers`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking packets moved through drivers.
pub const PACKETS_TOTAL: &str = "iodrivers_packets_total";
/// Name of the counter tracking bytes moved through drivers.
pub const BYTES_TOTAL: &str = "iodrivers_bytes_total";
/// Name of the counter tracking inbound bytes dropped as garbage.
pub const DISCARDED_BYTES_TOTAL: &str = "iodrivers_discarded_bytes_total";
/// Name of the counter tracking expired read and write deadlines.
pub const TIMEOUTS_TOTAL: &str = "iodrivers_timeouts_total";

/// Direction of packet flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Packets extracted from the receive buffer.
    Inbound,
    /// Packets written towards the device.
    Outbound,
}

impl Direction {
    /// Label value used in metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record one packet of `len` bytes moving in `direction`.
#[cfg(feature = "metrics")]
pub fn record_packet(direction: Direction, len: usize) {
    counter!(PACKETS_TOTAL, "direction" => direction.as_str()).increment(1);
    counter!(BYTES_TOTAL, "direction" => direction.as_str()).increment(len as u64);
}

/// Record `count` inbound bytes dropped as garbage.
#[cfg(feature = "metrics")]
pub fn record_discarded(count: usize) { counter!(DISCARDED_BYTES_TOTAL).increment(count as u64); }

/// Record an expired deadline.
#[cfg(feature = "metrics")]
pub fn record_timeout(direction: Direction) {
    counter!(TIMEOUTS_TOTAL, "direction" => direction.as_str()).increment(1);
}

/// Record one packet of `len` bytes moving in `direction`.
#[cfg(not(feature = "metrics"))]
pub fn record_packet(_direction: Direction, _len: usize) {}

/// Record `count` inbound bytes dropped as garbage.
#[cfg(not(feature = "metrics"))]
pub fn record_discarded(_count: usize) {}

/// Record an expired deadline.
#[cfg(not(feature = "metrics"))]
pub fn record_timeout(_direction: Direction) {}

//! Per-driver traffic counters.

use std::time::Instant;

/// Byte counters for one driver instance.
///
/// `good_rx` counts bytes delivered inside packets, `bad_rx` counts bytes
/// dropped as garbage or superseded in extract-last mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Bytes handed to the transport (or matched by the mock).
    pub tx: u64,
    /// Bytes delivered as packets.
    pub good_rx: u64,
    /// Bytes dropped without being delivered.
    pub bad_rx: u64,
    /// Bytes currently waiting in the receive buffer.
    pub queued_bytes: usize,
    /// Time of the last successful read or write.
    pub stamp: Option<Instant>,
}

impl DriverStats {
    pub(crate) fn on_tx(&mut self, len: usize) {
        self.tx += len as u64;
        self.stamp = Some(Instant::now());
    }

    pub(crate) fn on_rx(&mut self, len: usize) {
        self.good_rx += len as u64;
        self.stamp = Some(Instant::now());
    }

    pub(crate) fn on_bad_rx(&mut self, len: usize) { self.bad_rx += len as u64; }
}

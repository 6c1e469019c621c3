//! Driver configuration.
//!
//! [`DriverConfig`] bundles the sizing and timing knobs of a
//! [`Driver`](crate::Driver). All setters follow the builder style and clamp
//! out-of-range values instead of failing.

use std::time::Duration;

/// Smallest accepted maximum packet size.
pub const MIN_PACKET_SIZE: usize = 1;

/// Largest accepted maximum packet size (16 MiB).
pub const MAX_PACKET_SIZE: usize = 16 * 1024 * 1024;

/// Default maximum packet size.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1024;

/// Internal buffer size as a multiple of the maximum packet size.
pub const BUFFER_PACKET_RATIO: usize = 10;

/// Default timeout for reads and writes when the caller gives none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Sizing and timing configuration for a driver.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use iodrivers::DriverConfig;
///
/// let config = DriverConfig::default()
///     .max_packet_size(256)
///     .read_timeout(Duration::from_millis(50));
/// assert_eq!(config.max_packet_size_value(), 256);
/// assert_eq!(config.internal_buffer_size_value(), 2560);
/// assert_eq!(config.read_timeout_value(), Duration::from_millis(50));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverConfig {
    max_packet_size: usize,
    internal_buffer_size: Option<usize>,
    read_timeout: Duration,
    write_timeout: Duration,
    extract_last: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            internal_buffer_size: None,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            extract_last: false,
        }
    }
}

impl DriverConfig {
    /// Set the largest packet the driver expects.
    ///
    /// The value is clamped between [`MIN_PACKET_SIZE`] and
    /// [`MAX_PACKET_SIZE`].
    #[must_use]
    pub fn max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size.clamp(MIN_PACKET_SIZE, MAX_PACKET_SIZE);
        self
    }

    /// Set the receive buffer capacity.
    ///
    /// Values below the maximum packet size are raised to it. When unset the
    /// buffer holds [`BUFFER_PACKET_RATIO`] maximum-size packets.
    #[must_use]
    pub fn internal_buffer_size(mut self, size: usize) -> Self {
        self.internal_buffer_size = Some(size);
        self
    }

    /// Set the timeout used by reads that do not pass one.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the timeout used by writes that do not pass one.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Return only the newest packet when several are already buffered.
    #[must_use]
    pub fn extract_last(mut self, enabled: bool) -> Self {
        self.extract_last = enabled;
        self
    }

    /// Configured maximum packet size.
    #[must_use]
    pub const fn max_packet_size_value(&self) -> usize { self.max_packet_size }

    /// Effective receive buffer capacity.
    #[must_use]
    pub fn internal_buffer_size_value(&self) -> usize {
        self.internal_buffer_size
            .unwrap_or_else(|| self.max_packet_size.saturating_mul(BUFFER_PACKET_RATIO))
            .max(self.max_packet_size)
    }

    /// Default read timeout.
    #[must_use]
    pub const fn read_timeout_value(&self) -> Duration { self.read_timeout }

    /// Default write timeout.
    #[must_use]
    pub const fn write_timeout_value(&self) -> Duration { self.write_timeout }

    /// Whether extract-last mode is enabled.
    #[must_use]
    pub const fn extract_last_value(&self) -> bool { self.extract_last }
}

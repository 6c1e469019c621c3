//! Canonical error and result types for the crate.
//!
//! Every failure a driver can report maps to its own [`DriverError`] variant
//! so callers can branch on the cause instead of parsing messages.
//!
//! # Error Categories
//!
//! - Engine errors: [`DriverError::Timeout`], [`DriverError::BufferFull`],
//!   [`DriverError::ExtractorOverrun`].
//! - Transport errors: [`DriverError::NotOpen`], [`DriverError::Io`].
//! - Mock harness errors: [`DriverError::MockContext`], [`DriverError::UnexpectedData`],
//!   [`DriverError::NoExpectation`], [`DriverError::UnmetExpectations`],
//!   [`DriverError::NotTestStream`].

use std::{io, time::Duration};

use bytes::Bytes;
use thiserror::Error;

/// Reasons a mock-only operation was rejected.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum MockContextError {
    /// A mock operation was invoked without an active mock context.
    #[error("no mock context is active on this driver")]
    Inactive,
    /// A mock context was requested while another one is still active.
    #[error("a mock context is already active on this driver")]
    AlreadyActive,
}

/// Top-level error type exposed by `iodrivers`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use iodrivers::DriverError;
///
/// let err = DriverError::Timeout {
///     timeout: Duration::from_millis(10),
/// };
/// assert!(err.is_timeout());
/// assert_eq!(err.error_type(), "timeout");
/// ```
#[derive(Debug, Error)]
pub enum DriverError {
    /// The deadline of a read or write elapsed before it could complete.
    #[error("operation timed out after {timeout:?}")]
    Timeout {
        /// Time budget the caller allowed.
        timeout: Duration,
    },

    /// A mock-only operation was invoked in the wrong mock state.
    #[error("mock context error: {0}")]
    MockContext(#[from] MockContextError),

    /// Written bytes differ from the oldest queued expectation.
    #[error("unexpected data written: expected {expected:x}, got {actual:x}")]
    UnexpectedData {
        /// Bytes the head expectation is waiting for.
        expected: Bytes,
        /// Bytes that were actually written.
        actual: Bytes,
    },

    /// A write happened while the mock was active but nothing was expected.
    #[error("no expectation left for written data {actual:x}")]
    NoExpectation {
        /// Bytes that were written.
        actual: Bytes,
    },

    /// Expectations remain queued when the caller asserted none should.
    #[error("{remaining} expectation(s) were not met")]
    UnmetExpectations {
        /// Number of expectations still queued.
        remaining: usize,
    },

    /// The receive buffer has no room left for inbound bytes.
    #[error("receive buffer is full ({capacity} bytes)")]
    BufferFull {
        /// Configured internal buffer size.
        capacity: usize,
    },

    /// The packet extractor claimed more bytes than are buffered.
    #[error("extractor reported {reported} bytes but only {available} are buffered")]
    ExtractorOverrun {
        /// Byte count returned by the extractor.
        reported: usize,
        /// Bytes held by the receive buffer.
        available: usize,
    },

    /// The driver has no open transport.
    #[error("driver is not open")]
    NotOpen,

    /// A test-stream accessor was used on a driver opened on another transport.
    #[error("driver is not opened on a test stream")]
    NotTestStream,

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

impl DriverError {
    /// Returns true if this error is a deadline expiry.
    #[must_use]
    pub fn is_timeout(&self) -> bool { matches!(self, Self::Timeout { .. }) }

    /// Returns true if this error comes from the mock harness.
    #[must_use]
    pub fn is_mock_error(&self) -> bool {
        matches!(
            self,
            Self::MockContext(_)
                | Self::UnexpectedData { .. }
                | Self::NoExpectation { .. }
                | Self::UnmetExpectations { .. }
        )
    }

    /// Returns the error category as a string for logging and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::MockContext(_) => "mock_context",
            Self::UnexpectedData { .. } => "unexpected_data",
            Self::NoExpectation { .. } => "no_expectation",
            Self::UnmetExpectations { .. } => "unmet_expectations",
            Self::BufferFull { .. } => "buffer_full",
            Self::ExtractorOverrun { .. } => "extractor_overrun",
            Self::NotOpen => "not_open",
            Self::NotTestStream => "not_test_stream",
            Self::Io(_) => "io",
        }
    }
}

impl From<DriverError> for io::Error {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Io(e) => e,
            DriverError::Timeout { .. } => io::Error::new(io::ErrorKind::TimedOut, err),
            DriverError::NotOpen => io::Error::new(io::ErrorKind::NotConnected, err),
            other => io::Error::other(other),
        }
    }
}

/// Canonical result alias used by `iodrivers` public APIs.
pub type Result<T> = std::result::Result<T, DriverError>;

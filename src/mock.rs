//! Scripted request/reply double for protocol tests.
//!
//! While a [`MockContext`] is alive, every packet written through the driver
//! is compared against the oldest queued [`Expectation`] instead of reaching
//! the transport. A match pops the expectation and appends its reply to the
//! receive buffer as if the device had answered; a mismatch fails the write
//! and leaves the queue untouched.
//!
//! ```
//! use iodrivers::{Driver, frame::WholeBuffer};
//!
//! let mut driver = Driver::new(WholeBuffer, 64);
//! let mut mock = driver.activate_mock().expect("no other mock is active");
//! mock.expect_reply(vec![0x01_u8], vec![0x81_u8]).expect("mock is active");
//!
//! mock.write_packet(&[0x01], None).expect("write matches");
//! let reply = mock.read_packet(Some(std::time::Duration::ZERO)).expect("reply buffered");
//! assert_eq!(reply.as_ref(), &[0x81]);
//! mock.finish().expect("all expectations met");
//! ```

use std::{
    collections::VecDeque,
    fmt,
    ops::{Deref, DerefMut},
};

use bytes::Bytes;
use tracing::warn;

use crate::{
    driver::Driver,
    error::{DriverError, MockContextError, Result},
};

/// One scripted exchange: bytes the device should receive and its answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expectation {
    /// Exact bytes the next write must carry.
    pub expected: Bytes,
    /// Bytes injected into the receive buffer once matched.
    pub reply: Bytes,
}

/// Activation state of the mock, owned by one driver.
#[derive(Debug, Default)]
pub(crate) enum MockState {
    #[default]
    Inactive,
    Active(VecDeque<Expectation>),
}

impl MockState {
    pub(crate) fn is_active(&self) -> bool { matches!(self, Self::Active(_)) }

    pub(crate) fn activate(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(MockContextError::AlreadyActive.into());
        }
        *self = Self::Active(VecDeque::new());
        Ok(())
    }

    /// Leave the active state, returning how many expectations were dropped.
    pub(crate) fn deactivate(&mut self) -> usize {
        match std::mem::take(self) {
            Self::Active(queue) => queue.len(),
            Self::Inactive => 0,
        }
    }

    pub(crate) fn queue(&self) -> Result<&VecDeque<Expectation>> {
        match self {
            Self::Active(queue) => Ok(queue),
            Self::Inactive => Err(MockContextError::Inactive.into()),
        }
    }

    pub(crate) fn queue_mut(&mut self) -> Result<&mut VecDeque<Expectation>> {
        match self {
            Self::Active(queue) => Ok(queue),
            Self::Inactive => Err(MockContextError::Inactive.into()),
        }
    }

    pub(crate) fn validate_empty(&self) -> Result<()> {
        let remaining = self.queue()?.len();
        if remaining > 0 {
            return Err(DriverError::UnmetExpectations { remaining });
        }
        Ok(())
    }
}

/// Scope guard keeping the mock of one driver active.
///
/// Obtained from [`Driver::activate_mock`]. The guard dereferences to the
/// driver so reads and writes go through it. Dropping the guard deactivates
/// the mock and discards any expectations still queued; use
/// [`finish`](Self::finish) to assert they were all met.
pub struct MockContext<'d, E> {
    driver: &'d mut Driver<E>,
}

impl<'d, E> MockContext<'d, E> {
    pub(crate) fn new(driver: &'d mut Driver<E>) -> Self { Self { driver } }

    /// Queue an exchange: the next unmatched write must equal `expected`,
    /// and `reply` is then delivered as inbound data.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MockContext`] if the mock was deactivated.
    pub fn expect_reply(
        &mut self,
        expected: impl Into<Bytes>,
        reply: impl Into<Bytes>,
    ) -> Result<()> {
        self.driver.expect_reply(expected, reply)
    }

    /// Fail if any expectation is still queued.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::UnmetExpectations`] when the queue is not empty.
    pub fn validate_expectations_are_empty(&self) -> Result<()> {
        self.driver.validate_expectations_are_empty()
    }

    /// Drop every queued expectation.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MockContext`] if the mock was deactivated.
    pub fn clear_expectations(&mut self) -> Result<()> { self.driver.clear_expectations() }

    /// Number of expectations still queued.
    #[must_use]
    pub fn pending_expectations(&self) -> usize {
        self.driver.mock.queue().map_or(0, VecDeque::len)
    }

    /// Check that every expectation was met, then deactivate the mock.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::UnmetExpectations`] when expectations remain.
    /// The mock is deactivated either way.
    pub fn finish(self) -> Result<()> {
        let outcome = self.driver.validate_expectations_are_empty();
        if outcome.is_err() {
            self.driver.mock.deactivate();
        }
        outcome
    }
}

impl<E> fmt::Debug for MockContext<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockContext")
            .field("pending_expectations", &self.pending_expectations())
            .finish_non_exhaustive()
    }
}

impl<E> Deref for MockContext<'_, E> {
    type Target = Driver<E>;

    fn deref(&self) -> &Self::Target { self.driver }
}

impl<E> DerefMut for MockContext<'_, E> {
    fn deref_mut(&mut self) -> &mut Self::Target { self.driver }
}

impl<E> Drop for MockContext<'_, E> {
    fn drop(&mut self) {
        let remaining = self.driver.mock.deactivate();
        if remaining > 0 {
            warn!(remaining, "mock context ended with unmet expectations");
        }
    }
}

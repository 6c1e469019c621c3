//! Per-test driver wrapper.

use std::time::Duration;

use bytes::Bytes;
use iodrivers::{
    Driver,
    DriverConfig,
    MockContext,
    PacketExtractor,
    Result,
    TestStream,
    frame::WholeBuffer,
};
use rstest::fixture;

/// Maximum packet size used by [`whole_buffer`].
pub const DEFAULT_FIXTURE_PACKET_SIZE: usize = 100;

/// A driver opened on a [`TestStream`], with shortcuts for the usual test
/// steps.
///
/// Reads made through the fixture use a zero timeout: they succeed only if a
/// packet can be assembled from bytes already pushed.
///
/// ```
/// use iodrivers::frame::FixedSize;
/// use iodrivers_testing::Fixture;
///
/// let mut fixture = Fixture::new(FixedSize::new(2), 16);
/// fixture.push_data_to_driver(&[0, 1, 2]).expect("buffer has room");
/// assert_eq!(fixture.read_packet().expect("packet").as_ref(), &[0, 1]);
/// assert!(fixture.read_packet().expect_err("one byte left").is_timeout());
/// ```
#[derive(Debug)]
pub struct Fixture<E> {
    driver: Driver<E>,
}

impl<E> Fixture<E> {
    /// Build a driver for `extractor` and open it on a fresh test stream.
    pub fn new(extractor: E, max_packet_size: usize) -> Self {
        Self::with_config(
            extractor,
            DriverConfig::default().max_packet_size(max_packet_size),
        )
    }

    /// Build a driver from `config` and open it on a fresh test stream.
    pub fn with_config(extractor: E, config: DriverConfig) -> Self {
        Self::with_stream(extractor, config, TestStream::new())
    }

    /// Build a driver from `config` and open it on `stream`.
    pub fn with_stream(extractor: E, config: DriverConfig, stream: TestStream) -> Self {
        let mut driver = Driver::with_config(extractor, config);
        driver.open_test_stream_with(stream);
        Self { driver }
    }

    /// The wrapped driver.
    pub fn driver(&self) -> &Driver<E> { &self.driver }

    /// The wrapped driver, mutably.
    pub fn driver_mut(&mut self) -> &mut Driver<E> { &mut self.driver }

    /// Inject bytes directly into the receive buffer.
    ///
    /// # Errors
    ///
    /// Propagates [`iodrivers::DriverError::BufferFull`].
    pub fn push_data_to_driver(&mut self, data: &[u8]) -> Result<()> { self.driver.push_data(data) }

    /// Queue `chunk` on the test stream so the next transport read sees it.
    ///
    /// # Errors
    ///
    /// Fails if the driver was reopened on another transport.
    pub fn push_inbound(&mut self, chunk: impl Into<Bytes>) -> Result<()> {
        self.driver.test_stream_mut()?.push_inbound(chunk);
        Ok(())
    }

    /// Drain the bytes the driver wrote since the previous drain.
    ///
    /// # Errors
    ///
    /// Fails if the driver was reopened on another transport.
    pub fn read_data_from_driver(&mut self) -> Result<Bytes> {
        Ok(self.driver.test_stream_mut()?.take_written())
    }

    /// Write one packet through the driver.
    ///
    /// # Errors
    ///
    /// Propagates the driver's write error.
    pub fn write_packet(&mut self, data: &[u8]) -> Result<()> { self.driver.write_packet(data, None) }

    /// Start a mock scope on the wrapped driver.
    ///
    /// # Errors
    ///
    /// Fails if a mock scope is already active.
    pub fn mock(&mut self) -> Result<MockContext<'_, E>> { self.driver.activate_mock() }

    /// Queue an expectation on the active mock.
    ///
    /// # Errors
    ///
    /// Fails with [`iodrivers::DriverError::MockContext`] when no mock is
    /// active.
    pub fn expect_reply(
        &mut self,
        expected: impl Into<Bytes>,
        reply: impl Into<Bytes>,
    ) -> Result<()> {
        self.driver.expect_reply(expected, reply)
    }

    /// Fail if the active mock still holds expectations.
    ///
    /// # Errors
    ///
    /// See [`Driver::validate_expectations_are_empty`].
    pub fn validate_expectations_are_empty(&self) -> Result<()> {
        self.driver.validate_expectations_are_empty()
    }

    /// Drop every expectation of the active mock.
    ///
    /// # Errors
    ///
    /// Fails when no mock is active.
    pub fn clear_expectations(&mut self) -> Result<()> { self.driver.clear_expectations() }
}

impl<E: PacketExtractor> Fixture<E> {
    /// Read a packet from bytes already in the receive buffer.
    ///
    /// The test stream is not read; use
    /// [`read_packet_within`](Self::read_packet_within) for queued chunks.
    ///
    /// # Errors
    ///
    /// Returns [`iodrivers::DriverError::Timeout`] when no packet is
    /// complete.
    pub fn read_packet(&mut self) -> Result<Bytes> { self.read_packet_within(Duration::ZERO) }

    /// Read a packet, waiting up to `timeout` for the test stream.
    ///
    /// # Errors
    ///
    /// Propagates the driver's read error.
    pub fn read_packet_within(&mut self, timeout: Duration) -> Result<Bytes> {
        self.driver.read_packet(Some(timeout))
    }
}

/// Fixture whose extractor treats every buffered byte as one packet.
#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn whole_buffer() -> Fixture<WholeBuffer> { Fixture::new(WholeBuffer, DEFAULT_FIXTURE_PACKET_SIZE) }

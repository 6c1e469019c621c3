//! Packet driver over a raw byte transport.
//!
//! [`Driver`] owns a receive buffer, a packet extractor and a transport. A
//! read pulls bytes from the transport into the buffer until the extractor
//! reports a complete packet or the deadline passes; a write hands the whole
//! packet to the transport, or to the mock harness while a
//! [`MockContext`] is active.
//!
//! ```
//! use std::time::Duration;
//!
//! use iodrivers::{Driver, frame::Delimited};
//!
//! let mut driver = Driver::new(Delimited::new(b'\n', 64), 64);
//! driver.open_test_stream();
//! driver.push_data(b"ping\npo").expect("buffer has room");
//!
//! let packet = driver.read_packet(Some(Duration::ZERO)).expect("complete line");
//! assert_eq!(packet.as_ref(), b"ping\n");
//! assert!(driver.read_packet(Some(Duration::ZERO)).is_err());
//! ```

use std::{fmt, io, thread, time::Duration};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::{
    buffer::ReceiveBuffer,
    config::DriverConfig,
    deadline::Deadline,
    error::{DriverError, Result},
    frame::PacketExtractor,
    metrics::{self, Direction},
    mock::{Expectation, MockContext, MockState},
    stats::DriverStats,
    transport::{TestStream, Transport},
};

enum Port {
    Closed,
    Test(TestStream),
    External(Box<dyn Transport>),
}

impl Port {
    fn transport(&mut self) -> Option<&mut dyn Transport> {
        match self {
            Port::Closed => None,
            Port::Test(stream) => Some(stream as &mut dyn Transport),
            Port::External(transport) => Some(&mut **transport),
        }
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Closed => f.write_str("Closed"),
            Port::Test(stream) => f.debug_tuple("Test").field(stream).finish(),
            Port::External(_) => f.write_str("External"),
        }
    }
}

/// Packet-oriented driver for one byte-stream device.
///
/// A driver is meant for one thread at a time; every operation takes
/// `&mut self`.
pub struct Driver<E> {
    extractor: E,
    config: DriverConfig,
    buffer: ReceiveBuffer,
    scratch: Vec<u8>,
    port: Port,
    pub(crate) mock: MockState,
    stats: DriverStats,
}

impl<E> Driver<E> {
    /// Create a closed driver for packets of at most `max_packet_size` bytes.
    pub fn new(extractor: E, max_packet_size: usize) -> Self {
        Self::with_config(
            extractor,
            DriverConfig::default().max_packet_size(max_packet_size),
        )
    }

    /// Create a closed driver from an explicit configuration.
    pub fn with_config(extractor: E, config: DriverConfig) -> Self {
        Self {
            extractor,
            buffer: ReceiveBuffer::with_capacity(config.internal_buffer_size_value()),
            scratch: vec![0; config.max_packet_size_value()],
            config,
            port: Port::Closed,
            mock: MockState::default(),
            stats: DriverStats::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &DriverConfig { &self.config }

    /// Packet extractor in use.
    pub fn extractor(&self) -> &E { &self.extractor }

    /// Change the timeout used by reads that do not pass one.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.config = self.config.read_timeout(timeout);
    }

    /// Change the timeout used by writes that do not pass one.
    pub fn set_write_timeout(&mut self, timeout: Duration) {
        self.config = self.config.write_timeout(timeout);
    }

    /// Toggle extract-last mode.
    pub fn set_extract_last(&mut self, enabled: bool) {
        self.config = self.config.extract_last(enabled);
    }

    /// Attach `transport`, closing any previously open one.
    ///
    /// # Errors
    ///
    /// Returns an error if closing the previous transport failed; the new
    /// transport is attached regardless.
    pub fn open_transport(&mut self, transport: impl Transport + 'static) -> Result<()> {
        self.replace_port(Port::External(Box::new(transport)))
    }

    /// Attach a fresh in-memory [`TestStream`].
    pub fn open_test_stream(&mut self) {
        self.open_test_stream_with(TestStream::new());
    }

    /// Attach a preconfigured [`TestStream`].
    pub fn open_test_stream_with(&mut self, stream: TestStream) {
        if let Err(err) = self.replace_port(Port::Test(stream)) {
            warn!(error = %err, "failed to close previous transport");
        }
    }

    /// Returns true while a transport is attached.
    pub fn is_open(&self) -> bool { !matches!(self.port, Port::Closed) }

    /// The attached test stream.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotTestStream`] if the driver is not opened on
    /// a [`TestStream`].
    pub fn test_stream(&self) -> Result<&TestStream> {
        match &self.port {
            Port::Test(stream) => Ok(stream),
            _ => Err(DriverError::NotTestStream),
        }
    }

    /// The attached test stream, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotTestStream`] if the driver is not opened on
    /// a [`TestStream`].
    pub fn test_stream_mut(&mut self) -> Result<&mut TestStream> {
        match &mut self.port {
            Port::Test(stream) => Ok(stream),
            _ => Err(DriverError::NotTestStream),
        }
    }

    /// Detach and close the transport. Buffered bytes are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport failed to close.
    pub fn close(&mut self) -> Result<()> { self.replace_port(Port::Closed) }

    fn replace_port(&mut self, port: Port) -> Result<()> {
        let mut previous = std::mem::replace(&mut self.port, port);
        if let Some(transport) = previous.transport() {
            debug!("closing transport");
            transport.close()?;
        }
        Ok(())
    }

    /// Inject raw inbound bytes straight into the receive buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::BufferFull`] if the bytes do not fit; nothing
    /// is appended in that case.
    pub fn push_data(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.append(bytes)?;
        trace!(len = bytes.len(), "injected inbound bytes");
        Ok(())
    }

    /// Drop every buffered inbound byte, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.buffer.clear();
        if dropped > 0 {
            debug!(dropped, "cleared receive buffer");
        }
        dropped
    }

    /// Inbound bytes not yet delivered.
    pub fn buffered(&self) -> &[u8] { self.buffer.as_slice() }

    /// Traffic counters since creation or the last reset.
    pub fn stats(&self) -> DriverStats {
        DriverStats {
            queued_bytes: self.buffer.len(),
            ..self.stats
        }
    }

    /// Reset traffic counters.
    pub fn reset_stats(&mut self) { self.stats = DriverStats::default(); }

    /// Start a mock scope on this driver.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MockContext`] if a mock scope is already
    /// active.
    pub fn activate_mock(&mut self) -> Result<MockContext<'_, E>> {
        self.mock.activate()?;
        debug!("mock context activated");
        Ok(MockContext::new(self))
    }

    /// Returns true while a mock scope is active.
    pub fn is_mock_active(&self) -> bool { self.mock.is_active() }

    /// Queue an expected write and the reply it triggers.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MockContext`] if no mock scope is active.
    pub fn expect_reply(
        &mut self,
        expected: impl Into<Bytes>,
        reply: impl Into<Bytes>,
    ) -> Result<()> {
        self.mock.queue_mut()?.push_back(Expectation {
            expected: expected.into(),
            reply: reply.into(),
        });
        Ok(())
    }

    /// Fail if expectations remain queued.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MockContext`] if no mock scope is active and
    /// [`DriverError::UnmetExpectations`] if the queue is not empty.
    pub fn validate_expectations_are_empty(&self) -> Result<()> { self.mock.validate_empty() }

    /// Drop every queued expectation.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MockContext`] if no mock scope is active.
    pub fn clear_expectations(&mut self) -> Result<()> {
        self.mock.queue_mut()?.clear();
        Ok(())
    }

    /// Transmit `data` as one packet.
    ///
    /// While a mock scope is active the packet is matched against the
    /// oldest expectation and never reaches the transport. Otherwise the
    /// write is retried over partial transport writes until every byte is
    /// accepted or the deadline (`timeout`, else the configured write
    /// timeout) passes.
    ///
    /// # Errors
    ///
    /// - [`DriverError::UnexpectedData`] / [`DriverError::NoExpectation`] when mocked.
    /// - [`DriverError::NotOpen`] without a transport.
    /// - [`DriverError::Timeout`] if the transport did not accept every byte in time.
    /// - [`DriverError::Io`] on transport failure.
    pub fn write_packet(&mut self, data: &[u8], timeout: Option<Duration>) -> Result<()> {
        if self.mock.is_active() {
            return self.write_mocked(data);
        }

        let timeout = timeout.unwrap_or(self.config.write_timeout_value());
        let deadline = Deadline::after(timeout);
        let transport = self.port.transport().ok_or(DriverError::NotOpen)?;

        let mut written = 0;
        while written < data.len() {
            let remaining = data.len() - written;
            let n = transport.write(&data[written..])?;
            if n > remaining {
                return Err(overreported("write", n, remaining));
            }
            written += n;
            if written == data.len() {
                break;
            }
            if deadline.has_elapsed() {
                self.stats.on_tx(written);
                metrics::record_timeout(Direction::Outbound);
                debug!(written, len = data.len(), "write timed out");
                return Err(DriverError::Timeout { timeout });
            }
            if n == 0 {
                thread::yield_now();
            }
        }

        self.stats.on_tx(data.len());
        metrics::record_packet(Direction::Outbound, data.len());
        debug!(len = data.len(), "packet written");
        Ok(())
    }

    fn write_mocked(&mut self, data: &[u8]) -> Result<()> {
        let queue = self.mock.queue_mut()?;
        let Some(head) = queue.front() else {
            warn!(len = data.len(), "write with no expectation left");
            return Err(DriverError::NoExpectation {
                actual: Bytes::copy_from_slice(data),
            });
        };
        if head.expected.as_ref() != data {
            warn!(
                expected_len = head.expected.len(),
                len = data.len(),
                "write does not match expectation"
            );
            return Err(DriverError::UnexpectedData {
                expected: head.expected.clone(),
                actual: Bytes::copy_from_slice(data),
            });
        }

        let reply = head.reply.clone();
        self.buffer.append(&reply)?;
        self.mock.queue_mut()?.pop_front();
        self.stats.on_tx(data.len());
        metrics::record_packet(Direction::Outbound, data.len());
        debug!(len = data.len(), reply_len = reply.len(), "expectation matched");
        Ok(())
    }
}

impl<E: PacketExtractor> Driver<E> {
    /// Read the next packet.
    ///
    /// Packets already complete in the buffer are returned without touching
    /// the transport. Otherwise the transport is read with the remaining
    /// budget until a packet completes or the deadline (`timeout`, else the
    /// configured read timeout) passes. A zero timeout never reads the
    /// transport.
    ///
    /// # Errors
    ///
    /// - [`DriverError::Timeout`] if no packet completed in time.
    /// - [`DriverError::BufferFull`] if the buffer filled up without a packet.
    /// - [`DriverError::ExtractorOverrun`] if the extractor broke its contract.
    /// - [`DriverError::NotOpen`] if more bytes are needed and no transport is
    ///   attached.
    /// - [`DriverError::Io`] on transport failure.
    pub fn read_packet(&mut self, timeout: Option<Duration>) -> Result<Bytes> {
        let timeout = timeout.unwrap_or(self.config.read_timeout_value());
        let deadline = Deadline::after(timeout);
        loop {
            if let Some(packet) = self.extract_buffered()? {
                return Ok(packet);
            }
            if deadline.has_elapsed() {
                metrics::record_timeout(Direction::Inbound);
                debug!(buffered = self.buffer.len(), ?timeout, "read timed out");
                return Err(DriverError::Timeout { timeout });
            }
            self.fill_from_transport(deadline.remaining())?;
        }
    }

    /// Returns true if a complete packet is already buffered.
    ///
    /// Garbage the extractor discards along the way stays discarded; the
    /// packet itself is left for the next read.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ExtractorOverrun`] if the extractor broke its
    /// contract.
    pub fn has_packet(&mut self) -> Result<bool> {
        if !self.buffer.needs_scan() {
            return Ok(false);
        }
        let found = self.buffer.contains_packet(&self.extractor);
        self.account_discarded();
        found
    }

    fn extract_buffered(&mut self) -> Result<Option<Bytes>> {
        if !self.buffer.needs_scan() {
            return Ok(None);
        }
        let mut found = self.extract_once()?;
        if self.config.extract_last_value() {
            while found.is_some() && self.buffer.needs_scan() {
                match self.extract_once() {
                    Ok(Some(newer)) => {
                        if let Some(older) = found.replace(newer) {
                            self.stats.on_bad_rx(older.len());
                            debug!(len = older.len(), "superseded by newer packet");
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        // Raised again by the next read; the buffer is unchanged.
                        debug!(error = %err, "deferring extraction error");
                        break;
                    }
                }
            }
        }
        if let Some(packet) = &found {
            self.stats.on_rx(packet.len());
            metrics::record_packet(Direction::Inbound, packet.len());
            debug!(len = packet.len(), "packet extracted");
        }
        Ok(found)
    }

    fn extract_once(&mut self) -> Result<Option<Bytes>> {
        let packet = self.buffer.try_extract(&self.extractor);
        self.account_discarded();
        packet
    }

    fn account_discarded(&mut self) {
        let discarded = self.buffer.take_discarded();
        if discarded > 0 {
            self.stats.on_bad_rx(discarded);
            metrics::record_discarded(discarded);
            warn!(discarded, "discarded garbage bytes from receive buffer");
        }
    }

    fn fill_from_transport(&mut self, timeout: Duration) -> Result<()> {
        let room = self.buffer.available().min(self.scratch.len());
        if room == 0 {
            return Err(DriverError::BufferFull {
                capacity: self.buffer.capacity(),
            });
        }
        let transport = self.port.transport().ok_or(DriverError::NotOpen)?;
        let n = transport.read(&mut self.scratch[..room], timeout)?;
        if n > room {
            return Err(overreported("read", n, room));
        }
        if n > 0 {
            trace!(len = n, "read from transport");
            self.buffer.append(&self.scratch[..n])?;
        }
        Ok(())
    }
}

/// A transport claimed to move more bytes than the slice it was handed.
fn overreported(op: &'static str, reported: usize, len: usize) -> DriverError {
    warn!(op, reported, len, "transport reported more bytes than offered");
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("transport {op} reported {reported} bytes for a {len}-byte slice"),
    )
    .into()
}

impl<E> fmt::Debug for Driver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .field("buffered", &self.buffer.len())
            .field("port", &self.port)
            .field("mock_active", &self.mock.is_active())
            .finish_non_exhaustive()
    }
}

impl<E> Drop for Driver<E> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close transport on drop");
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;

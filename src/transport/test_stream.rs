//! In-memory transport for tests.
//!
//! `TestStream` records every byte written through it and serves reads from
//! a queue of scripted chunks, so a driver can be exercised end to end
//! without a device.

use std::{collections::VecDeque, io, thread, time::Duration};

use bytes::{Buf, Bytes, BytesMut};

use super::Transport;

/// Scripted, recording transport.
#[derive(Debug, Default)]
pub struct TestStream {
    inbound: VecDeque<Bytes>,
    written: BytesMut,
    write_chunk: Option<usize>,
    closed: bool,
}

impl TestStream {
    /// Create an empty stream.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Accept at most `limit` bytes per write call, emulating a channel that
    /// only takes partial writes.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is zero.
    #[must_use]
    pub fn with_write_chunk(mut self, limit: usize) -> Self {
        assert!(limit > 0, "write chunk limit must be non-zero");
        self.write_chunk = Some(limit);
        self
    }

    /// Queue `chunk` for delivery by a later read.
    ///
    /// Each chunk is delivered by its own read call (split further if the
    /// reader's buffer is smaller), modelling fragmented arrival.
    pub fn push_inbound(&mut self, chunk: impl Into<Bytes>) {
        let chunk = chunk.into();
        if !chunk.is_empty() {
            self.inbound.push_back(chunk);
        }
    }

    /// Bytes queued but not yet read.
    #[must_use]
    pub fn pending_inbound(&self) -> usize { self.inbound.iter().map(Bytes::len).sum() }

    /// Bytes written and not yet drained.
    #[must_use]
    pub fn written(&self) -> &[u8] { &self.written }

    /// Drain every byte written since the previous drain.
    pub fn take_written(&mut self) -> Bytes { self.written.split().freeze() }

    /// Returns true once [`Transport::close`] was called.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "test stream is closed",
            ));
        }
        Ok(())
    }
}

impl Transport for TestStream {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.ensure_open()?;
        let Some(chunk) = self.inbound.front_mut() else {
            // A silent device: nothing shows up before the timeout.
            thread::sleep(timeout);
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.advance(n);
        if chunk.is_empty() {
            self.inbound.pop_front();
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.ensure_open()?;
        let n = self.write_chunk.map_or(data.len(), |limit| limit.min(data.len()));
        self.written.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

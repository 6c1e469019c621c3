//! Adapter exposing `std::io` readers and writers as a [`Transport`].

use std::{
    io::{self, Read, Write},
    sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender},
    thread,
    time::Duration,
};

use bytes::Bytes;
use tracing::trace;

use super::Transport;

/// Largest chunk the reader thread hands over at once.
const READ_CHUNK: usize = 8 * 1024;
/// Chunks the reader thread may run ahead of the driver.
const CHANNEL_DEPTH: usize = 4;

/// Transport over a `Read` half and a `Write` half.
///
/// The reader is moved onto a dedicated thread that forwards every chunk
/// through a bounded channel, so [`Transport::read`] honours the driver's
/// timeout even when the reader blocks indefinitely (stdin, pipes, sockets
/// without their own timeout). End of stream is reported as
/// [`io::ErrorKind::UnexpectedEof`].
///
/// Dropping the transport does not interrupt a read already in progress; the
/// reader thread exits once that read returns.
#[derive(Debug)]
pub struct IoTransport<W = io::Sink> {
    inbound: Receiver<io::Result<Bytes>>,
    pending: Bytes,
    writer: W,
}

impl IoTransport {
    /// Wrap a reader; writes are accepted and dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader thread could not be spawned.
    pub fn read_only<R>(reader: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        Self::new(reader, io::sink())
    }
}

impl<W> IoTransport<W> {
    /// Wrap separate read and write halves.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader thread could not be spawned.
    pub fn new<R>(reader: R, writer: W) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, inbound) = mpsc::sync_channel(CHANNEL_DEPTH);
        thread::Builder::new()
            .name("iodrivers-reader".into())
            .spawn(move || pump(reader, &tx))?;
        Ok(Self {
            inbound,
            pending: Bytes::new(),
            writer,
        })
    }

    /// Recover the write half.
    pub fn into_writer(self) -> W { self.writer }
}

fn end_of_stream() -> io::Error { io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream") }

/// Forward chunks from `reader` until it ends, fails, or nobody listens.
fn pump<R: Read>(mut reader: R, tx: &SyncSender<io::Result<Bytes>>) {
    let mut buf = vec![0_u8; READ_CHUNK];
    loop {
        let item = match reader.read(&mut buf) {
            Ok(0) => Err(end_of_stream()),
            Ok(n) => Ok(Bytes::copy_from_slice(&buf[..n])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                thread::yield_now();
                continue;
            }
            Err(e) => Err(e),
        };
        let last = item.is_err();
        if tx.send(item).is_err() || last {
            trace!(last, "reader thread exiting");
            return;
        }
    }
}

impl<W: Write + Send> Transport for IoTransport<W> {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pending.is_empty() {
            match self.inbound.recv_timeout(timeout) {
                Ok(chunk) => self.pending = chunk?,
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => return Err(end_of_stream()),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending.split_to(n));
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(data)?;
        self.writer.flush()?;
        Ok(n)
    }

    fn close(&mut self) -> io::Result<()> { self.writer.flush() }
}

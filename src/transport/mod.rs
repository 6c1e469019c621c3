//! Byte-level channels underneath a driver.
//!
//! A [`Transport`] moves unstructured bytes; it knows nothing about packets.
//! Device backends (serial lines, sockets, CAN adapters) live outside this
//! crate and only need to implement this trait. Two implementations ship
//! here: [`TestStream`] for tests and [`IoTransport`] for anything speaking
//! `std::io`.

use std::{io, time::Duration};

pub mod io_transport;
pub mod test_stream;

pub use io_transport::IoTransport;
pub use test_stream::TestStream;

/// Bounded-read, unbounded-write byte channel.
pub trait Transport: Send {
    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// Returns the number of bytes read, possibly fewer than requested.
    /// `Ok(0)` means nothing arrived before `timeout` elapsed; it is not an
    /// end-of-stream signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel failed or reached end of stream.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Write some prefix of `data`, returning how many bytes were accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel failed.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Release the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel could not be shut down cleanly.
    fn close(&mut self) -> io::Result<()> { Ok(()) }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).read(buf, timeout)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> { (**self).write(data) }

    fn close(&mut self) -> io::Result<()> { (**self).close() }
}

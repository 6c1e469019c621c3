//! Accumulator for inbound bytes awaiting packet extraction.
//!
//! [`ReceiveBuffer`] holds exactly the bytes a driver has received but not
//! yet consumed. Bytes leave the head only as part of a returned packet or
//! because the extractor asked for them to be discarded.

use bytes::{Buf, Bytes, BytesMut};

use crate::{
    error::{DriverError, Result},
    frame::{Extraction, PacketExtractor},
};

/// Bounded byte accumulator owned by a single driver.
#[derive(Debug)]
pub struct ReceiveBuffer {
    data: BytesMut,
    capacity: usize,
    dirty: bool,
    discarded: usize,
}

impl ReceiveBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            capacity,
            dirty: false,
            discarded: 0,
        }
    }

    /// Number of buffered bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.data.len() }

    /// Returns true when no bytes are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Maximum number of bytes the buffer accepts.
    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }

    /// Free space left before the buffer is full.
    #[must_use]
    pub fn available(&self) -> usize { self.capacity - self.data.len() }

    /// Buffered bytes, oldest first.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] { &self.data }

    /// Returns true if bytes arrived since the extractor last asked for more.
    #[must_use]
    pub fn needs_scan(&self) -> bool { self.dirty }

    /// Garbage bytes dropped since the previous call, including those
    /// dropped by a pass that then failed.
    pub fn take_discarded(&mut self) -> usize { std::mem::take(&mut self.discarded) }

    /// Append `bytes` at the tail.
    ///
    /// Extraction is not attempted here.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::BufferFull`] without appending anything if the
    /// bytes do not fit.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.available() {
            return Err(DriverError::BufferFull {
                capacity: self.capacity,
            });
        }
        if !bytes.is_empty() {
            self.data.extend_from_slice(bytes);
            self.dirty = true;
        }
        Ok(())
    }

    /// Run `extractor` over the buffer until it yields a packet or asks for
    /// more data.
    ///
    /// Discard verdicts drop bytes from the head and re-run the extractor on
    /// the remainder; the dropped count is reported by
    /// [`take_discarded`](Self::take_discarded).
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ExtractorOverrun`] if the extractor reports more
    /// bytes than are buffered. Bytes discarded earlier in the same pass stay
    /// discarded and are still counted.
    pub fn try_extract<E>(&mut self, extractor: &E) -> Result<Option<Bytes>>
    where
        E: PacketExtractor + ?Sized,
    {
        let packet = self.locate(extractor)?.map(|n| {
            let packet = self.data.split_to(n).freeze();
            // Leftover bytes may already hold the next packet.
            self.dirty = !self.data.is_empty();
            packet
        });
        Ok(packet)
    }

    /// Like [`try_extract`](Self::try_extract) but leaves a complete packet
    /// in place, returning whether one was found.
    ///
    /// Garbage is still dropped from the head.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::ExtractorOverrun`] under the same conditions as
    /// [`try_extract`](Self::try_extract).
    pub fn contains_packet<E>(&mut self, extractor: &E) -> Result<bool>
    where
        E: PacketExtractor + ?Sized,
    {
        Ok(self.locate(extractor)?.is_some())
    }

    fn locate<E>(&mut self, extractor: &E) -> Result<Option<usize>>
    where
        E: PacketExtractor + ?Sized,
    {
        while !self.data.is_empty() {
            let available = self.data.len();
            match extractor.extract(&self.data).normalized() {
                Extraction::NeedMore => break,
                Extraction::Packet(n) if n <= available => return Ok(Some(n)),
                Extraction::Discard(k) if k <= available => {
                    self.data.advance(k);
                    self.discarded += k;
                }
                Extraction::Packet(reported) | Extraction::Discard(reported) => {
                    return Err(DriverError::ExtractorOverrun {
                        reported,
                        available,
                    });
                }
            }
        }
        self.dirty = false;
        Ok(None)
    }

    /// Drop every buffered byte, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.data.len();
        self.data.clear();
        self.dirty = false;
        dropped
    }
}

//! Ready-made extractors for common stream framings.

use std::io;

use bytes::{Bytes, BytesMut};

use super::{Extraction, LengthFormat, PacketExtractor};

/// Treat every non-empty buffer as one packet.
///
/// Useful for transports that already deliver whole messages and for tests
/// that only care about byte flow.
#[derive(Clone, Copy, Debug, Default)]
pub struct WholeBuffer;

impl PacketExtractor for WholeBuffer {
    fn extract(&self, buffer: &[u8]) -> Extraction {
        if buffer.is_empty() {
            Extraction::NeedMore
        } else {
            Extraction::Packet(buffer.len())
        }
    }
}

/// Packets of a constant size.
#[derive(Clone, Copy, Debug)]
pub struct FixedSize {
    size: usize,
}

impl FixedSize {
    /// Create an extractor producing `size`-byte packets.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[must_use]
    pub const fn new(size: usize) -> Self {
        assert!(size > 0, "fixed packet size must be non-zero");
        Self { size }
    }

    /// Packet size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize { self.size }
}

impl PacketExtractor for FixedSize {
    fn extract(&self, buffer: &[u8]) -> Extraction {
        if buffer.len() >= self.size {
            Extraction::Packet(self.size)
        } else {
            Extraction::NeedMore
        }
    }
}

/// Packets terminated by a delimiter byte, delimiter included.
///
/// When `max_len` bytes accumulate without a delimiter the whole window is
/// discarded so a noisy line cannot stall the stream.
///
/// ```
/// use iodrivers::frame::{Delimited, Extraction, PacketExtractor};
///
/// let lines = Delimited::new(b'\n', 16);
/// assert_eq!(lines.extract(b"ok\nnext"), Extraction::Packet(3));
/// assert_eq!(lines.extract(b"partial"), Extraction::NeedMore);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Delimited {
    delimiter: u8,
    max_len: usize,
}

impl Delimited {
    /// Create an extractor splitting on `delimiter`, with packets of at most
    /// `max_len` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `max_len` is zero.
    #[must_use]
    pub const fn new(delimiter: u8, max_len: usize) -> Self {
        assert!(max_len > 0, "maximum packet length must be non-zero");
        Self { delimiter, max_len }
    }
}

impl PacketExtractor for Delimited {
    fn extract(&self, buffer: &[u8]) -> Extraction {
        let window = &buffer[..buffer.len().min(self.max_len)];
        match window.iter().position(|&b| b == self.delimiter) {
            Some(pos) => Extraction::Packet(pos + 1),
            None if window.len() == self.max_len => Extraction::Discard(self.max_len),
            None => Extraction::NeedMore,
        }
    }
}

/// Packets made of a length prefix followed by that many payload bytes.
///
/// Returned packets include the prefix. A prefix announcing more than
/// `max_payload` bytes is taken as line noise: one byte is discarded and the
/// search resumes on the next byte.
#[derive(Clone, Copy, Debug)]
pub struct LengthPrefixed {
    format: LengthFormat,
    max_payload: usize,
}

impl LengthPrefixed {
    /// Create an extractor for `format` prefixes and payloads of at most
    /// `max_payload` bytes.
    #[must_use]
    pub const fn new(format: LengthFormat, max_payload: usize) -> Self {
        Self {
            format,
            max_payload,
        }
    }

    /// Prefix format in use.
    #[must_use]
    pub const fn format(&self) -> LengthFormat { self.format }

    /// Build an outbound packet carrying `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] if `payload` exceeds
    /// `max_payload` or cannot be described by the prefix.
    ///
    /// ```
    /// use iodrivers::frame::{LengthFormat, LengthPrefixed};
    ///
    /// let framing = LengthPrefixed::new(LengthFormat::u16_be(), 64);
    /// let packet = framing.encode(b"hi").expect("payload fits");
    /// assert_eq!(packet.as_ref(), b"\x00\x02hi");
    /// ```
    pub fn encode(&self, payload: &[u8]) -> io::Result<Bytes> {
        if payload.len() > self.max_payload {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "payload of {} bytes exceeds maximum of {}",
                    payload.len(),
                    self.max_payload
                ),
            ));
        }
        let mut dst = BytesMut::with_capacity(self.format.bytes() + payload.len());
        self.format.write_len(payload.len(), &mut dst)?;
        dst.extend_from_slice(payload);
        Ok(dst.freeze())
    }

    /// Strip the prefix from a packet produced by this extractor.
    #[must_use]
    pub fn payload<'a>(&self, packet: &'a [u8]) -> &'a [u8] {
        packet.get(self.format.bytes()..).unwrap_or_default()
    }
}

impl PacketExtractor for LengthPrefixed {
    fn extract(&self, buffer: &[u8]) -> Extraction {
        let Some(declared) = self.format.read_len(buffer) else {
            return Extraction::NeedMore;
        };
        let payload_len = match usize::try_from(declared) {
            Ok(len) if len <= self.max_payload => len,
            _ => return Extraction::Discard(1),
        };
        let total = self.format.bytes() + payload_len;
        if buffer.len() >= total {
            Extraction::Packet(total)
        } else {
            Extraction::NeedMore
        }
    }
}

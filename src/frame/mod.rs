//! Packet boundary detection.
//!
//! A [`PacketExtractor`] inspects the bytes accumulated by a driver and
//! decides where the next packet ends. Extractors never see transport
//! framing: they receive the full unconsumed buffer on every call and answer
//! with an [`Extraction`] verdict.
//!
//! Closures of the form `Fn(&[u8]) -> Extraction` implement the trait, so a
//! device-specific rule can be supplied inline:
//!
//! ```
//! use iodrivers::frame::{Extraction, PacketExtractor};
//!
//! // Two-byte packets starting with 0xAA; anything else is garbage.
//! let extractor = |buf: &[u8]| match buf {
//!     [] | [0xAA] => Extraction::NeedMore,
//!     [0xAA, ..] => Extraction::Packet(2),
//!     _ => Extraction::Discard(1),
//! };
//!
//! assert_eq!(extractor.extract(&[0x00, 0xAA]), Extraction::Discard(1));
//! assert_eq!(extractor.extract(&[0xAA, 0x01]), Extraction::Packet(2));
//! ```

pub mod extractors;
pub mod format;

pub use extractors::{Delimited, FixedSize, LengthPrefixed, WholeBuffer};
pub use format::{Endianness, LengthFormat};

/// Verdict of a [`PacketExtractor`] over the current buffer content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extraction {
    /// Not enough bytes to decide; keep everything and wait for more.
    NeedMore,
    /// The first `n` bytes form a complete packet.
    Packet(usize),
    /// The first `k` bytes are garbage and must be dropped before retrying.
    Discard(usize),
}

impl Extraction {
    /// Collapse zero-length verdicts to [`Extraction::NeedMore`].
    #[must_use]
    pub(crate) fn normalized(self) -> Self {
        match self {
            Self::Packet(0) | Self::Discard(0) => Self::NeedMore,
            other => other,
        }
    }
}

/// Signed convention: `0` waits, `n > 0` is a packet, `-k` discards `k` bytes.
///
/// ```
/// use iodrivers::frame::Extraction;
///
/// assert_eq!(Extraction::from(0), Extraction::NeedMore);
/// assert_eq!(Extraction::from(4), Extraction::Packet(4));
/// assert_eq!(Extraction::from(-2), Extraction::Discard(2));
/// ```
impl From<isize> for Extraction {
    fn from(value: isize) -> Self {
        match value {
            0 => Self::NeedMore,
            n if n > 0 => Self::Packet(n.unsigned_abs()),
            k => Self::Discard(k.unsigned_abs()),
        }
    }
}

/// Device-specific rule locating packet boundaries in a byte stream.
pub trait PacketExtractor {
    /// Inspect `buffer`, which holds every byte not yet consumed, and report
    /// where the next packet ends.
    ///
    /// Implementations must not report a packet or discard longer than
    /// `buffer.len()`.
    fn extract(&self, buffer: &[u8]) -> Extraction;
}

impl<F> PacketExtractor for F
where
    F: Fn(&[u8]) -> Extraction,
{
    fn extract(&self, buffer: &[u8]) -> Extraction { self(buffer) }
}

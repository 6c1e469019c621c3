//! Length prefix formatting options.
use std::io;

use bytes::BytesMut;

pub(crate) const ERR_UNSUPPORTED_PREFIX: &str = "unsupported length prefix size";
pub(crate) const ERR_LENGTH_TOO_LARGE: &str = "length does not fit the prefix";

/// Byte order used for encoding and decoding length prefixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    Little,
}

/// Format of the length prefix preceding each packet payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LengthFormat {
    bytes: usize,
    endianness: Endianness,
}

impl LengthFormat {
    /// Creates a new `LengthFormat` with the specified number of bytes and
    /// endianness for the length prefix.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is not in `1..=8`.
    #[must_use]
    pub const fn new(bytes: usize, endianness: Endianness) -> Self {
        assert!(matches!(bytes, 1..=8), "invalid length-prefix width");
        Self { bytes, endianness }
    }

    /// Fallible constructor validating the prefix width.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not in `1..=8`.
    pub fn try_new(bytes: usize, endianness: Endianness) -> io::Result<Self> {
        if !(1..=8).contains(&bytes) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                ERR_UNSUPPORTED_PREFIX,
            ));
        }
        Ok(Self { bytes, endianness })
    }

    /// One-byte length prefix.
    #[must_use]
    pub const fn u8() -> Self { Self::new(1, Endianness::Big) }

    /// Creates a `LengthFormat` for a 2-byte big-endian length prefix.
    #[must_use]
    pub const fn u16_be() -> Self { Self::new(2, Endianness::Big) }

    /// Creates a `LengthFormat` for a 2-byte little-endian length prefix.
    #[must_use]
    pub const fn u16_le() -> Self { Self::new(2, Endianness::Little) }

    /// Creates a `LengthFormat` for a 4-byte big-endian length prefix.
    #[must_use]
    pub const fn u32_be() -> Self { Self::new(4, Endianness::Big) }

    /// Creates a `LengthFormat` for a 4-byte little-endian length prefix.
    #[must_use]
    pub const fn u32_le() -> Self { Self::new(4, Endianness::Little) }

    /// Width of the prefix in bytes.
    #[must_use]
    pub const fn bytes(&self) -> usize { self.bytes }

    /// Byte order of the prefix.
    #[must_use]
    pub const fn endianness(&self) -> Endianness { self.endianness }

    /// Decode the prefix at the start of `src`.
    ///
    /// Returns `None` while fewer than [`bytes`](Self::bytes) bytes are
    /// available.
    #[must_use]
    pub fn read_len(&self, src: &[u8]) -> Option<u64> {
        let prefix = src.get(..self.bytes)?;
        let shift_in = |acc: u64, byte: &u8| (acc << 8) | u64::from(*byte);
        Some(match self.endianness {
            Endianness::Big => prefix.iter().fold(0, shift_in),
            Endianness::Little => prefix.iter().rev().fold(0, shift_in),
        })
    }

    /// Append `len` to `dst` using this format's prefix encoding.
    ///
    /// # Errors
    /// Returns an error if `len` cannot be represented by the prefix size.
    pub fn write_len(&self, len: usize, dst: &mut BytesMut) -> io::Result<()> {
        let value = u64::try_from(len)
            .ok()
            .filter(|v| self.bytes == 8 || v >> (8 * self.bytes) == 0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, ERR_LENGTH_TOO_LARGE))?;
        match self.endianness {
            Endianness::Big => dst.extend_from_slice(&value.to_be_bytes()[8 - self.bytes..]),
            Endianness::Little => dst.extend_from_slice(&value.to_le_bytes()[..self.bytes]),
        }
        Ok(())
    }
}

impl Default for LengthFormat {
    fn default() -> Self { Self::u32_be() }
}

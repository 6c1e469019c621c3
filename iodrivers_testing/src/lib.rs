//! Test support for drivers built on `iodrivers`.
//!
//! [`Fixture`] wraps a driver opened on an in-memory
//! [`TestStream`](iodrivers::TestStream) and exposes the raw injection and
//! drain helpers protocol tests need. [`LoggerHandle`] serialises access to
//! a captured `log` stream.
//!
//! ```rust
//! use iodrivers_testing::whole_buffer;
//!
//! let mut fixture = whole_buffer();
//! fixture.write_packet(&[0, 1]).expect("test stream accepts writes");
//! assert_eq!(fixture.read_data_from_driver().expect("test stream").as_ref(), &[0, 1]);
//! ```

pub mod fixture;
pub mod logging;

pub use fixture::{DEFAULT_FIXTURE_PACKET_SIZE, Fixture, whole_buffer};
pub use logging::{LoggerHandle, logger};

#![doc(html_root_url = "https://docs.rs/iodrivers/latest")]
//! Public API for the `iodrivers` library.
//!
//! This crate turns raw byte-stream transports (serial lines, sockets,
//! in-memory test streams) into packet-oriented channels. A [`Driver`]
//! accumulates inbound bytes, asks a [`PacketExtractor`] where packets begin
//! and end, and delivers them one at a time under a deadline. A scripted
//! [`MockContext`] lets protocol code be tested without a device.

pub mod buffer;
pub mod config;
pub mod deadline;
pub mod driver;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod mock;
pub mod stats;
pub mod transport;

pub use config::DriverConfig;
pub use deadline::Deadline;
pub use driver::Driver;
pub use error::{DriverError, MockContextError, Result};
pub use frame::{Extraction, PacketExtractor};
pub use mock::{Expectation, MockContext};
pub use stats::DriverStats;
pub use transport::{IoTransport, TestStream, Transport};

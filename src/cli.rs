//! Command line interface for the `iodrivers` binary.
//!
//! The binary reads a byte stream from a file or standard input, splits it
//! into packets with one of the built-in extractors and prints each packet
//! as a line of hex.

use std::path::PathBuf;

use clap::{Parser, ValueEnum, builder::RangedU64ValueParser};

/// Packet framing applied to the input stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Framing {
    /// Every chunk of buffered bytes is one packet.
    Whole,
    /// Packets of exactly `--size` bytes.
    Fixed,
    /// Packets terminated by `--delimiter`.
    #[default]
    Line,
    /// Packets carrying a `--prefix-bytes` wide length header.
    Length,
}

/// Command line arguments for the `iodrivers` binary.
#[derive(Debug, Parser)]
#[command(
    name = "iodrivers",
    version,
    about = "Split a byte stream into packets and print them as hex"
)]
pub struct Cli {
    /// Framing used to delimit packets.
    #[arg(short, long, value_enum, default_value_t = Framing::Line)]
    pub framing: Framing,

    /// Packet size for `fixed` framing.
    #[arg(long, default_value_t = 16, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub size: usize,

    /// Delimiter byte for `line` framing, in hex.
    #[arg(long, default_value = "0a", value_parser = parse_hex_byte)]
    pub delimiter: u8,

    /// Width of the length header for `length` framing.
    #[arg(long, default_value_t = 4, value_parser = parse_prefix_width)]
    pub prefix_bytes: usize,

    /// Read the length header as little-endian.
    #[arg(long)]
    pub little_endian: bool,

    /// Largest packet accepted before input is treated as garbage.
    #[arg(long, default_value_t = 1024, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub max_packet_size: usize,

    /// Give up when no packet completes within this many milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub timeout_ms: u64,

    /// Input file; standard input when omitted.
    pub file: Option<PathBuf>,
}

fn parse_hex_byte(value: &str) -> Result<u8, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid hex byte `{value}`: {e}"))
}

fn parse_prefix_width(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(width @ (1 | 2 | 4 | 8)) => Ok(width),
        _ => Err(format!("prefix width must be 1, 2, 4 or 8, got `{value}`")),
    }
}

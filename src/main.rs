//! `iodrivers` command line tool.
//!
//! Splits a byte stream read from a file or standard input into packets and
//! prints each packet as one line of lowercase hex.

mod cli;

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    time::Duration,
};

use bytes::Bytes;
use clap::Parser;
use cli::{Cli, Framing};
use iodrivers::{
    Driver,
    DriverConfig,
    DriverError,
    IoTransport,
    frame::{
        Delimited,
        Endianness,
        Extraction,
        FixedSize,
        LengthFormat,
        LengthPrefixed,
        PacketExtractor,
        WholeBuffer,
    },
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

type BoxedExtractor = Box<dyn Fn(&[u8]) -> Extraction>;

fn boxed(extractor: impl PacketExtractor + 'static) -> BoxedExtractor {
    Box::new(move |buf: &[u8]| extractor.extract(buf))
}

fn build_extractor(cli: &Cli) -> io::Result<BoxedExtractor> {
    Ok(match cli.framing {
        Framing::Whole => boxed(WholeBuffer),
        Framing::Fixed => boxed(FixedSize::new(cli.size)),
        Framing::Line => boxed(Delimited::new(cli.delimiter, cli.max_packet_size)),
        Framing::Length => {
            let endianness = if cli.little_endian {
                Endianness::Little
            } else {
                Endianness::Big
            };
            let format = LengthFormat::try_new(cli.prefix_bytes, endianness)?;
            let max_payload = cli.max_packet_size.saturating_sub(format.bytes());
            boxed(LengthPrefixed::new(format, max_payload))
        }
    })
}

fn write_hex(out: &mut impl Write, packet: &Bytes) -> io::Result<()> {
    writeln!(out, "{packet:x}")
}

fn is_end_of_stream(err: &DriverError) -> bool {
    matches!(err, DriverError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
}

fn run(cli: &Cli, input: Box<dyn Read + Send>) -> Result<(), DriverError> {
    let config = DriverConfig::default()
        .max_packet_size(cli.max_packet_size)
        .read_timeout(Duration::from_millis(cli.timeout_ms));
    let mut driver = Driver::with_config(build_extractor(cli)?, config);
    driver.open_transport(IoTransport::read_only(input)?)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    loop {
        match driver.read_packet(None) {
            Ok(packet) => write_hex(&mut out, &packet)?,
            Err(err) if is_end_of_stream(&err) => {
                let leftover = driver.buffered().len();
                if leftover > 0 {
                    warn!(leftover, "input ended inside a packet");
                }
                break;
            }
            Err(err) if err.is_timeout() => {
                warn!(timeout_ms = cli.timeout_ms, "no packet completed in time");
                break;
            }
            Err(err) => return Err(err),
        }
    }
    out.flush()?;

    let stats = driver.stats();
    debug!(
        good_rx = stats.good_rx,
        bad_rx = stats.bad_rx,
        queued = stats.queued_bytes,
        "input exhausted"
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let input: Box<dyn Read + Send> = match &cli.file {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin()),
    };
    run(&cli, input)?;
    Ok(())
}

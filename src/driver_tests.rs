//! Unit tests for [`Driver`].

use std::{
    io,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use rstest::{fixture, rstest};
use tracing_test::traced_test;

use super::*;
use crate::{
    error::MockContextError,
    frame::{Extraction, FixedSize, LengthFormat, LengthPrefixed, WholeBuffer},
};

const ZERO: Option<Duration> = Some(Duration::ZERO);
const SHORT: Option<Duration> = Some(Duration::from_millis(20));

#[fixture]
fn fixed4() -> Driver<FixedSize> {
    let mut driver = Driver::new(FixedSize::new(4), 16);
    driver.open_test_stream();
    driver
}

/// Skips leading zero bytes, then yields two-byte packets.
fn skip_zeros(buf: &[u8]) -> Extraction {
    match buf.iter().position(|&b| b != 0) {
        None => Extraction::Discard(buf.len()),
        Some(0) if buf.len() >= 2 => Extraction::Packet(2),
        Some(0) => Extraction::NeedMore,
        Some(pos) => Extraction::Discard(pos),
    }
}

#[rstest]
fn fragments_from_transport_are_joined(mut fixed4: Driver<FixedSize>) {
    let stream = fixed4.test_stream_mut().expect("test stream");
    stream.push_inbound(vec![0_u8, 1]);
    stream.push_inbound(vec![2_u8, 3]);

    let packet = fixed4.read_packet(SHORT).expect("packet");
    assert_eq!(packet.as_ref(), &[0, 1, 2, 3]);
    assert_eq!(fixed4.test_stream().expect("test stream").pending_inbound(), 0);
}

#[rstest]
fn zero_timeout_never_reads_transport(mut fixed4: Driver<FixedSize>) {
    fixed4
        .test_stream_mut()
        .expect("test stream")
        .push_inbound(vec![0_u8, 1, 2, 3]);

    let err = fixed4.read_packet(ZERO).expect_err("nothing buffered");
    assert!(err.is_timeout());
    assert_eq!(fixed4.test_stream().expect("test stream").pending_inbound(), 4);
}

#[rstest]
fn buffered_packet_is_served_before_transport(mut fixed4: Driver<FixedSize>) {
    fixed4.push_data(&[9, 9, 9, 9]).expect("fits");
    fixed4
        .test_stream_mut()
        .expect("test stream")
        .push_inbound(vec![1_u8, 1, 1, 1]);

    assert_eq!(fixed4.read_packet(SHORT).expect("packet").as_ref(), &[9, 9, 9, 9]);
    assert_eq!(fixed4.read_packet(SHORT).expect("packet").as_ref(), &[1, 1, 1, 1]);
}

#[rstest]
fn timeout_respects_budget(mut fixed4: Driver<FixedSize>) {
    let started = Instant::now();
    let err = fixed4
        .read_packet(Some(Duration::from_millis(30)))
        .expect_err("no data");
    let elapsed = started.elapsed();

    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_millis(30));
    assert!(elapsed < Duration::from_millis(500), "waited {elapsed:?}");
}

/// Serves one chunk, then waits out every later read, logging each timeout.
struct Recording {
    chunk: Option<Vec<u8>>,
    timeouts: Arc<Mutex<Vec<Duration>>>,
}

impl Transport for Recording {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.timeouts
            .lock()
            .map_err(|_| io::Error::other("poisoned"))?
            .push(timeout);
        if let Some(chunk) = self.chunk.take() {
            buf[..chunk.len()].copy_from_slice(&chunk);
            return Ok(chunk.len());
        }
        std::thread::sleep(timeout);
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> { Ok(data.len()) }
}

#[test]
fn each_transport_read_gets_the_remaining_budget() {
    let budget = Duration::from_millis(100);
    let timeouts = Arc::new(Mutex::new(Vec::new()));
    let mut driver = Driver::new(FixedSize::new(4), 16);
    driver
        .open_transport(Recording {
            chunk: Some(vec![1, 2]),
            timeouts: Arc::clone(&timeouts),
        })
        .expect("open");

    let started = Instant::now();
    let err = driver.read_packet(Some(budget)).expect_err("never completes");
    let elapsed = started.elapsed();

    assert!(err.is_timeout());
    assert!(elapsed < budget * 3 / 2, "waited {elapsed:?}");
    assert_eq!(driver.buffered(), &[1, 2]);

    let timeouts = timeouts.lock().expect("not poisoned");
    assert!(timeouts.len() >= 2, "reads: {timeouts:?}");
    assert!(timeouts[0] <= budget);
    assert!(timeouts[1..].iter().all(|&t| t < budget), "reads: {timeouts:?}");
    assert!(
        timeouts.windows(2).all(|pair| pair[1] <= pair[0]),
        "budget grew between reads: {timeouts:?}"
    );
}

/// Claims one byte more than it was offered.
struct Overreporting;

impl Transport for Overreporting {
    fn read(&mut self, buf: &mut [u8], _: Duration) -> io::Result<usize> { Ok(buf.len() + 1) }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> { Ok(data.len() + 1) }
}

#[test]
fn overreported_read_is_invalid_data() {
    let mut driver = Driver::new(FixedSize::new(4), 16);
    driver.open_transport(Overreporting).expect("open");

    let err = driver.read_packet(SHORT).expect_err("bogus count");
    assert!(
        matches!(&err, DriverError::Io(e) if e.kind() == io::ErrorKind::InvalidData),
        "unexpected error: {err}"
    );
    assert!(driver.buffered().is_empty());
}

#[test]
fn overreported_write_is_invalid_data() {
    let mut driver = Driver::new(WholeBuffer, 16);
    driver.open_transport(Overreporting).expect("open");

    let err = driver.write_packet(&[1, 2, 3], None).expect_err("bogus count");
    assert!(
        matches!(&err, DriverError::Io(e) if e.kind() == io::ErrorKind::InvalidData),
        "unexpected error: {err}"
    );
    assert_eq!(driver.stats().tx, 0);
}

#[rstest]
fn failed_read_keeps_partial_bytes(mut fixed4: Driver<FixedSize>) {
    fixed4.push_data(&[0, 1]).expect("fits");
    assert!(fixed4.read_packet(ZERO).expect_err("incomplete").is_timeout());
    assert_eq!(fixed4.buffered(), &[0, 1]);
}

#[test]
fn read_on_closed_driver_needs_transport() {
    let mut driver = Driver::new(FixedSize::new(4), 16);
    let err = driver.read_packet(SHORT).expect_err("closed");
    assert!(matches!(err, DriverError::NotOpen));
}

#[test]
fn closed_driver_still_serves_buffered_packets() {
    let mut driver = Driver::new(FixedSize::new(2), 16);
    driver.push_data(&[1, 2]).expect("fits");
    assert_eq!(driver.read_packet(ZERO).expect("packet").as_ref(), &[1, 2]);
}

#[test]
fn garbage_is_discarded_and_counted() {
    let mut driver = Driver::new(skip_zeros, 16);
    driver.push_data(&[0, 0, 0, 7, 8]).expect("fits");

    assert_eq!(driver.read_packet(ZERO).expect("packet").as_ref(), &[7, 8]);
    let stats = driver.stats();
    assert_eq!(stats.bad_rx, 3);
    assert_eq!(stats.good_rx, 2);
    assert_eq!(stats.queued_bytes, 0);
}

#[test]
fn buffer_full_when_extractor_never_completes() {
    let config = DriverConfig::default()
        .max_packet_size(4)
        .internal_buffer_size(8);
    let mut driver = Driver::with_config(|_: &[u8]| Extraction::NeedMore, config);
    driver.open_test_stream();
    driver
        .test_stream_mut()
        .expect("test stream")
        .push_inbound(vec![0_u8; 12]);

    let err = driver.read_packet(SHORT).expect_err("never completes");
    assert!(matches!(err, DriverError::BufferFull { capacity: 8 }));
    assert_eq!(driver.buffered().len(), 8);
}

#[test]
fn extractor_overrun_is_reported() {
    let mut driver = Driver::new(|_: &[u8]| Extraction::Packet(10), 16);
    driver.push_data(&[1, 2]).expect("fits");
    let err = driver.read_packet(ZERO).expect_err("overrun");
    assert!(matches!(
        err,
        DriverError::ExtractorOverrun {
            reported: 10,
            available: 2
        }
    ));
    assert_eq!(driver.buffered(), &[1, 2]);
}

#[test]
fn extract_last_returns_newest_packet() {
    let config = DriverConfig::default().max_packet_size(2).extract_last(true);
    let mut driver = Driver::with_config(FixedSize::new(2), config);
    driver.push_data(&[1, 1, 2, 2, 3, 3, 4]).expect("fits");

    assert_eq!(driver.read_packet(ZERO).expect("packet").as_ref(), &[3, 3]);
    assert_eq!(driver.buffered(), &[4]);
    let stats = driver.stats();
    assert_eq!(stats.bad_rx, 4);
    assert_eq!(stats.good_rx, 2);
}

#[test]
fn discards_before_a_deferred_overrun_are_counted() {
    let extractor = |buf: &[u8]| match buf[0] {
        0x00 => Extraction::Discard(1),
        0xFF => Extraction::Packet(100),
        _ => Extraction::Packet(2),
    };
    let config = DriverConfig::default().max_packet_size(8).extract_last(true);
    let mut driver = Driver::with_config(extractor, config);
    driver.push_data(&[1, 1, 0, 0xFF]).expect("fits");

    assert_eq!(driver.read_packet(ZERO).expect("packet").as_ref(), &[1, 1]);
    assert_eq!(driver.buffered(), &[0xFF]);
    assert_eq!(driver.stats().bad_rx, 1);

    let err = driver.read_packet(ZERO).expect_err("overrun resurfaces");
    assert!(matches!(err, DriverError::ExtractorOverrun { reported: 100, .. }));
    assert_eq!(driver.stats().bad_rx, 1);
}

#[test]
fn extract_last_can_be_toggled() {
    let mut driver = Driver::new(FixedSize::new(1), 4);
    driver.set_extract_last(true);
    driver.push_data(&[1, 2]).expect("fits");
    assert_eq!(driver.read_packet(ZERO).expect("packet").as_ref(), &[2]);

    driver.set_extract_last(false);
    driver.push_data(&[3, 4]).expect("fits");
    assert_eq!(driver.read_packet(ZERO).expect("packet").as_ref(), &[3]);
}

#[test]
fn has_packet_does_not_consume() {
    let mut driver = Driver::new(skip_zeros, 16);
    driver.push_data(&[0, 5]).expect("fits");
    assert!(!driver.has_packet().expect("scan"));

    driver.push_data(&[6]).expect("fits");
    assert!(driver.has_packet().expect("scan"));
    assert!(driver.has_packet().expect("scan"));
    assert_eq!(driver.read_packet(ZERO).expect("packet").as_ref(), &[5, 6]);
    assert_eq!(driver.stats().bad_rx, 1);
}

#[test]
fn clear_drops_buffered_bytes() {
    let mut driver = Driver::new(FixedSize::new(4), 16);
    driver.push_data(&[1, 2, 3]).expect("fits");
    assert_eq!(driver.clear(), 3);
    assert!(driver.buffered().is_empty());
    assert_eq!(driver.stats().queued_bytes, 0);
}

#[test]
fn push_data_rejects_overflow() {
    let config = DriverConfig::default()
        .max_packet_size(2)
        .internal_buffer_size(4);
    let mut driver = Driver::with_config(FixedSize::new(2), config);
    let err = driver.push_data(&[0; 5]).expect_err("overflow");
    assert!(matches!(err, DriverError::BufferFull { capacity: 4 }));
    assert!(driver.buffered().is_empty());
}

#[test]
fn length_prefixed_packets_round_trip_through_test_stream() {
    let framing = LengthPrefixed::new(LengthFormat::u16_be(), 32);
    let packet = framing.encode(b"hello").expect("payload fits");
    let mut driver = Driver::new(framing, 34);
    driver.open_test_stream();

    driver.write_packet(&packet, None).expect("write");
    let written = driver.test_stream_mut().expect("test stream").take_written();
    let stream = driver.test_stream_mut().expect("test stream");
    for byte in written {
        stream.push_inbound(vec![byte]);
    }

    let received = driver.read_packet(SHORT).expect("packet");
    assert_eq!(driver.extractor().payload(&received), b"hello");
}

#[test]
fn write_loops_over_partial_writes() {
    let mut driver = Driver::new(WholeBuffer, 16);
    driver.open_test_stream_with(TestStream::new().with_write_chunk(1));

    driver.write_packet(&[1, 2, 3, 4, 5], None).expect("write");
    assert_eq!(
        driver.test_stream().expect("test stream").written(),
        &[1, 2, 3, 4, 5]
    );
    assert_eq!(driver.stats().tx, 5);
}

struct Stalled;

impl Transport for Stalled {
    fn read(&mut self, _: &mut [u8], _: Duration) -> io::Result<usize> { Ok(0) }

    fn write(&mut self, _: &[u8]) -> io::Result<usize> { Ok(0) }
}

#[test]
fn write_times_out_on_stalled_transport() {
    let mut driver = Driver::new(WholeBuffer, 16);
    driver.open_transport(Stalled).expect("open");

    let err = driver
        .write_packet(&[1, 2], Some(Duration::from_millis(10)))
        .expect_err("stalled");
    assert!(err.is_timeout());
    assert_eq!(driver.stats().tx, 0);
}

#[test]
fn write_on_closed_driver_fails() {
    let mut driver = Driver::new(WholeBuffer, 16);
    assert!(matches!(
        driver.write_packet(&[1], None),
        Err(DriverError::NotOpen)
    ));
}

#[test]
fn test_stream_accessors_require_test_stream() {
    let mut driver = Driver::new(WholeBuffer, 16);
    driver.open_transport(Stalled).expect("open");
    assert!(matches!(
        driver.test_stream(),
        Err(DriverError::NotTestStream)
    ));
}

#[test]
fn close_detaches_transport_and_keeps_buffer() {
    let mut driver = Driver::new(WholeBuffer, 16);
    driver.open_test_stream();
    driver.push_data(&[1]).expect("fits");

    driver.close().expect("close");
    assert!(!driver.is_open());
    assert_eq!(driver.buffered(), &[1]);
}

#[test]
fn mock_reply_lands_in_receive_buffer() {
    let mut driver = Driver::new(WholeBuffer, 16);
    driver.open_test_stream();
    {
        let mut mock = driver.activate_mock().expect("activate");
        mock.expect_reply(vec![1_u8], vec![2_u8, 3])
            .expect("queue");
        mock.write_packet(&[1], None).expect("matches");
        assert_eq!(mock.read_packet(ZERO).expect("reply").as_ref(), &[2, 3]);
        mock.finish().expect("all met");
    }
    assert!(!driver.is_mock_active());
    assert!(driver.test_stream().expect("test stream").written().is_empty());
}

#[test]
fn mock_reply_that_does_not_fit_keeps_expectation() {
    let config = DriverConfig::default()
        .max_packet_size(2)
        .internal_buffer_size(2);
    let mut driver = Driver::with_config(WholeBuffer, config);
    let mut mock = driver.activate_mock().expect("activate");
    mock.expect_reply(vec![1_u8], vec![0_u8; 3]).expect("queue");

    let err = mock.write_packet(&[1], None).expect_err("reply too big");
    assert!(matches!(err, DriverError::BufferFull { capacity: 2 }));
    assert_eq!(mock.pending_expectations(), 1);
}

#[test]
fn expectations_need_active_mock() {
    let mut driver = Driver::new(WholeBuffer, 16);
    assert!(matches!(
        driver.expect_reply(vec![1_u8], vec![2_u8]),
        Err(DriverError::MockContext(MockContextError::Inactive))
    ));
    assert!(matches!(
        driver.clear_expectations(),
        Err(DriverError::MockContext(MockContextError::Inactive))
    ));
}

#[test]
fn mock_writes_count_as_transmitted() {
    let mut driver = Driver::new(WholeBuffer, 16);
    let mut mock = driver.activate_mock().expect("activate");
    mock.expect_reply(vec![1_u8, 2], vec![3_u8]).expect("queue");
    mock.write_packet(&[1, 2], None).expect("matches");
    assert_eq!(mock.stats().tx, 2);
}

#[test]
fn reset_stats_clears_counters() {
    let mut driver = Driver::new(WholeBuffer, 16);
    driver.push_data(&[1, 2]).expect("fits");
    driver.read_packet(ZERO).expect("packet");
    assert!(driver.stats().stamp.is_some());

    driver.reset_stats();
    assert_eq!(driver.stats(), DriverStats::default());
}

#[test]
#[traced_test]
fn discarded_bytes_are_logged() {
    let mut driver = Driver::new(skip_zeros, 16);
    driver.push_data(&[0, 0, 1, 2]).expect("fits");
    driver.read_packet(ZERO).expect("packet");
    assert!(logs_contain("discarded garbage bytes"));
    assert!(logs_contain("discarded=2"));
}

#[test]
#[traced_test]
fn mock_mismatch_is_logged() {
    let mut driver = Driver::new(WholeBuffer, 16);
    let mut mock = driver.activate_mock().expect("activate");
    mock.expect_reply(vec![1_u8], vec![2_u8]).expect("queue");
    mock.write_packet(&[9], None).expect_err("mismatch");
    assert!(logs_contain("write does not match expectation"));
}

#[test]
fn debug_output_hides_extractor() {
    let driver = Driver::new(|_: &[u8]| Extraction::NeedMore, 16);
    let rendered = format!("{driver:?}");
    assert!(rendered.contains("Driver"));
    assert!(rendered.contains("Closed"));
}

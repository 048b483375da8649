// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Outlet fan-out to real inlet sessions over loopback

use std::thread;
use std::time::{Duration, Instant};
use streamsense_inlet::{InletConfig, InletSession, RegistryConfig, StreamRegistry};
use streamsense_outlet::{OutletConfig, OutletError, StreamOutlet};
use streamsense_types::{ChannelFormat, StreamInfo};

/// Route library logs through the test harness; later calls are no-ops
fn init_test_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn outlet(port_base: u16, channel_count: usize, format: ChannelFormat) -> StreamOutlet {
    init_test_logging();
    StreamOutlet::new(
        StreamInfo::new("Outlet", "EEG", channel_count, 100.0, format, "outlet-test"),
        OutletConfig::default()
            .with_bind_address("127.0.0.1")
            .with_ports(port_base, 4),
    )
    .unwrap()
}

fn connect(outlet: &StreamOutlet, port_base: u16) -> InletSession {
    let registry = StreamRegistry::new(
        RegistryConfig::default()
            .with_peers(["127.0.0.1"])
            .with_ports(port_base, 4),
    )
    .unwrap();
    let streams = registry
        .discover_matching(&format!("uid='{}'", outlet.descriptor().uid()), 1, Duration::from_secs(2))
        .unwrap();
    assert_eq!(streams.len(), 1);

    let session = InletSession::new(streams[0].clone(), InletConfig::default()).unwrap();
    session.open().unwrap();
    session
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_samples_reach_every_consumer() {
    let outlet = outlet(39200, 2, ChannelFormat::Double64);
    let first = connect(&outlet, 39200);
    let second = connect(&outlet, 39200);
    assert!(wait_until(Duration::from_secs(2), || outlet.consumer_count() == 2));
    assert!(outlet.have_consumers());

    outlet.push_sample_at(&[1.5, -2.5], 10.0).unwrap();

    for session in [&first, &second] {
        let sample = session
            .reader()
            .pull_sample(Duration::from_secs(2))
            .unwrap()
            .expect("sample should arrive");
        assert_eq!(sample.values, vec![1.5, -2.5]);
        assert_eq!(sample.timestamp, 10.0);
    }
}

#[test]
fn test_chunk_is_back_dated_by_sample_period() {
    let outlet = outlet(39210, 1, ChannelFormat::Int16);
    let session = connect(&outlet, 39210);
    assert!(wait_until(Duration::from_secs(2), || outlet.have_consumers()));

    outlet
        .push_chunk(&[vec![1.0], vec![2.0], vec![3.0]])
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || session.stats().received == 3));

    let chunk = session.reader().pull_chunk().unwrap();
    let ts = chunk.timestamps();
    assert!((ts[1] - ts[0] - 0.01).abs() < 1e-9);
    assert!((ts[2] - ts[1] - 0.01).abs() < 1e-9);
    assert_eq!(chunk[2].values, vec![3.0]);
}

#[test]
fn test_wrong_channel_count_rejected() {
    let outlet = outlet(39220, 3, ChannelFormat::Float32);
    assert!(matches!(
        outlet.push_sample(&[1.0]),
        Err(OutletError::ChannelMismatch { expected: 3, actual: 1 })
    ));
    assert!(outlet
        .push_chunk(&[vec![1.0, 2.0, 3.0], vec![1.0]])
        .is_err());
    assert_eq!(outlet.pushed_count(), 0);
}

#[test]
fn test_close_ends_stream_for_inlets() {
    let outlet = outlet(39230, 1, ChannelFormat::Float32);
    let session = connect(&outlet, 39230);
    assert!(wait_until(Duration::from_secs(2), || outlet.have_consumers()));

    outlet.push_sample(&[4.0]).unwrap();
    outlet.close();
    outlet.close();

    assert!(wait_until(Duration::from_secs(2), || session.is_stream_ended()));
    assert_eq!(
        session
            .reader()
            .pull_sample(Duration::from_secs(1))
            .unwrap()
            .map(|s| s.values),
        Some(vec![4.0])
    );
    assert!(matches!(outlet.push_sample(&[1.0]), Err(OutletError::Closed)));
}

#[test]
fn test_stalled_consumer_does_not_block_producer() {
    let outlet = StreamOutlet::new(
        StreamInfo::new("Fast", "EEG", 8, 0.0, ChannelFormat::Double64, ""),
        OutletConfig::default()
            .with_bind_address("127.0.0.1")
            .with_ports(39240, 4)
            .with_max_buffered(16),
    )
    .unwrap();
    let _session = connect(&outlet, 39240);
    assert!(wait_until(Duration::from_secs(2), || outlet.have_consumers()));

    let started = Instant::now();
    for i in 0..50_000 {
        outlet.push_sample(&[i as f64; 8]).unwrap();
    }
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(outlet.pushed_count(), 50_000);
}

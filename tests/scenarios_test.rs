// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Whole-stack behaviour: real outlets, registries, sessions and the client
//! loop over loopback. Each test owns its own discovery port range.

use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};
use streamsense::client::{ClientLoop, ExitCode, ShutdownSignal};
use streamsense::config::StreamsenseConfig;
use streamsense::prelude::*;

fn registry(port_base: u16) -> StreamRegistry {
    StreamRegistry::new(
        RegistryConfig::default()
            .with_peers(["127.0.0.1"])
            .with_ports(port_base, 4)
            .with_query_interval(Duration::from_millis(100)),
    )
    .unwrap()
}

fn outlet(port_base: u16, name: &str, channel_count: usize) -> StreamOutlet {
    StreamOutlet::new(
        StreamInfo::new(name, "EEG", channel_count, 0.0, ChannelFormat::Float32, name),
        OutletConfig::default()
            .with_bind_address("127.0.0.1")
            .with_ports(port_base, 4),
    )
    .unwrap()
}

fn client_config(port_base: u16) -> StreamsenseConfig {
    let mut config = StreamsenseConfig::default();
    config.discovery.peers = vec!["127.0.0.1".into()];
    config.discovery.port_base = port_base;
    config.discovery.port_range = 4;
    config.inlet.open_retries = 0;
    config.pull.sample_timeout = 0.2;
    config.pull.inter_pull_delay = 0.05;
    config
}

fn open_session(port_base: u16) -> InletSession {
    let streams = registry(port_base).discover(Duration::from_millis(500)).unwrap();
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
fn test_discover_never_returns_duplicate_uids() {
    let _a = outlet(39500, "A", 2);
    let _b = outlet(39500, "B", 2);
    let _c = outlet(39500, "C", 2);
    let registry = registry(39500);

    for _ in 0..3 {
        let streams = registry.discover(Duration::from_millis(400)).unwrap();
        let uids: HashSet<&str> = streams.iter().map(|d| d.uid()).collect();
        assert_eq!(uids.len(), streams.len());
        assert_eq!(streams.len(), 3);
    }
}

#[test]
fn test_pull_outside_open_state_is_invalid() {
    let _outlet = outlet(39510, "Lifecycle", 2);
    let descriptor = registry(39510)
        .discover(Duration::from_millis(500))
        .unwrap()
        .remove(0);
    let session = InletSession::new(descriptor, InletConfig::default()).unwrap();

    let reader = session.reader();
    assert!(reader.pull_sample(Duration::ZERO).unwrap_err().is_invalid_state());
    assert!(reader.pull_chunk().unwrap_err().is_invalid_state());
    assert!(reader.pull_chunk_multiplexed().unwrap_err().is_invalid_state());

    session.open().unwrap();
    assert!(reader.pull_chunk().is_ok());
    session.close();

    assert!(reader.pull_sample(Duration::ZERO).unwrap_err().is_invalid_state());
    assert!(reader.pull_chunk().unwrap_err().is_invalid_state());
    assert!(reader.pull_chunk_multiplexed().unwrap_err().is_invalid_state());
}

#[test]
fn test_multiplexed_chunk_matches_chunk_layout() {
    let outlet = outlet(39520, "Layout", 3);
    let session = open_session(39520);
    assert!(wait_until(Duration::from_secs(2), || outlet.have_consumers()));

    let rows: Vec<Vec<f64>> = (0..6)
        .map(|i| vec![i as f64, i as f64 + 0.25, -(i as f64)])
        .collect();
    outlet.push_chunk(&rows[..3]).unwrap();
    assert!(wait_until(Duration::from_secs(2), || session.stats().received == 3));
    let chunk = session.reader().pull_chunk().unwrap();

    outlet.push_chunk(&rows[3..]).unwrap();
    assert!(wait_until(Duration::from_secs(2), || session.stats().received == 6));
    let multiplexed = session.reader().pull_chunk_multiplexed().unwrap();

    assert_eq!(chunk.sample_count(), 3);
    let flat = chunk.to_multiplexed(3).unwrap();
    assert_eq!(flat.len(), chunk.iter().map(|s| s.values.len()).sum::<usize>());
    for i in 0..chunk.sample_count() {
        for c in 0..3 {
            assert_eq!(flat.values()[i * 3 + c], chunk[i].values[c]);
        }
    }

    assert_eq!(multiplexed.len(), 3 * 3);
    assert_eq!(multiplexed.len() % 3, 0);
    assert_eq!(&multiplexed.values()[..3], rows[3].as_slice());
}

#[test]
fn test_close_is_idempotent() {
    let outlet = outlet(39530, "Closing", 1);
    let session = open_session(39530);
    assert!(wait_until(Duration::from_secs(2), || outlet.have_consumers()));

    session.close();
    session.close();
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_scenario_1_no_advertisers_exits_1() {
    let streams = registry(39540).discover(Duration::from_secs(1)).unwrap();
    assert!(streams.is_empty());

    let client = ClientLoop::new(client_config(39540)).unwrap();
    let code = client.run(Vec::new(), &ShutdownSignal::new());
    assert_eq!(code, ExitCode::NoStreams);
    assert_eq!(code.code(), 1);
}

#[test]
fn test_scenario_2_every_sample_has_eight_values() {
    let outlet = outlet(39550, "Eight", 8);
    let session = open_session(39550);
    assert_eq!(session.channel_count(), 8);
    assert!(wait_until(Duration::from_secs(2), || outlet.have_consumers()));

    for i in 0..20 {
        outlet.push_sample(&[i as f64; 8]).unwrap();
    }

    let reader = session.reader();
    let mut seen = 0;
    let deadline = Instant::now() + Duration::from_secs(3);
    while seen < 20 && Instant::now() < deadline {
        if let Some(sample) = reader.pull_sample(Duration::from_millis(200)).unwrap() {
            assert_eq!(sample.values.len(), 8);
            seen += 1;
        }
        for sample in reader.pull_chunk().unwrap() {
            assert_eq!(sample.values.len(), 8);
            seen += 1;
        }
    }
    assert_eq!(seen, 20);
}

#[test]
fn test_scenario_3_zero_timeout_returns_immediately() {
    let _outlet = outlet(39560, "Idle", 2);
    let session = open_session(39560);

    let started = Instant::now();
    let sample = session.reader().pull_sample(Duration::ZERO).unwrap();
    assert!(sample.is_none());
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_scenario_4_stale_descriptor_fails_and_stays_unopened() {
    let descriptor = {
        let outlet = outlet(39570, "Vanishing", 2);
        let found = registry(39570).discover(Duration::from_millis(500)).unwrap();
        assert_eq!(found[0].uid(), outlet.descriptor().uid());
        found.into_iter().next().unwrap()
    };

    let session = InletSession::new(descriptor, InletConfig::default()).unwrap();
    let err = session.open().unwrap_err();
    assert!(err.is_connection_error());
    assert_eq!(session.state(), SessionState::Unopened);
}

#[test]
fn test_scenario_5_interrupt_mid_pull_exits_0() {
    let outlet = outlet(39580, "Interrupted", 4);
    let mut config = client_config(39580);
    config.pull.sample_timeout = 30.0;
    config.inlet.close_grace = 0.5;
    let client = ClientLoop::new(config).unwrap();

    let shutdown = ShutdownSignal::new();
    let handle = {
        let shutdown = shutdown.clone();
        thread::spawn(move || client.run(Vec::new(), &shutdown))
    };
    assert!(wait_until(Duration::from_secs(3), || outlet.have_consumers()));
    thread::sleep(Duration::from_millis(100));

    let interrupted = Instant::now();
    shutdown.trigger();
    let code = handle.join().unwrap();

    assert_eq!(code, ExitCode::Clean);
    assert!(interrupted.elapsed() < Duration::from_secs(2));
}

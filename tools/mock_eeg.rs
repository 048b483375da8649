// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Mock EEG Outlet

Advertises a random 4-channel EEG stream so the client has something to
connect to without a headset.

Usage:
  cargo run --bin mock-eeg -- [--channels 4] [--srate 256] [--seed 7]
  cargo run --bin streamsense -- --query "type='EEG'"
*/

use anyhow::Context;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::path::PathBuf;
use std::sync::Arc;
use streamsense::outlet::{MockEegConfig, MockEegGenerator, OutletConfig};
use streamsense_observability::{init_logging_from_config, CrateDebugFlags, LogFormat, LoggingConfig};
use tracing::info;

/// Random EEG stream for testing streamsense clients
#[derive(Parser, Debug)]
#[command(name = "mock-eeg", version, long_about = None)]
struct Args {
    /// Stream name
    #[arg(long, default_value = "MyStream")]
    name: String,

    /// Content type
    #[arg(long = "type", default_value = "EEG")]
    content_type: String,

    /// Number of channels
    #[arg(long, default_value_t = 4)]
    channels: usize,

    /// Nominal sample rate in Hz
    #[arg(long, default_value_t = 256.0)]
    srate: f64,

    /// Source id advertised with the stream
    #[arg(long, default_value = "muse-simulator-eeg")]
    source_id: String,

    /// Values are drawn uniformly from [0, max-value)
    #[arg(long, default_value_t = 100.0)]
    max_value: f64,

    /// Seed for reproducible values
    #[arg(long)]
    seed: Option<u64>,

    /// Hostname advertised to inlets
    #[arg(long, default_value = "localhost")]
    hostname: String,

    /// First discovery port
    #[arg(long, default_value_t = 16571)]
    port_base: u16,

    /// Log output format (text or json)
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Also write JSON logs under this directory (needs the file-logging feature)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable debug logging for every crate
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut debug_flags = CrateDebugFlags::default();
    if args.verbose {
        debug_flags = CrateDebugFlags::from_args(["--debug-all".to_string()]);
    }
    let _logging = init_logging_from_config(
        &debug_flags,
        &LoggingConfig {
            format: args.log_format,
            file_dir: args.log_dir.clone(),
        },
    )?;

    let config = MockEegConfig {
        name: args.name,
        content_type: args.content_type,
        channel_count: args.channels,
        nominal_srate: args.srate,
        source_id: args.source_id,
        max_value: args.max_value,
        seed: args.seed,
    };
    let outlet_config = OutletConfig::default()
        .with_hostname(args.hostname)
        .with_ports(args.port_base, OutletConfig::default().port_range);

    let mut generator =
        MockEegGenerator::new(config, outlet_config).context("Failed to start outlet")?;
    info!("Now sending data... (Press Ctrl+C to stop)");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received...");
        r.store(false, Ordering::SeqCst);
    })?;

    let pushed = generator.run(&running)?;
    info!("Sent {} samples", pushed);
    Ok(())
}

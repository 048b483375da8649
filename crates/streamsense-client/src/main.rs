// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use streamsense_client::{ClientError, ClientLoop, ExitCode, ShutdownSignal};
use streamsense_config::{apply_cli_overrides, load_config, StreamsenseConfig};
use streamsense_observability::{
    debug_flags_help, init_logging_from_config, CrateDebugFlags, LogFormat, LoggingConfig,
};
use tracing::{error, info};

/// streamsense - find a stream on the network and print its samples
#[derive(Parser, Debug)]
#[command(name = "streamsense", version, author, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stream filter, e.g. "type='EEG' and name='MyStream'"
    #[arg(short, long)]
    query: Option<String>,

    /// Stop after this many pull iterations
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Discovery window in seconds
    #[arg(long)]
    discovery_timeout: Option<f64>,

    /// Comma-separated addresses to query, e.g. "127.0.0.1,192.168.1.255"
    #[arg(long)]
    peers: Option<String>,

    /// First discovery port
    #[arg(long)]
    port_base: Option<u16>,

    /// Seconds to wait after each pull
    #[arg(long)]
    inter_pull_delay: Option<f64>,

    /// Log output format (text or json)
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Also write JSON logs under this directory (needs the file-logging feature)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        let mut set = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                overrides.insert(key.to_string(), value);
            }
        };
        set("query", self.query.clone());
        set("max_iterations", self.max_iterations.map(|v| v.to_string()));
        set("discovery_timeout", self.discovery_timeout.map(|v| v.to_string()));
        set("peers", self.peers.clone());
        set("port_base", self.port_base.map(|v| v.to_string()));
        set("inter_pull_delay", self.inter_pull_delay.map(|v| v.to_string()));
        overrides
    }
}

fn build_config(args: &Args) -> Result<StreamsenseConfig, ClientError> {
    let mut config = load_config(args.config.as_deref())?;
    apply_cli_overrides(&mut config, &args.overrides())?;
    Ok(config)
}

fn main() -> std::process::ExitCode {
    // Debug flags are read from the raw arguments so clap never rejects them
    let (args, debug_flags) = split_debug_flags(std::env::args().collect());
    let args = Args::parse_from(args);

    let logging_config = LoggingConfig {
        format: args.log_format,
        file_dir: args.log_dir.clone(),
    };
    let _logging = match init_logging_from_config(&debug_flags, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::ConfigError.into();
        }
    };
    #[cfg(feature = "file-logging")]
    if let Some(dir) = _logging.log_dir() {
        info!("[CLIENT] Writing logs to {}", dir.display());
    }
    #[cfg(not(feature = "file-logging"))]
    if args.log_dir.is_some() {
        tracing::warn!("[CLIENT] --log-dir ignored: built without the file-logging feature");
    }

    let client = match build_config(&args).and_then(ClientLoop::new) {
        Ok(client) => client,
        Err(e) => {
            error!("[CLIENT] {}", e);
            return ExitCode::from_result(&Err(e)).into();
        }
    };

    let shutdown = ShutdownSignal::new();
    if let Err(e) = install_interrupt_handler(&shutdown) {
        error!("[CLIENT] {:#}", e);
        return ExitCode::ConfigError.into();
    }

    let code = client.run(std::io::stdout().lock(), &shutdown);
    info!("[CLIENT] Exiting with status {}", code.code());
    code.into()
}

fn install_interrupt_handler(shutdown: &ShutdownSignal) -> anyhow::Result<()> {
    let shutdown = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("[CLIENT] Shutdown signal received...");
        shutdown.trigger();
    })
    .context("Failed to install Ctrl+C handler")
}

/// Separate `--debug-<crate>` flags from the arguments clap should see
fn split_debug_flags(raw: Vec<String>) -> (Vec<String>, CrateDebugFlags) {
    let (debug, rest): (Vec<String>, Vec<String>) = raw
        .into_iter()
        .partition(|arg| arg.starts_with("--debug-"));
    (rest, CrateDebugFlags::from_args(debug))
}

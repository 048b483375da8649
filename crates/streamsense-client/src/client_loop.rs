// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Discover → connect → pull → print, until interrupted

use crate::exit::{ClientError, ExitCode};
use crate::printer;
use crate::shutdown::ShutdownSignal;
use crossbeam::channel;
use crossbeam::select;
use std::io::Write;
use std::thread;
use std::time::Duration;
use streamsense_config::{validate_config, StreamsenseConfig};
use streamsense_inlet::{InletConfig, InletSession, RegistryConfig, SampleReader, StreamRegistry};
use streamsense_types::StreamQuery;
use tracing::{debug, error, info, warn};

/// Closes the session when dropped, whichever way the loop exits
pub struct SessionGuard<'a> {
    session: &'a InletSession,
}

impl<'a> SessionGuard<'a> {
    pub fn new(session: &'a InletSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &'a InletSession {
        self.session
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.session.close();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PullMode {
    Sample,
    Chunk,
    Multiplexed,
}

const PULL_ORDER: [PullMode; 3] = [PullMode::Sample, PullMode::Chunk, PullMode::Multiplexed];

/// The client's orchestration loop
///
/// One iteration pulls once in each mode (sample, chunk, multiplexed chunk),
/// waiting the inter-pull delay after every pull.
#[derive(Debug, Clone)]
pub struct ClientLoop {
    config: StreamsenseConfig,
    query: Option<String>,
    registry: RegistryConfig,
    inlet: InletConfig,
    discovery_timeout: Duration,
    sample_timeout: Duration,
    inter_pull_delay: Duration,
}

impl ClientLoop {
    /// Validate `config` and prepare a loop. Nothing touches the network yet.
    pub fn new(config: StreamsenseConfig) -> Result<Self, ClientError> {
        validate_config(&config)?;

        let query = match config.client.query.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => {
                let parsed = StreamQuery::parse(text).map_err(|e| ClientError::Config(e.to_string()))?;
                (!parsed.is_any()).then(|| text.to_string())
            }
        };

        let discovery = &config.discovery;
        let registry = RegistryConfig::default()
            .with_peers(discovery.peers.iter().cloned())
            .with_ports(discovery.port_base, discovery.port_range)
            .with_query_interval(discovery.query_interval()?);
        registry.validate()?;

        let inlet_section = &config.inlet;
        let inlet = InletConfig::default()
            .with_max_buffered(inlet_section.max_buffered)
            .with_connect_timeout(inlet_section.connect_timeout()?)
            .with_retries(inlet_section.open_retries, inlet_section.retry_backoff()?)
            .with_close_grace(inlet_section.close_grace()?);
        inlet.validate()?;

        let discovery_timeout = discovery.timeout()?;
        let sample_timeout = config.pull.sample_timeout()?;
        let inter_pull_delay = config.pull.inter_pull_delay()?;

        Ok(Self {
            config,
            query,
            registry,
            inlet,
            discovery_timeout,
            sample_timeout,
            inter_pull_delay,
        })
    }

    pub fn config(&self) -> &StreamsenseConfig {
        &self.config
    }

    pub fn registry_config(&self) -> &RegistryConfig {
        &self.registry
    }

    pub fn inlet_config(&self) -> &InletConfig {
        &self.inlet
    }

    /// Run to completion and report the outcome as an exit code
    ///
    /// Failures are logged here and nowhere else.
    pub fn run<W: Write>(&self, out: W, shutdown: &ShutdownSignal) -> ExitCode {
        let result = self.execute(out, shutdown);
        let code = ExitCode::from_result(&result);
        match &result {
            Ok(()) => info!("[CLIENT] Finished"),
            Err(ClientError::NoStreams) => warn!("[CLIENT] No streams found"),
            Err(e) => error!("[CLIENT] {}", e),
        }
        code
    }

    fn execute<W: Write>(&self, mut out: W, shutdown: &ShutdownSignal) -> Result<(), ClientError> {
        let registry = StreamRegistry::new(self.registry.clone())?;
        let timeout = self.discovery_timeout;

        info!("[CLIENT] Looking for streams ({:?})", timeout);
        let streams = match &self.query {
            Some(query) => registry.discover_matching(query, 1, timeout)?,
            None => registry.discover(timeout)?,
        };
        for descriptor in &streams {
            debug!("[CLIENT] Found {}", descriptor.describe());
        }
        if shutdown.is_triggered() {
            return Ok(());
        }

        let descriptor = streams.into_iter().next().ok_or(ClientError::NoStreams)?;
        info!("[CLIENT] Connecting to {}", descriptor.describe());

        let session = InletSession::new(descriptor, self.inlet.clone())?;
        let guard = SessionGuard::new(&session);
        guard.session().open_with_retry()?;

        let (finished, done) = channel::bounded::<()>(0);
        thread::scope(|scope| {
            scope.spawn(|| {
                select! {
                    recv(shutdown.receiver()) -> _ => {
                        info!("[CLIENT] Interrupted, closing session");
                        session.close();
                    }
                    recv(done) -> _ => {}
                }
            });

            let result = self.pull_loop(&mut out, guard.session(), shutdown);
            drop(finished);
            result
        })
    }

    fn pull_loop<W: Write>(
        &self,
        out: &mut W,
        session: &InletSession,
        shutdown: &ShutdownSignal,
    ) -> Result<(), ClientError> {
        let reader = session.reader();
        let sample_timeout = self.sample_timeout;
        let delay = self.inter_pull_delay;
        let mut iteration = 0u64;

        loop {
            if let Some(max) = self.config.client.max_iterations {
                if iteration >= max {
                    info!("[CLIENT] Reached {} iterations", max);
                    return Ok(());
                }
            }
            iteration += 1;

            let mut pulled = 0;
            for mode in PULL_ORDER {
                if shutdown.is_triggered() {
                    return Ok(());
                }
                match pull_once(out, &reader, mode, sample_timeout) {
                    Ok(count) => pulled += count,
                    Err(ClientError::InvalidState(_)) if shutdown.is_triggered() => return Ok(()),
                    Err(e) => return Err(e),
                }
                out.flush()?;
                if shutdown.wait_timeout(delay) {
                    return Ok(());
                }
            }

            if pulled == 0 && session.is_stream_ended() {
                info!("[CLIENT] Stream ended");
                return Ok(());
            }
        }
    }
}

/// Pull once in `mode` and print it; returns the number of samples printed
fn pull_once<W: Write>(
    out: &mut W,
    reader: &SampleReader<'_>,
    mode: PullMode,
    sample_timeout: Duration,
) -> Result<usize, ClientError> {
    match mode {
        PullMode::Sample => match reader.pull_sample(sample_timeout)? {
            Some(sample) => {
                printer::write_sample(out, &sample)?;
                Ok(1)
            }
            None => Ok(0),
        },
        PullMode::Chunk => {
            let chunk = reader.pull_chunk()?;
            printer::write_chunk(out, &chunk)?;
            Ok(chunk.sample_count())
        }
        PullMode::Multiplexed => {
            let chunk = reader.pull_chunk_multiplexed()?;
            printer::write_multiplexed(out, &chunk)?;
            Ok(chunk.sample_count())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamsense_types::{ChannelFormat, StreamDescriptor, StreamInfo};

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let mut config = StreamsenseConfig::default();
        config.discovery.port_range = 0;
        assert!(matches!(ClientLoop::new(config), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_out_of_range_durations_rejected_up_front() {
        let setters: [fn(&mut StreamsenseConfig); 3] = [
            |c| c.discovery.timeout = 1e19,
            |c| c.pull.sample_timeout = 1e300,
            |c| c.inlet.close_grace = f64::INFINITY,
        ];
        for setter in setters {
            let mut config = StreamsenseConfig::default();
            setter(&mut config);
            let result = ClientLoop::new(config).map(|_| ());
            assert!(matches!(result, Err(ClientError::Config(_))));
            assert_eq!(ExitCode::from_result(&result), ExitCode::ConfigError);
        }
    }

    #[test]
    fn test_one_day_timeouts_accepted() {
        let mut config = StreamsenseConfig::default();
        config.discovery.timeout = 86_400.0;
        config.pull.sample_timeout = 86_400.0;
        let client = ClientLoop::new(config).unwrap();
        assert_eq!(client.discovery_timeout, Duration::from_secs(86_400));
        assert_eq!(client.sample_timeout, Duration::from_secs(86_400));
    }

    #[test]
    fn test_bad_query_rejected_up_front() {
        let mut config = StreamsenseConfig::default();
        config.client.query = Some("colour='red'".into());
        assert!(matches!(ClientLoop::new(config), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_blank_query_means_any_stream() {
        let mut config = StreamsenseConfig::default();
        config.client.query = Some("  ".into());
        assert!(ClientLoop::new(config).unwrap().query.is_none());
    }

    #[test]
    fn test_config_sections_carried_into_inlet() {
        let mut config = StreamsenseConfig::default();
        config.inlet.max_buffered = 7;
        config.inlet.open_retries = 0;
        config.discovery.peers = vec!["10.0.0.255".into()];
        let client = ClientLoop::new(config).unwrap();

        assert_eq!(client.inlet_config().max_buffered, 7);
        assert_eq!(client.inlet_config().open_retries, 0);
        assert_eq!(client.registry_config().peers, vec!["10.0.0.255".to_string()]);
    }

    #[test]
    fn test_guard_closes_session_on_drop() {
        let descriptor = StreamDescriptor::new(
            "uid-guard",
            StreamInfo::new("Guarded", "EEG", 2, 0.0, ChannelFormat::Float32, ""),
            "localhost",
            "127.0.0.1",
            1,
        );
        let session = InletSession::new(descriptor, InletConfig::default()).unwrap();
        {
            let _guard = SessionGuard::new(&session);
        }
        assert_eq!(session.state(), streamsense_inlet::SessionState::Closed);
    }
}

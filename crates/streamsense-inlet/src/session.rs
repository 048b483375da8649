// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Inlet session: one pull connection to one stream
//!
//! ```text
//! Unopened --open()--> Open --close()--> Closed
//!     \______________close()_____________/
//! ```
//!
//! A failed `open()` leaves the session `Unopened`. A session is opened at
//! most once. While open, a delivery thread reads frames from the data
//! channel into a bounded queue of `max_buffered` samples; when the queue is
//! full the oldest sample is dropped.

use crate::config::InletConfig;
use crate::error::{InletError, Result};
use crate::reader::SampleReader;
use crate::reconnect::{retry_with_backoff, ReconnectionStrategy};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::fmt;
use std::io::BufReader;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use streamsense_transports::data::{connect_data_channel, DataFrame, FrameCodec};
use streamsense_transports::TransportError;
use streamsense_types::{local_clock, Sample, StreamDescriptor};
use tracing::{debug, info, warn};

/// Lifecycle state of an [`InletSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Open,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unopened => "unopened",
            SessionState::Open => "open",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Delivery counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InletStats {
    /// Samples read from the data channel
    pub received: u64,
    /// Samples discarded because the buffer was full
    pub dropped: u64,
}

#[derive(Default)]
struct DeliveryShared {
    received: AtomicU64,
    dropped: AtomicU64,
    ended: AtomicBool,
    closing: AtomicBool,
}

/// Receiving ends handed to pulls
#[derive(Clone)]
pub(crate) struct PullChannels {
    pub(crate) samples: Receiver<Sample>,
    /// Disconnects when the session closes
    pub(crate) shutdown: Receiver<()>,
}

struct Delivery {
    socket: TcpStream,
    shutdown: Sender<()>,
    /// Disconnects when the delivery thread exits
    finished: Receiver<()>,
    thread: JoinHandle<()>,
}

/// Pull connection to a single stream
///
/// All methods take `&self`; `close()` may be called from another thread
/// to interrupt a blocked pull.
pub struct InletSession {
    descriptor: StreamDescriptor,
    config: InletConfig,
    state: Mutex<SessionState>,
    channels: Mutex<Option<PullChannels>>,
    delivery: Mutex<Option<Delivery>>,
    shared: Arc<DeliveryShared>,
}

impl InletSession {
    /// Create an unopened session bound to `descriptor`
    pub fn new(descriptor: StreamDescriptor, config: InletConfig) -> Result<Self> {
        config.validate()?;
        descriptor.validate()?;
        Ok(Self {
            descriptor,
            config,
            state: Mutex::new(SessionState::Unopened),
            channels: Mutex::new(None),
            delivery: Mutex::new(None),
            shared: Arc::new(DeliveryShared::default()),
        })
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    pub fn channel_count(&self) -> usize {
        self.descriptor.channel_count()
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Whether the outlet ended the stream or the connection dropped
    pub fn is_stream_ended(&self) -> bool {
        self.shared.ended.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> InletStats {
        InletStats {
            received: self.shared.received.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
        }
    }

    /// Reader borrowing this session
    pub fn reader(&self) -> SampleReader<'_> {
        SampleReader::new(self)
    }

    /// Connect to the stream's data endpoint.
    ///
    /// # Errors
    /// - `InvalidState` unless the session is `Unopened`
    /// - `StaleDescriptor` if the endpoint no longer serves this stream
    /// - `Connection` if the endpoint is unreachable
    pub fn open(&self) -> Result<()> {
        self.require_state(SessionState::Unopened, "open")?;

        let uid = self.descriptor.uid();
        let address = self.descriptor.data_address();
        debug!("[INLET] Opening '{}' ({}) at {}", self.descriptor.name(), uid, address);

        let (socket, codec) = connect_data_channel(&address, uid, self.config.connect_timeout)
            .map_err(|e| self.connection_error(e))?;

        if codec.channel_count() != self.descriptor.channel_count() {
            let _ = socket.shutdown(Shutdown::Both);
            return Err(InletError::StaleDescriptor {
                uid: uid.to_string(),
                address,
            });
        }

        let mut state = self.state.lock();
        if *state != SessionState::Unopened {
            // Closed by another thread while connecting.
            let _ = socket.shutdown(Shutdown::Both);
            return Err(InletError::InvalidState {
                operation: "open",
                state: *state,
            });
        }

        let (channels, delivery) = self.start_delivery(socket, codec)?;
        *self.channels.lock() = Some(channels);
        *self.delivery.lock() = Some(delivery);
        *state = SessionState::Open;

        info!(
            "[INLET] Opened '{}' ({} x {} @ {} Hz) at {}",
            self.descriptor.name(),
            self.descriptor.channel_count(),
            self.descriptor.channel_format(),
            self.descriptor.nominal_srate(),
            address
        );
        Ok(())
    }

    /// `open()` retried with exponential backoff while failures are transient
    pub fn open_with_retry(&self) -> Result<()> {
        let mut strategy = ReconnectionStrategy::new(
            self.config.retry_backoff.as_millis() as u64,
            self.config.open_retries,
        );
        retry_with_backoff(|| self.open(), &mut strategy, "Inlet open")
    }

    /// Release the connection. Idempotent.
    ///
    /// Pulls blocked in another thread return `InvalidState` right away; the
    /// delivery thread is given `close_grace` to finish.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if *state == SessionState::Closed {
                return;
            }
            *state = SessionState::Closed;
        }

        self.shared.closing.store(true, Ordering::Release);
        self.channels.lock().take();

        let Some(delivery) = self.delivery.lock().take() else {
            debug!("[INLET] Closed unopened session for '{}'", self.descriptor.name());
            return;
        };

        drop(delivery.shutdown);
        let _ = delivery.socket.shutdown(Shutdown::Both);

        match delivery.finished.recv_timeout(self.config.close_grace) {
            Err(RecvTimeoutError::Timeout) => warn!(
                "[INLET] Delivery thread for '{}' still running after {:?}; detaching",
                self.descriptor.name(),
                self.config.close_grace
            ),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if delivery.thread.join().is_err() {
                    warn!("[INLET] Delivery thread for '{}' panicked", self.descriptor.name());
                }
            }
        }

        let stats = self.stats();
        info!(
            "[INLET] Closed '{}': {} received, {} dropped",
            self.descriptor.name(),
            stats.received,
            stats.dropped
        );
    }

    /// Receivers for a pull, or `InvalidState` when not open
    pub(crate) fn pull_channels(&self, operation: &'static str) -> Result<PullChannels> {
        let state = self.state.lock();
        if *state != SessionState::Open {
            return Err(InletError::InvalidState {
                operation,
                state: *state,
            });
        }
        self.channels
            .lock()
            .clone()
            .ok_or(InletError::InvalidState {
                operation,
                state: *state,
            })
    }

    fn require_state(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        let state = *self.state.lock();
        if state != expected {
            return Err(InletError::InvalidState { operation, state });
        }
        Ok(())
    }

    fn connection_error(&self, error: TransportError) -> InletError {
        match error {
            TransportError::UnknownStream(_) => InletError::StaleDescriptor {
                uid: self.descriptor.uid().to_string(),
                address: self.descriptor.data_address(),
            },
            other => InletError::Connection {
                uid: self.descriptor.uid().to_string(),
                source: other,
            },
        }
    }

    fn start_delivery(&self, socket: TcpStream, codec: FrameCodec) -> Result<(PullChannels, Delivery)> {
        let (sample_tx, sample_rx) = channel::bounded(self.config.max_buffered);
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);
        let (finished_tx, finished_rx) = channel::bounded::<()>(0);

        let reader_socket = socket.try_clone().map_err(|e| self.connection_error(e.into()))?;
        let worker = DeliveryWorker {
            codec,
            sender: sample_tx,
            overflow: sample_rx.clone(),
            shared: Arc::clone(&self.shared),
            name: self.descriptor.name().to_string(),
            _finished: finished_tx,
        };

        let thread = thread::Builder::new()
            .name(format!("inlet-{}", self.descriptor.name()))
            .spawn(move || worker.run(reader_socket))
            .map_err(|e| InletError::ThreadError(e.to_string()))?;

        Ok((
            PullChannels {
                samples: sample_rx,
                shutdown: shutdown_rx,
            },
            Delivery {
                socket,
                shutdown: shutdown_tx,
                finished: finished_rx,
                thread,
            },
        ))
    }
}

impl Drop for InletSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for InletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InletSession")
            .field("uid", &self.descriptor.uid())
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Background reader feeding one session's queue
struct DeliveryWorker {
    codec: FrameCodec,
    sender: Sender<Sample>,
    /// Used to evict the oldest sample when the queue is full
    overflow: Receiver<Sample>,
    shared: Arc<DeliveryShared>,
    name: String,
    /// Dropped with the worker, even on panic
    _finished: Sender<()>,
}

impl DeliveryWorker {
    fn run(self, socket: TcpStream) {
        let mut reader = BufReader::new(socket);
        let mut last_timestamp = f64::NEG_INFINITY;

        loop {
            match self.codec.read_frame(&mut reader) {
                Ok(DataFrame::Sample { timestamp, values }) => {
                    let timestamp = clamp_timestamp(timestamp, last_timestamp);
                    last_timestamp = timestamp;
                    self.shared.received.fetch_add(1, Ordering::Relaxed);
                    self.enqueue(Sample::new(values, timestamp));
                }
                Ok(DataFrame::EndOfStream) => {
                    info!("[INLET] '{}' ended by outlet", self.name);
                    break;
                }
                Err(e) => {
                    if !self.shared.closing.load(Ordering::Acquire) {
                        warn!("[INLET] Lost connection to '{}': {}", self.name, e);
                    }
                    break;
                }
            }
        }

        if !self.shared.closing.load(Ordering::Acquire) {
            self.shared.ended.store(true, Ordering::Release);
        }
        debug!("[INLET] Delivery for '{}' stopped", self.name);
    }

    fn enqueue(&self, mut sample: Sample) {
        loop {
            match self.sender.try_send(sample) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if self.overflow.try_recv().is_ok() {
                        self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    sample = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// Timestamps never go backwards within a session. A NaN stamp is replaced
/// by the local clock before clamping.
fn clamp_timestamp(timestamp: f64, previous: f64) -> f64 {
    let timestamp = if timestamp.is_nan() { local_clock() } else { timestamp };
    if timestamp < previous {
        previous
    } else {
        timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamsense_types::{ChannelFormat, StreamInfo};

    fn descriptor(port: u16) -> StreamDescriptor {
        StreamDescriptor::new(
            "uid-1",
            StreamInfo::new("Test", "EEG", 2, 100.0, ChannelFormat::Float32, ""),
            "localhost",
            "127.0.0.1",
            port,
        )
    }

    #[test]
    fn test_clamp_timestamp() {
        assert_eq!(clamp_timestamp(2.0, 1.0), 2.0);
        assert_eq!(clamp_timestamp(0.5, 1.0), 1.0);
        assert_eq!(clamp_timestamp(1.0, f64::NEG_INFINITY), 1.0);
        assert!(clamp_timestamp(f64::NAN, 1e12) >= 1e12);
    }

    #[test]
    fn test_new_session_is_unopened() {
        let session = InletSession::new(descriptor(1), InletConfig::default()).unwrap();
        assert_eq!(session.state(), SessionState::Unopened);
        assert_eq!(session.channel_count(), 2);
        assert_eq!(session.stats(), InletStats::default());
        assert!(!session.is_stream_ended());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = InletConfig::default().with_max_buffered(0);
        assert!(InletSession::new(descriptor(1), config).is_err());
    }

    #[test]
    fn test_close_unopened_then_open_fails() {
        let session = InletSession::new(descriptor(1), InletConfig::default()).unwrap();
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(
            session.open(),
            Err(InletError::InvalidState {
                operation: "open",
                state: SessionState::Closed
            })
        ));
    }

    #[test]
    fn test_enqueue_drops_oldest_when_full() {
        let (tx, rx) = channel::bounded(2);
        let worker = DeliveryWorker {
            codec: FrameCodec::new(1, ChannelFormat::Float32),
            sender: tx,
            overflow: rx.clone(),
            shared: Arc::new(DeliveryShared::default()),
            name: "t".to_string(),
            _finished: channel::bounded(0).0,
        };
        for i in 0..5 {
            worker.enqueue(Sample::new(vec![i as f64], i as f64));
        }
        assert_eq!(worker.shared.dropped.load(Ordering::Relaxed), 3);
        let kept: Vec<f64> = rx.try_iter().map(|s| s.timestamp).collect();
        assert_eq!(kept, vec![3.0, 4.0]);
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Stream outlet: advertises one stream and fans samples out to inlets
//!
//! Threads:
//! - discovery responder (UDP)
//! - acceptor: accepts data connections and runs the handshake
//! - one writer per consumer, fed by a bounded queue; a slow consumer loses
//!   its oldest samples and never blocks the producer

use crate::config::OutletConfig;
use crate::error::{OutletError, Result};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::io::{BufWriter, ErrorKind, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use streamsense_transports::data::{accept_data_channel, DataFrame, FrameCodec};
use streamsense_transports::discovery::DiscoveryResponder;
use streamsense_transports::Transport;
use streamsense_types::{local_clock, StreamDescriptor, StreamInfo};
use tracing::{debug, info, warn};

const ACCEPT_POLL: Duration = Duration::from_millis(20);

/// Advertised stream serving any number of inlets
pub struct StreamOutlet {
    descriptor: StreamDescriptor,
    consumers: Arc<Mutex<Vec<Consumer>>>,
    responder: Mutex<Option<DiscoveryResponder>>,
    acceptor: Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
    closed: AtomicBool,
    pushed: AtomicU64,
}

impl StreamOutlet {
    /// Create the outlet and start advertising it
    pub fn new(info: StreamInfo, config: OutletConfig) -> Result<Self> {
        config.validate()?;
        info.validate()?;

        let listener = TcpListener::bind((config.bind_address.as_str(), 0))
            .map_err(|e| OutletError::Transport(e.into()))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| OutletError::Transport(e.into()))?;
        let data_port = listener
            .local_addr()
            .map_err(|e| OutletError::Transport(e.into()))?
            .port();

        let descriptor = StreamDescriptor::new(
            uuid::Uuid::new_v4().to_string(),
            info,
            config.hostname.clone(),
            config.bind_address.clone(),
            data_port,
        );

        let mut responder =
            DiscoveryResponder::bind(descriptor.clone(), config.port_base, config.port_range)?;
        responder.start()?;

        let consumers = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));

        let acceptor = Acceptor {
            listener,
            descriptor: descriptor.clone(),
            consumers: Arc::clone(&consumers),
            running: Arc::clone(&running),
            max_buffered: config.max_buffered,
            io_timeout: config.io_timeout,
        };
        let acceptor = thread::Builder::new()
            .name(format!("outlet-accept-{}", data_port))
            .spawn(move || acceptor.run())
            .map_err(|e| OutletError::ThreadError(e.to_string()))?;

        info!(
            "[OUTLET] '{}' ({}) serving on port {}, discovery port {}",
            descriptor.name(),
            descriptor.uid(),
            data_port,
            responder.port()
        );

        Ok(Self {
            descriptor,
            consumers,
            responder: Mutex::new(Some(responder)),
            acceptor: Mutex::new(Some(acceptor)),
            running,
            closed: AtomicBool::new(false),
            pushed: AtomicU64::new(0),
        })
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    pub fn channel_count(&self) -> usize {
        self.descriptor.channel_count()
    }

    /// Number of connected inlets
    pub fn consumer_count(&self) -> usize {
        let mut consumers = self.consumers.lock();
        consumers.retain(|c| c.is_alive());
        consumers.len()
    }

    pub fn have_consumers(&self) -> bool {
        self.consumer_count() > 0
    }

    /// Samples accepted by `push_*` so far
    pub fn pushed_count(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Push one sample stamped with `local_clock()`
    pub fn push_sample(&self, values: &[f64]) -> Result<()> {
        self.push_sample_at(values, local_clock())
    }

    /// Push one sample with an explicit timestamp
    pub fn push_sample_at(&self, values: &[f64], timestamp: f64) -> Result<()> {
        self.check_push(values)?;
        self.broadcast(DataFrame::Sample {
            timestamp,
            values: values.to_vec(),
        });
        self.pushed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Push several samples. The last is stamped now; for regular streams
    /// earlier ones are back-dated by one sample period each.
    ///
    /// Nothing is pushed if any row has the wrong length.
    pub fn push_chunk(&self, rows: &[Vec<f64>]) -> Result<()> {
        for row in rows {
            self.check_push(row)?;
        }
        if rows.is_empty() {
            return Ok(());
        }

        let now = local_clock();
        let period = if self.descriptor.is_irregular() {
            0.0
        } else {
            1.0 / self.descriptor.nominal_srate()
        };
        let last = rows.len() - 1;
        for (i, row) in rows.iter().enumerate() {
            self.broadcast(DataFrame::Sample {
                timestamp: now - period * (last - i) as f64,
                values: row.clone(),
            });
        }
        self.pushed.fetch_add(rows.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Stop advertising, end the stream for every consumer and join threads.
    /// Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(mut responder) = self.responder.lock().take() {
            let _ = responder.stop();
        }

        self.running.store(false, Ordering::Release);
        if let Some(acceptor) = self.acceptor.lock().take() {
            if acceptor.join().is_err() {
                warn!("[OUTLET] Acceptor thread for '{}' panicked", self.descriptor.name());
            }
        }

        let consumers: Vec<Consumer> = self.consumers.lock().drain(..).collect();
        let count = consumers.len();
        for consumer in consumers {
            consumer.finish();
        }

        info!(
            "[OUTLET] Closed '{}' after {} samples ({} consumers at close)",
            self.descriptor.name(),
            self.pushed_count(),
            count
        );
    }

    fn check_push(&self, values: &[f64]) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(OutletError::Closed);
        }
        if values.len() != self.descriptor.channel_count() {
            return Err(OutletError::ChannelMismatch {
                expected: self.descriptor.channel_count(),
                actual: values.len(),
            });
        }
        Ok(())
    }

    fn broadcast(&self, frame: DataFrame) {
        let mut consumers = self.consumers.lock();
        consumers.retain(|c| c.is_alive());
        for consumer in consumers.iter() {
            consumer.enqueue(frame.clone());
        }
    }
}

impl Drop for StreamOutlet {
    fn drop(&mut self) {
        self.close();
    }
}

struct Acceptor {
    listener: TcpListener,
    descriptor: StreamDescriptor,
    consumers: Arc<Mutex<Vec<Consumer>>>,
    running: Arc<AtomicBool>,
    max_buffered: usize,
    io_timeout: Duration,
}

impl Acceptor {
    fn run(self) {
        let mut next_id = 0u64;
        while self.running.load(Ordering::Acquire) {
            let (mut stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                    continue;
                }
                Err(e) => {
                    warn!("[OUTLET] Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL);
                    continue;
                }
            };

            if let Err(e) = stream.set_nonblocking(false) {
                warn!("[OUTLET] Cannot configure connection from {}: {}", peer, e);
                continue;
            }

            let codec = match accept_data_channel(&mut stream, &self.descriptor, self.io_timeout) {
                Ok(Some(codec)) => codec,
                Ok(None) => continue,
                Err(e) => {
                    debug!("[OUTLET] Handshake with {} failed: {}", peer, e);
                    continue;
                }
            };

            if let Err(e) = stream.set_write_timeout(Some(self.io_timeout)) {
                warn!("[OUTLET] Cannot configure connection from {}: {}", peer, e);
                continue;
            }

            next_id += 1;
            match Consumer::start(next_id, stream, codec, self.max_buffered) {
                Ok(consumer) => {
                    info!("[OUTLET] Inlet {} connected to '{}'", peer, self.descriptor.name());
                    self.consumers.lock().push(consumer);
                }
                Err(e) => warn!("[OUTLET] Cannot serve {}: {}", peer, e),
            }
        }
    }
}

/// One connected inlet
struct Consumer {
    id: u64,
    queue: Sender<DataFrame>,
    overflow: Receiver<DataFrame>,
    alive: Arc<AtomicBool>,
    socket: TcpStream,
    thread: JoinHandle<()>,
}

impl Consumer {
    fn start(id: u64, socket: TcpStream, codec: FrameCodec, max_buffered: usize) -> Result<Self> {
        let (queue, frames) = channel::bounded(max_buffered);
        let overflow = frames.clone();
        let alive = Arc::new(AtomicBool::new(true));
        let writer_socket = socket
            .try_clone()
            .map_err(|e| OutletError::Transport(e.into()))?;

        let thread = {
            let alive = Arc::clone(&alive);
            thread::Builder::new()
                .name(format!("outlet-consumer-{}", id))
                .spawn(move || write_frames(id, writer_socket, codec, frames, alive))
                .map_err(|e| OutletError::ThreadError(e.to_string()))?
        };

        Ok(Self {
            id,
            overflow,
            queue,
            alive,
            socket,
            thread,
        })
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn enqueue(&self, mut frame: DataFrame) {
        loop {
            match self.queue.try_send(frame) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    // Oldest first; the writer may race us to it.
                    let _ = self.overflow.try_recv();
                    frame = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Send end-of-stream and wait for the writer to drain
    fn finish(self) {
        self.enqueue(DataFrame::EndOfStream);
        drop(self.queue);
        if self.thread.join().is_err() {
            warn!("[OUTLET] Writer for consumer {} panicked", self.id);
        }
        let _ = self.socket.shutdown(Shutdown::Both);
    }
}

fn write_frames(
    id: u64,
    socket: TcpStream,
    codec: FrameCodec,
    frames: Receiver<DataFrame>,
    alive: Arc<AtomicBool>,
) {
    let mut writer = BufWriter::new(socket);
    for frame in frames.iter() {
        let end = frame == DataFrame::EndOfStream;
        let written = codec.write_frame(&mut writer, &frame).is_ok()
            && (!frames.is_empty() || writer.flush().is_ok());
        if !written {
            debug!("[OUTLET] Consumer {} disconnected", id);
            break;
        }
        if end {
            let _ = writer.flush();
            break;
        }
    }
    alive.store(false, Ordering::Release);
}

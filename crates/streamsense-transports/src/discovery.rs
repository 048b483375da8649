//! UDP stream discovery
//!
//! Inlets broadcast a [`DiscoveryQuery`] to every port of the discovery range
//! on each peer address. Outlets listen on the first free port of that range
//! and answer matching queries with a unicast [`DiscoveryResponse`].

use crate::common::{TransportError, TransportResult};
use crate::traits::Transport;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use streamsense_types::{deadline_after, StreamDescriptor, StreamQuery};
use tracing::{debug, info, warn};

/// Version carried in every discovery datagram
pub const DISCOVERY_PROTOCOL_VERSION: u16 = 1;

/// Upper bound for one discovery datagram
pub const MAX_DATAGRAM_SIZE: usize = 8192;

/// Poll interval of the responder thread; bounds how long `stop()` waits
const RESPONDER_POLL: Duration = Duration::from_millis(100);

/// Query datagram sent by inlets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryQuery {
    pub version: u16,
    /// Echoed by responders so late answers to an earlier round can be told apart
    pub query_id: u64,
    /// Predicate in [`StreamQuery`] syntax; empty matches everything
    pub query: String,
}

impl DiscoveryQuery {
    pub fn new(query_id: u64, query: impl Into<String>) -> Self {
        Self {
            version: DISCOVERY_PROTOCOL_VERSION,
            query_id,
            query: query.into(),
        }
    }
}

/// Answer datagram sent by outlets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    pub version: u16,
    pub query_id: u64,
    pub descriptor: StreamDescriptor,
}

impl DiscoveryResponse {
    pub fn new(query_id: u64, descriptor: StreamDescriptor) -> Self {
        Self {
            version: DISCOVERY_PROTOCOL_VERSION,
            query_id,
            descriptor,
        }
    }
}

/// Serialize a discovery message, enforcing the datagram limit
pub fn encode_message<T: Serialize>(message: &T) -> TransportResult<Vec<u8>> {
    let bytes = serde_json::to_vec(message)?;
    if bytes.len() > MAX_DATAGRAM_SIZE {
        return Err(TransportError::MessageTooLarge {
            size: bytes.len(),
            max_size: MAX_DATAGRAM_SIZE,
        });
    }
    Ok(bytes)
}

fn decode_message<T: DeserializeOwned>(bytes: &[u8], version_of: impl Fn(&T) -> u16) -> TransportResult<T> {
    let message: T = serde_json::from_slice(bytes)?;
    let remote = version_of(&message);
    if remote != DISCOVERY_PROTOCOL_VERSION {
        return Err(TransportError::VersionMismatch {
            local: DISCOVERY_PROTOCOL_VERSION,
            remote,
        });
    }
    Ok(message)
}

pub fn decode_query(bytes: &[u8]) -> TransportResult<DiscoveryQuery> {
    decode_message(bytes, |q: &DiscoveryQuery| q.version)
}

pub fn decode_response(bytes: &[u8]) -> TransportResult<DiscoveryResponse> {
    decode_message(bytes, |r: &DiscoveryResponse| r.version)
}

/// Check that `[port_base, port_base + port_range)` fits in the u16 port space
pub fn validate_port_range(port_base: u16, port_range: u16) -> TransportResult<()> {
    if port_base == 0 {
        return Err(TransportError::InvalidConfig(
            "discovery port_base cannot be 0".to_string(),
        ));
    }
    if port_range == 0 {
        return Err(TransportError::InvalidConfig(
            "discovery port_range must be at least 1".to_string(),
        ));
    }
    if u32::from(port_base) + u32::from(port_range) - 1 > u32::from(u16::MAX) {
        return Err(TransportError::InvalidConfig(format!(
            "discovery ports {}..{} exceed 65535",
            port_base,
            u32::from(port_base) + u32::from(port_range)
        )));
    }
    Ok(())
}

fn resolve_peer(peer: &str) -> TransportResult<IpAddr> {
    if let Ok(ip) = peer.parse::<IpAddr>() {
        return Ok(ip);
    }
    let mut addrs = (peer, 0)
        .to_socket_addrs()
        .map_err(|e| TransportError::InvalidConfig(format!("cannot resolve peer '{}': {}", peer, e)))?;
    addrs
        .find(|a| a.is_ipv4())
        .map(|a| a.ip())
        .ok_or_else(|| TransportError::InvalidConfig(format!("peer '{}' has no IPv4 address", peer)))
}

/// Every (peer, port) pair a query is sent to
pub fn discovery_targets(
    peers: &[String],
    port_base: u16,
    port_range: u16,
) -> TransportResult<Vec<SocketAddr>> {
    validate_port_range(port_base, port_range)?;
    if peers.is_empty() {
        return Err(TransportError::InvalidConfig(
            "at least one discovery peer is required".to_string(),
        ));
    }

    let mut targets = Vec::with_capacity(peers.len() * port_range as usize);
    for peer in peers {
        let ip = resolve_peer(peer)?;
        for offset in 0..port_range {
            targets.push(SocketAddr::new(ip, port_base + offset));
        }
    }
    Ok(targets)
}

/// Inlet-side socket: sends queries and receives responses
pub struct QuerySocket {
    socket: UdpSocket,
    targets: Vec<SocketAddr>,
}

impl QuerySocket {
    /// Bind an ephemeral UDP socket able to reach `peers` on the discovery range
    pub fn bind(peers: &[String], port_base: u16, port_range: u16) -> TransportResult<Self> {
        let targets = discovery_targets(peers, port_base, port_range)?;
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| TransportError::BindFailed(format!("discovery query socket: {}", e)))?;
        socket.set_broadcast(true)?;

        debug!(
            "[DISCOVERY] Query socket bound to {:?}, {} targets",
            socket.local_addr().ok(),
            targets.len()
        );
        Ok(Self { socket, targets })
    }

    pub fn targets(&self) -> &[SocketAddr] {
        &self.targets
    }

    /// Send `query` to every target. Individual unreachable targets are
    /// skipped; fails only if no datagram could be sent at all.
    pub fn send_query(&self, query: &DiscoveryQuery) -> TransportResult<usize> {
        let bytes = encode_message(query)?;
        let mut sent = 0;
        let mut last_error = None;

        for target in &self.targets {
            match self.socket.send_to(&bytes, target) {
                Ok(_) => sent += 1,
                Err(e) => {
                    debug!("[DISCOVERY] Query to {} not sent: {}", target, e);
                    last_error = Some(e);
                }
            }
        }

        match (sent, last_error) {
            (0, Some(e)) => Err(TransportError::SendFailed(format!(
                "query reached no discovery target: {}",
                e
            ))),
            _ => Ok(sent),
        }
    }

    /// Wait up to `timeout` for the next well-formed response.
    ///
    /// Returns `Ok(None)` when the window closes without one. Malformed or
    /// foreign datagrams are skipped.
    pub fn recv_response(
        &self,
        timeout: Duration,
    ) -> TransportResult<Option<(DiscoveryResponse, SocketAddr)>> {
        let deadline = deadline_after(timeout);
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            // A zero read timeout is rejected by the OS; poll for at least 1ms.
            self.socket
                .set_read_timeout(Some(remaining.max(Duration::from_millis(1))))?;

            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) => match decode_response(&buf[..len]) {
                    Ok(response) => return Ok(Some((response, from))),
                    Err(e) => debug!("[DISCOVERY] Ignoring datagram from {}: {}", from, e),
                },
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(None);
                }
                Err(e) => return Err(TransportError::ReceiveFailed(e.to_string())),
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }
}

/// Outlet-side responder answering discovery queries for one stream
pub struct DiscoveryResponder {
    descriptor: Arc<StreamDescriptor>,
    socket: Arc<UdpSocket>,
    port: u16,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl DiscoveryResponder {
    /// Bind the first free port of the discovery range
    pub fn bind(descriptor: StreamDescriptor, port_base: u16, port_range: u16) -> TransportResult<Self> {
        validate_port_range(port_base, port_range)?;

        let mut last_error = None;
        for offset in 0..port_range {
            let port = port_base + offset;
            match UdpSocket::bind(("0.0.0.0", port)) {
                Ok(socket) => {
                    socket.set_read_timeout(Some(RESPONDER_POLL))?;
                    debug!("[DISCOVERY] Responder for '{}' bound to port {}", descriptor.name(), port);
                    return Ok(Self {
                        descriptor: Arc::new(descriptor),
                        socket: Arc::new(socket),
                        port,
                        running: Arc::new(AtomicBool::new(false)),
                        thread: None,
                    });
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(TransportError::BindFailed(format!(
            "no free discovery port in {}..{}: {}",
            port_base,
            u32::from(port_base) + u32::from(port_range),
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    fn answer(socket: &UdpSocket, descriptor: &StreamDescriptor, bytes: &[u8], from: SocketAddr) {
        let query = match decode_query(bytes) {
            Ok(query) => query,
            Err(e) => {
                debug!("[DISCOVERY] Ignoring datagram from {}: {}", from, e);
                return;
            }
        };

        let predicate = match StreamQuery::parse(&query.query) {
            Ok(predicate) => predicate,
            Err(e) => {
                debug!("[DISCOVERY] Ignoring query from {}: {}", from, e);
                return;
            }
        };
        if !predicate.matches(descriptor) {
            return;
        }

        let response = DiscoveryResponse::new(query.query_id, descriptor.clone());
        match encode_message(&response) {
            Ok(payload) => {
                if let Err(e) = socket.send_to(&payload, from) {
                    warn!("[DISCOVERY] Failed to answer {}: {}", from, e);
                }
            }
            Err(e) => warn!("[DISCOVERY] Cannot encode response: {}", e),
        }
    }
}

impl Transport for DiscoveryResponder {
    fn start(&mut self) -> TransportResult<()> {
        if self.running.load(Ordering::Acquire) {
            return Err(TransportError::AlreadyRunning);
        }
        self.running.store(true, Ordering::Release);

        let socket = Arc::clone(&self.socket);
        let descriptor = Arc::clone(&self.descriptor);
        let running = Arc::clone(&self.running);
        let port = self.port;

        let thread = thread::Builder::new()
            .name(format!("discovery-{}", port))
            .spawn(move || {
                let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
                while running.load(Ordering::Acquire) {
                    match socket.recv_from(&mut buf) {
                        Ok((len, from)) => Self::answer(&socket, &descriptor, &buf[..len], from),
                        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                        Err(e) => {
                            warn!("[DISCOVERY] Responder receive error: {}", e);
                            thread::sleep(RESPONDER_POLL);
                        }
                    }
                }
                debug!("[DISCOVERY] Responder on port {} stopped", port);
            })?;

        self.thread = Some(thread);
        info!(
            "[DISCOVERY] Advertising '{}' ({}) on UDP port {}",
            self.descriptor.name(),
            self.descriptor.uid(),
            self.port
        );
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("[DISCOVERY] Responder thread on port {} panicked", self.port);
            }
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn transport_type(&self) -> &str {
        "udp-discovery"
    }
}

impl Drop for DiscoveryResponder {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

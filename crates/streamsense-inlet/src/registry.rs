// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Stream discovery
//!
//! One call to [`StreamRegistry::discover`] opens a query socket, repeats the
//! query every `query_interval` and collects responses until the window
//! closes. Results are deduplicated by uid in first-seen order, with the
//! latest metadata for each uid.

use crate::config::RegistryConfig;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use streamsense_transports::discovery::{DiscoveryQuery, QuerySocket};
use streamsense_types::{deadline_from, StreamDescriptor, StreamQuery};
use tracing::{debug, info, warn};

/// Discovers streams advertised on the local network
pub struct StreamRegistry {
    config: RegistryConfig,
    next_query_id: AtomicU64,
}

impl StreamRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        // Query ids only need to differ between concurrent inlets on one host.
        let seed = u64::from(std::process::id()) << 32;
        Ok(Self {
            config,
            next_query_id: AtomicU64::new(seed),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// All streams seen within `timeout`.
    ///
    /// An empty result is not an error.
    pub fn discover(&self, timeout: Duration) -> Result<Vec<StreamDescriptor>> {
        self.discover_with(&StreamQuery::any(), usize::MAX, timeout)
    }

    /// Streams matching `query`, returning early once `minimum` are known.
    pub fn discover_matching(
        &self,
        query: &str,
        minimum: usize,
        timeout: Duration,
    ) -> Result<Vec<StreamDescriptor>> {
        let predicate = StreamQuery::parse(query)?;
        self.discover_with(&predicate, minimum.max(1), timeout)
    }

    fn discover_with(
        &self,
        predicate: &StreamQuery,
        minimum: usize,
        timeout: Duration,
    ) -> Result<Vec<StreamDescriptor>> {
        let socket = QuerySocket::bind(
            &self.config.peers,
            self.config.port_base,
            self.config.port_range,
        )?;
        let query_id = self.next_query_id.fetch_add(1, Ordering::Relaxed);
        let query = DiscoveryQuery::new(query_id, predicate.to_string());

        debug!(
            "[REGISTRY] Discovering '{}' for {:?} (query {})",
            query.query, timeout, query_id
        );

        let mut found = DiscoveredSet::default();
        let start = Instant::now();
        let deadline = deadline_from(start, timeout);
        let mut next_send = start;

        loop {
            let now = Instant::now();
            if now >= next_send {
                if let Err(e) = socket.send_query(&query) {
                    warn!("[REGISTRY] Discovery query not sent: {}", e);
                }
                next_send = deadline_from(now, self.config.query_interval);
            }

            if found.len() >= minimum || now >= deadline {
                break;
            }

            let wait = deadline.min(next_send).saturating_duration_since(now);
            if let Some((response, from)) = socket.recv_response(wait)? {
                if response.query_id != query_id {
                    continue;
                }
                let descriptor = response.descriptor.with_data_host(from.ip().to_string());
                if let Err(e) = descriptor.validate() {
                    debug!("[REGISTRY] Ignoring advertisement from {}: {}", from, e);
                    continue;
                }
                if !predicate.matches(&descriptor) {
                    continue;
                }
                found.insert(descriptor);
            }
        }

        let streams = found.into_vec();
        info!(
            "[REGISTRY] Discovered {} stream(s) in {:?}",
            streams.len(),
            start.elapsed()
        );
        Ok(streams)
    }
}

/// Descriptors keyed by uid, kept in first-seen order
#[derive(Default)]
struct DiscoveredSet {
    order: Vec<StreamDescriptor>,
    index: HashMap<String, usize>,
}

impl DiscoveredSet {
    fn insert(&mut self, descriptor: StreamDescriptor) {
        match self.index.get(descriptor.uid()) {
            Some(&position) => self.order[position] = descriptor,
            None => {
                debug!(
                    "[REGISTRY] Found '{}' ({}) at {}",
                    descriptor.name(),
                    descriptor.uid(),
                    descriptor.data_address()
                );
                self.index
                    .insert(descriptor.uid().to_string(), self.order.len());
                self.order.push(descriptor);
            }
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn into_vec(self) -> Vec<StreamDescriptor> {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamsense_types::{ChannelFormat, StreamInfo};

    fn descriptor(uid: &str, name: &str) -> StreamDescriptor {
        StreamDescriptor::new(
            uid,
            StreamInfo::new(name, "EEG", 4, 256.0, ChannelFormat::Float32, ""),
            "host",
            "127.0.0.1",
            5000,
        )
    }

    #[test]
    fn test_dedup_keeps_first_order_and_last_metadata() {
        let mut set = DiscoveredSet::default();
        set.insert(descriptor("a", "first"));
        set.insert(descriptor("b", "second"));
        set.insert(descriptor("a", "renamed"));

        let streams = set.into_vec();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].uid(), "a");
        assert_eq!(streams[0].name(), "renamed");
        assert_eq!(streams[1].uid(), "b");
    }

    #[test]
    fn test_invalid_query_is_rejected() {
        let registry = StreamRegistry::new(
            RegistryConfig::default()
                .with_peers(["127.0.0.1"])
                .with_ports(38300, 2),
        )
        .unwrap();
        assert!(registry
            .discover_matching("type=", 1, Duration::from_millis(10))
            .is_err());
    }

    #[test]
    fn test_nothing_advertised_returns_empty() {
        let registry = StreamRegistry::new(
            RegistryConfig::default()
                .with_peers(["127.0.0.1"])
                .with_ports(38310, 2),
        )
        .unwrap();
        let started = Instant::now();
        let streams = registry.discover(Duration::from_millis(300)).unwrap();
        assert!(streams.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}

//! Simulated EEG headset
//!
//! Pushes uniformly random values into a [`StreamOutlet`] at a fixed rate.

use crate::config::OutletConfig;
use crate::error::Result;
use crate::outlet::StreamOutlet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use streamsense_types::{ChannelFormat, StreamInfo};
use tracing::info;

/// Shape of the simulated stream
#[derive(Debug, Clone, PartialEq)]
pub struct MockEegConfig {
    pub name: String,
    pub content_type: String,
    pub channel_count: usize,
    pub nominal_srate: f64,
    pub source_id: String,
    /// Values are drawn from `[0, max_value)`
    pub max_value: f64,
    /// Fixed seed for reproducible output; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for MockEegConfig {
    fn default() -> Self {
        Self {
            name: "MyStream".to_string(),
            content_type: "EEG".to_string(),
            channel_count: 4,
            nominal_srate: 256.0,
            source_id: "muse-simulator-eeg".to_string(),
            max_value: 100.0,
            seed: None,
        }
    }
}

impl MockEegConfig {
    pub fn stream_info(&self) -> StreamInfo {
        StreamInfo::new(
            self.name.clone(),
            self.content_type.clone(),
            self.channel_count,
            self.nominal_srate,
            ChannelFormat::Float32,
            self.source_id.clone(),
        )
    }

    /// Interval between pushes at the nominal rate
    pub fn push_interval(&self) -> Duration {
        if self.nominal_srate > 0.0 {
            Duration::from_secs_f64(1.0 / self.nominal_srate)
        } else {
            Duration::from_millis(4)
        }
    }
}

/// Random-valued EEG source
pub struct MockEegGenerator {
    config: MockEegConfig,
    outlet: StreamOutlet,
    rng: StdRng,
}

impl MockEegGenerator {
    pub fn new(config: MockEegConfig, outlet_config: OutletConfig) -> Result<Self> {
        let outlet = StreamOutlet::new(config.stream_info(), outlet_config)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { config, outlet, rng })
    }

    pub fn outlet(&self) -> &StreamOutlet {
        &self.outlet
    }

    /// One sample's worth of random values
    pub fn next_values(&mut self) -> Vec<f64> {
        let max = self.config.max_value;
        (0..self.config.channel_count)
            .map(|_| self.rng.gen_range(0.0..max))
            .collect()
    }

    /// Push one random sample
    pub fn push_next(&mut self) -> Result<()> {
        let values = self.next_values();
        self.outlet.push_sample(&values)
    }

    /// Push at the nominal rate until `running` is cleared; returns the
    /// number of samples pushed
    pub fn run(&mut self, running: &AtomicBool) -> Result<u64> {
        let interval = self.config.push_interval();
        let mut next = Instant::now();
        let mut pushed = 0u64;

        info!(
            "[OUTLET] Simulating '{}': {} channels at {} Hz",
            self.config.name, self.config.channel_count, self.config.nominal_srate
        );

        while running.load(Ordering::Acquire) {
            self.push_next()?;
            pushed += 1;

            next += interval;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                // Fell behind; do not burst to catch up.
                next = now;
            }
        }

        self.outlet.close();
        Ok(pushed)
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # streamsense-inlet
//!
//! Receiving side of streamsense: find streams on the network, connect to
//! one, and pull its samples.
//!
//! - [`StreamRegistry`] discovers advertised streams within a bounded window
//! - [`InletSession`] owns the connection to one stream (`Unopened → Open → Closed`)
//! - [`SampleReader`] pulls single samples, chunks and multiplexed chunks
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use streamsense_inlet::{InletConfig, InletSession, RegistryConfig, StreamRegistry};
//!
//! let registry = StreamRegistry::new(RegistryConfig::default())?;
//! let streams = registry.discover_matching("type='EEG'", 1, Duration::from_secs(1))?;
//! let Some(descriptor) = streams.into_iter().next() else {
//!     eprintln!("No streams found");
//!     return Ok(());
//! };
//!
//! let session = InletSession::new(descriptor, InletConfig::default())?;
//! session.open()?;
//! let reader = session.reader();
//! if let Some(sample) = reader.pull_sample(Duration::from_secs(1))? {
//!     println!("{:?} @ {}", sample.values, sample.timestamp);
//! }
//! session.close();
//! # Ok::<(), streamsense_inlet::InletError>(())
//! ```
//!
//! # Thread Safety
//!
//! Sessions use `parking_lot` locks internally and can be shared by
//! reference; `close()` from one thread unblocks a pull in another.

pub mod config;
pub mod error;
pub mod reader;
pub mod reconnect;
pub mod registry;
pub mod session;

pub use config::{InletConfig, RegistryConfig};
pub use error::{InletError, Result};
pub use reader::SampleReader;
pub use reconnect::{retry_with_backoff, ReconnectionStrategy};
pub use registry::StreamRegistry;
pub use session::{InletSession, InletStats, SessionState};

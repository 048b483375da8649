//! # streamsense
//!
//! Discover multi-channel sensor streams (EEG headsets and the like) on the
//! local network, connect to one, and pull its samples.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! streamsense = "0.0.1-beta.18"  # Default: inlet + outlet + client
//! ```
//!
//! ## Feature Flags
//!
//! - **`inlet`** (default): registry, sessions and sample readers
//! - **`outlet`** (default): stream outlet and the mock EEG generator
//! - **`client`** (default): the console client loop (implies `inlet`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use streamsense::prelude::*;
//!
//! let registry = StreamRegistry::new(RegistryConfig::default())?;
//! let streams = registry.discover(Duration::from_secs(1))?;
//! if let Some(descriptor) = streams.into_iter().next() {
//!     let session = InletSession::new(descriptor, InletConfig::default())?;
//!     session.open()?;
//!     let chunk = session.reader().pull_chunk_multiplexed()?;
//!     println!("{} samples", chunk.sample_count());
//!     session.close();
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: streamsense-types, streamsense-config      │
//! │  (Descriptors, samples, queries, configuration)         │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  I/O: streamsense-transports                            │
//! │  (UDP discovery, TCP data channel)                      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Endpoints: streamsense-inlet, streamsense-outlet       │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application: streamsense-client                        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use streamsense_config as config;
pub use streamsense_transports as transports;
pub use streamsense_types as types;

// Re-export endpoints
#[cfg(feature = "inlet")]
pub use streamsense_inlet as inlet;

#[cfg(feature = "outlet")]
pub use streamsense_outlet as outlet;

#[cfg(feature = "client")]
pub use streamsense_client as client;

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::types::*;

    #[cfg(feature = "inlet")]
    pub use crate::inlet::{
        InletConfig, InletError, InletSession, RegistryConfig, SampleReader, SessionState,
        StreamRegistry,
    };

    #[cfg(feature = "outlet")]
    pub use crate::outlet::{MockEegConfig, MockEegGenerator, OutletConfig, OutletError, StreamOutlet};

    #[cfg(feature = "client")]
    pub use crate::client::{ClientLoop, ExitCode, ShutdownSignal};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let query = StreamQuery::any();
        assert!(query.is_any());
        assert_eq!(ChannelFormat::Float32.byte_width(), 4);
    }
}

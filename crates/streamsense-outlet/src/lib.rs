// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # streamsense-outlet
//!
//! Sending side of streamsense. A [`StreamOutlet`] advertises one stream on
//! the discovery port range and streams every pushed sample to all
//! connected inlets. [`MockEegGenerator`] drives an outlet with random data
//! shaped like a 4-channel headset.
//!
//! ```no_run
//! use streamsense_outlet::{OutletConfig, StreamOutlet};
//! use streamsense_types::{ChannelFormat, StreamInfo};
//!
//! let info = StreamInfo::new("MyStream", "EEG", 4, 256.0, ChannelFormat::Float32, "my-device");
//! let outlet = StreamOutlet::new(info, OutletConfig::default())?;
//! outlet.push_sample(&[1.0, 2.0, 3.0, 4.0])?;
//! outlet.close();
//! # Ok::<(), streamsense_outlet::OutletError>(())
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod outlet;

pub use config::OutletConfig;
pub use error::{OutletError, Result};
pub use mock::{MockEegConfig, MockEegGenerator};
pub use outlet::StreamOutlet;

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # streamsense-client
//!
//! The `streamsense` console client as a library: discover a stream, open
//! an inlet to it and print what it sends until interrupted.
//!
//! ```no_run
//! use streamsense_client::{ClientLoop, ShutdownSignal};
//! use streamsense_config::StreamsenseConfig;
//!
//! let client = ClientLoop::new(StreamsenseConfig::default()).expect("valid config");
//! let shutdown = ShutdownSignal::new();
//! let code = client.run(std::io::stdout().lock(), &shutdown);
//! std::process::exit(i32::from(code.code()));
//! ```

pub mod client_loop;
pub mod exit;
pub mod printer;
pub mod shutdown;

pub use client_loop::{ClientLoop, SessionGuard};
pub use exit::{ClientError, ExitCode};
pub use shutdown::ShutdownSignal;

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # streamsense-observability
//!
//! Logging setup shared by the streamsense binaries.
//!
//! Logs always go to stderr; stdout carries sample output only. Verbosity is
//! raised per crate with `--debug-<crate>` flags.
//!
//! ## Features
//! - `file-logging`: additional JSON log files with daily rotation

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known streamsense crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "streamsense",
    "streamsense-types",
    "streamsense-transports",
    "streamsense-config",
    "streamsense-inlet",
    "streamsense-outlet",
    "streamsense-client",
];

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # streamsense-transports
//!
//! Network layer for streamsense. Two channels are provided:
//!
//! ### Discovery (UDP)
//! - **Inlet side**: [`discovery::QuerySocket`] sends a JSON query datagram to
//!   every port of the discovery port range on each configured peer address
//!   and collects the unicast responses.
//! - **Outlet side**: [`discovery::DiscoveryResponder`] binds the first free
//!   port of the range and answers queries its stream matches.
//!
//! ### Data (TCP)
//! - A short binary handshake binds a connection to one stream uid.
//! - The outlet then streams length-implied sample frames until it sends
//!   `EndOfStream` or the connection drops.
//!
//! ## Example: querying the local machine
//!
//! ```no_run
//! use streamsense_transports::discovery::{DiscoveryQuery, QuerySocket};
//! use std::time::Duration;
//!
//! let socket = QuerySocket::bind(&["127.0.0.1".to_string()], 16571, 32)?;
//! socket.send_query(&DiscoveryQuery::new(1, ""))?;
//! while let Some((response, from)) = socket.recv_response(Duration::from_millis(200))? {
//!     println!("{} from {}", response.descriptor.name(), from);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! All multi-byte integers on the data channel are little-endian.

pub mod common;
pub mod data;
pub mod discovery;
pub mod traits;

pub use common::{TransportError, TransportResult};
pub use traits::Transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::common::*;
    pub use crate::data::*;
    pub use crate::discovery::*;
    pub use crate::traits::*;
}

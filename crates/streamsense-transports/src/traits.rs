// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transport trait definitions

use crate::common::TransportResult;

/// Lifecycle shared by the long-running server-side transports
/// (discovery responder, data listener).
pub trait Transport: Send {
    /// Start the transport's background work
    fn start(&mut self) -> TransportResult<()>;

    /// Stop the transport and join its background work
    fn stop(&mut self) -> TransportResult<()>;

    /// Check if transport is running
    fn is_running(&self) -> bool;

    /// Get transport name/type
    fn transport_type(&self) -> &str;
}

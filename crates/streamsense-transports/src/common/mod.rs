//! Common types shared by the discovery and data channels

pub mod error;

pub use error::{TransportError, TransportResult};

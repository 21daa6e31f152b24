// src/stability/mod.rs

//! Stability detection: "still being written" vs "safe to move".
//!
//! - [`snapshot`] holds the size / checksum snapshot types and their
//!   order-insensitive equality.
//! - [`detector`] runs the tick-driven two-phase polling loop.

pub mod detector;
pub mod snapshot;

pub use detector::{StabilityConfig, StabilityDetector};
pub use snapshot::{ChecksumSnapshot, SizeSnapshot, Snapshot};

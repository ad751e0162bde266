//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains:
//! - `mod.rs`: Typed backend payloads
//! - `wire.rs`: Request bodies, where the resource has writes
//! - `client.rs`: Sub-client with HTTP methods, cached reads, and the
//!   invalidations its writes imply

pub mod analytics;
pub mod holding;
pub mod price;
pub mod signal;
pub mod trade;

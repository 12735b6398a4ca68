//! plugwire - Client Library
//!
//! Configuration and a high-level client bound to one device.

#[allow(clippy::module_inception)]
mod client;
mod config;

pub use client::*;
pub use config::*;

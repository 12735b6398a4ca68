//! Core types shared by every layer: constants, errors, and addressing.

pub mod constants;
mod error;
mod types;

pub use error::*;
pub use types::*;

//! Migrastack: Rust-native declarative stack synthesis.
//!
//! Typed declarations in, deployable CloudFormation templates out.
//! BLAKE3 assembly hashing. Provenance tracing.

pub mod cli;
pub mod constructs;
pub mod core;
pub mod error;
pub mod stack;
pub mod tripwire;

pub use error::{Error, Result};

//! Tripwire: provenance tracing, BLAKE3 hashing, assembly verification.

pub mod eventlog;
pub mod hasher;
pub mod verify;

//! Core logic: types, parsing, resolution, synthesis, audit, assembly output.

pub mod audit;
pub mod cidr;
pub mod manifest;
pub mod parser;
pub mod resolver;
pub mod synth;
pub mod types;

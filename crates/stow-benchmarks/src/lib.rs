//! Stow benchmarking suite
//!
//! Benchmarks for closure computation, version selection, the graph walk
//! and lock file fingerprinting, plus the synthetic graphs and feeds they
//! share.

pub mod common;

pub use common::*;

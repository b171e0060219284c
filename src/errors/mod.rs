//! Error types for BruceFlash

pub mod types;

pub use types::*;

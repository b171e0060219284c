//! Utility functions and helpers used throughout BruceFlash

pub mod logging;

//! Configuration management for BruceFlash

pub mod app_config;

pub use app_config::*;

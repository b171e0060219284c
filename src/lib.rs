//! BruceFlash - Bruce firmware installer and serial terminal
//!
//! BruceFlash downloads Bruce firmware releases for ESP32-class devices,
//! flashes them through the external `esptool` program, and provides an
//! interactive serial terminal with user-defined command shortcuts.

pub mod cli;
pub mod config;
pub mod errors;
pub mod manifest;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use errors::*;
pub use models::*;

/// BruceFlash version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// BruceFlash application name
pub const APP_NAME: &str = "bruceflash";

//! Data models and types used throughout BruceFlash

pub mod command;
pub mod device;
pub mod events;
pub mod flash;

// Re-export commonly used types
pub use command::*;
pub use device::*;
pub use events::*;
pub use flash::*;

//! Services module containing the coordination core
//!
//! The serial session, firmware provisioner, and command registry are
//! composed by the session orchestrator, which the CLI commands drive.

pub mod orchestrator;
pub mod provisioner;
pub mod registry;
pub mod serial;

pub use orchestrator::*;
pub use provisioner::*;
pub use registry::*;
pub use serial::*;

//! User-defined serial command shortcuts

use serde::{Deserialize, Serialize};

/// A saved serial command shortcut.
///
/// Identity is `id` (caller-assigned, the CLI uses a millisecond
/// timestamp). Records are immutable once stored; changing one means
/// delete and re-insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCommand {
    pub id: String,
    /// Short label shown in listings
    pub name: String,
    /// Text sent to the device, without the trailing newline
    pub command: String,
}

//! Device descriptors parsed from the remote firmware manifest

use serde::{Deserialize, Serialize};

/// A flashable device entry from the Bruce firmware manifest.
///
/// Identity is `id`; the manifest may list the same id under several
/// categories and all entries are kept, so callers that care about
/// uniqueness dedupe at presentation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Manifest device identifier, also the firmware file name suffix
    pub id: String,
    /// Human readable device name
    pub display_name: String,
    /// Manifest category the entry was listed under
    pub category: String,
}

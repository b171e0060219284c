//! Parser for the remote Bruce device manifest
//!
//! The manifest is a JSON document mapping category names to lists of
//! `{id, name}` objects. Parsing is best-effort: the flash workflow must
//! stay usable when the manifest is unreachable or mangled, so malformed
//! input yields an empty list instead of an error and bad entries are
//! skipped individually.

use serde_json::Value;

use crate::models::DeviceDescriptor;

/// Parse a manifest document into device descriptors.
///
/// Pure function of the input string, no network access. Records are
/// kept in document order and duplicate ids are not collapsed here;
/// serde_json keeps category keys sorted, so the result is deterministic
/// for a given document.
pub fn parse_manifest(document: &str) -> Vec<DeviceDescriptor> {
    let value: Value = match serde_json::from_str(document) {
        Ok(value) => value,
        Err(err) => {
            log::debug!("Manifest is not valid JSON: {}", err);
            return Vec::new();
        }
    };

    let Some(categories) = value.as_object() else {
        log::debug!("Manifest root is not an object, ignoring");
        return Vec::new();
    };

    let mut devices = Vec::new();
    for (category, entries) in categories {
        let Some(entries) = entries.as_array() else {
            continue;
        };
        for entry in entries {
            let id = entry.get("id").and_then(Value::as_str);
            let name = entry.get("name").and_then(Value::as_str);
            if let (Some(id), Some(name)) = (id, name) {
                if id.is_empty() {
                    continue;
                }
                devices.push(DeviceDescriptor {
                    id: id.to_string(),
                    display_name: name.to_string(),
                    category: category.to_string(),
                });
            }
        }
    }

    devices
}

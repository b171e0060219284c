//! Durable store of saved serial command shortcuts
//!
//! Backed by a JSON file. Every mutation rewrites the file through a
//! temp-file-then-rename step so a crash mid-write leaves the previous
//! contents intact.

use std::fs;
use std::path::PathBuf;

use crate::errors::{BruceFlashError, Result};
use crate::models::CustomCommand;

pub struct CommandRegistry {
    path: PathBuf,
    commands: Vec<CustomCommand>,
}

impl CommandRegistry {
    /// Default store location under the platform data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::APP_NAME)
            .join("custom_commands.json")
    }

    /// Open the registry at `path`, creating an empty one if the file
    /// does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let commands = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|err| {
                BruceFlashError::Store(format!("invalid store {}: {}", path.display(), err))
            })?
        } else {
            Vec::new()
        };
        Ok(Self { path, commands })
    }

    /// Insert a record and persist. Ids are caller-assigned; duplicates
    /// are not rejected here.
    pub fn insert(&mut self, command: CustomCommand) -> Result<()> {
        self.commands.push(command);
        self.persist()
    }

    /// All records, in insertion order.
    pub fn list(&self) -> &[CustomCommand] {
        &self.commands
    }

    /// Delete the record with the given id. Deleting an absent id is a
    /// no-op, not an error.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let before = self.commands.len();
        self.commands.retain(|c| c.id != id);
        if self.commands.len() != before {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.commands)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        // Rename is atomic within the same directory.
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

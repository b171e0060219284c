//! Application configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::{BruceFlashError, Result};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// URL of the device manifest document
    pub manifest_url: String,
    /// Firmware acquisition and flashing configuration
    pub firmware: FirmwareConfig,
    /// Serial terminal configuration
    pub serial: SerialConfig,
}

/// Firmware download and esptool invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmwareConfig {
    /// Base URL of the firmware release assets
    pub release_base_url: String,
    /// Name (or path) of the external flashing tool executable
    pub esptool_program: String,
    /// Chip family passed to the tool
    pub chip: String,
    /// Flash write offset, e.g. "0x0"
    pub flash_offset: String,
    /// Download timeout in seconds
    pub download_timeout_secs: u64,
}

/// Serial terminal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Default baud rate for terminal and flashing
    pub baud_rate: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            manifest_url:
                "https://raw.githubusercontent.com/pr3y/Bruce/refs/heads/WebPage/src/lib/data/manifests.json"
                    .to_string(),
            firmware: FirmwareConfig::default(),
            serial: SerialConfig::default(),
        }
    }
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            release_base_url: "https://github.com/pr3y/Bruce/releases/download/1.11".to_string(),
            esptool_program: "esptool".to_string(),
            chip: "esp32s3".to_string(),
            flash_offset: "0x0".to_string(),
            download_timeout_secs: 60,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { baud_rate: 115200 }
    }
}

impl AppConfig {
    /// Path of the persisted configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::APP_NAME)
            .join("config.json")
    }

    /// Load configuration from disk, falling back to defaults when the
    /// file does not exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config = serde_json::from_str(&content).map_err(|err| {
            BruceFlashError::Config(format!("invalid config {}: {}", path.display(), err))
        })?;
        Ok(config)
    }

    /// Persist the configuration to its default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

impl FirmwareConfig {
    /// Download URL for a device's firmware binary.
    pub fn firmware_url(&self, device_id: &str) -> String {
        format!(
            "{}/Bruce-{}.bin",
            self.release_base_url.trim_end_matches('/'),
            device_id
        )
    }

    /// Scratch location the downloaded binary is written to before
    /// flashing.
    pub fn scratch_path(&self) -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(crate::APP_NAME)
            .join("bruce_firmware.bin")
    }

    /// esptool argument list for writing `firmware_path` to the device.
    pub fn tool_args(&self, baud_rate: u32, firmware_path: &std::path::Path) -> Vec<String> {
        vec![
            "--chip".to_string(),
            self.chip.clone(),
            "--baud".to_string(),
            baud_rate.to_string(),
            "--before".to_string(),
            "default_reset".to_string(),
            "--after".to_string(),
            "hard_reset".to_string(),
            "--no-stub".to_string(),
            "write_flash".to_string(),
            "-z".to_string(),
            self.flash_offset.clone(),
            firmware_path.to_string_lossy().to_string(),
        ]
    }
}

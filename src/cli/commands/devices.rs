//! `devices` command - fetch and list the remote device manifest

use anyhow::Result;

use crate::config::AppConfig;
use crate::manifest::parse_manifest;
use crate::services::provisioner::FirmwareProvisioner;

pub async fn execute_devices_command() -> Result<()> {
    let config = AppConfig::load()?;
    let provisioner = FirmwareProvisioner::from_config(&config)?;

    println!("📡 Fetching device manifest...");
    let document = match provisioner.fetch_manifest(&config.manifest_url).await {
        Ok(document) => document,
        Err(err) => {
            println!("Error loading manifest: {:#}", err);
            return Ok(());
        }
    };

    let devices = parse_manifest(&document);
    if devices.is_empty() {
        println!("No devices found in manifest");
        return Ok(());
    }

    let mut current_category = "";
    for device in &devices {
        if device.category != current_category {
            current_category = device.category.as_str();
            println!("\n{}", current_category);
        }
        println!("  {:<32} {}", device.id, device.display_name);
    }
    println!("\n✅ {} devices available", devices.len());

    Ok(())
}

//! `flash` command - download firmware for a device and flash it

use anyhow::Result;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::models::AppEvent;
use crate::services::orchestrator::SessionOrchestrator;
use crate::services::serial::PortSelection;

pub async fn execute_flash_command(device: &str, baud: Option<u32>) -> Result<()> {
    let config = AppConfig::load()?;
    let baud_rate = baud.unwrap_or(config.serial.baud_rate);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator =
        SessionOrchestrator::new(&config, PortSelection::LastEnumerated, baud_rate, tx)?;

    println!("🔥 Flashing Bruce firmware for {}", device);

    // Print transcript lines as the workers emit them while the flash
    // future runs to completion.
    let flash = orchestrator.flash_device(device, baud_rate);
    tokio::pin!(flash);
    let outcome = loop {
        tokio::select! {
            outcome = &mut flash => break outcome,
            Some(event) = rx.recv() => {
                orchestrator.observe(&event).await;
                println!("{}", event.line());
            }
        }
    };

    // Drain whatever was emitted between the last poll and completion.
    while let Ok(event) = rx.try_recv() {
        orchestrator.observe(&event).await;
        println!("{}", event.line());
    }

    if outcome.is_success() {
        println!("✅ Installation complete! Unplug and replug the device to boot Bruce.");
        Ok(())
    } else {
        Err(anyhow::anyhow!("flash did not complete: {}", outcome))
    }
}

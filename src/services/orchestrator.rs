//! Session orchestration
//!
//! The orchestrator composes the serial session, firmware provisioner
//! and command registry behind one surface the CLI commands drive. It
//! owns the transcript (the append-only log of every line shown to the
//! user) and the busy flag guarding against overlapping flash runs.

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::manifest::parse_manifest;
use crate::models::{AppEvent, CustomCommand, DeviceDescriptor, FlashOutcome};
use crate::services::provisioner::FirmwareProvisioner;
use crate::services::registry::CommandRegistry;
use crate::services::serial::{PortSelection, SerialSession};

pub struct SessionOrchestrator {
    events: mpsc::UnboundedSender<AppEvent>,
    serial: Mutex<SerialSession>,
    provisioner: Arc<FirmwareProvisioner>,
    registry: Mutex<CommandRegistry>,
    manifest_url: String,
    transcript: Mutex<Vec<String>>,
    flashing: AtomicBool,
}

/// Clears the busy flag when dropped so every exit path out of
/// `flash_device` releases it.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SessionOrchestrator {
    /// Build an orchestrator wired to the real collaborators.
    pub fn new(
        config: &AppConfig,
        selection: PortSelection,
        baud_rate: u32,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Result<Self> {
        let serial = SerialSession::new(events.clone(), selection, baud_rate);
        let provisioner = Arc::new(FirmwareProvisioner::from_config(config)?);
        let registry = CommandRegistry::open(CommandRegistry::default_path())?;
        Ok(Self::with_parts(
            serial,
            provisioner,
            registry,
            config.manifest_url.clone(),
            events,
        ))
    }

    /// Build an orchestrator from explicit parts (used by tests to
    /// inject doubles).
    pub fn with_parts(
        serial: SerialSession,
        provisioner: Arc<FirmwareProvisioner>,
        registry: CommandRegistry,
        manifest_url: String,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            events,
            serial: Mutex::new(serial),
            provisioner,
            registry: Mutex::new(registry),
            manifest_url,
            transcript: Mutex::new(Vec::new()),
            flashing: AtomicBool::new(false),
        }
    }

    /// Append an event's line to the transcript. The interactive layer
    /// calls this for every event it drains from the channel.
    pub async fn observe(&self, event: &AppEvent) {
        self.transcript.lock().await.push(event.line());
    }

    /// Snapshot of the transcript so far.
    pub async fn transcript(&self) -> Vec<String> {
        self.transcript.lock().await.clone()
    }

    /// Whether a fetch-and-flash run is outstanding.
    pub fn flash_in_progress(&self) -> bool {
        self.flashing.load(Ordering::SeqCst)
    }

    // Serial session pass-throughs

    pub async fn connect(&self) {
        self.serial.lock().await.connect();
    }

    pub async fn disconnect(&self) {
        self.serial.lock().await.disconnect();
    }

    pub async fn send_command(&self, text: &str) {
        self.serial.lock().await.send_command(text);
    }

    pub async fn set_baud_rate(&self, baud_rate: u32) {
        self.serial.lock().await.set_baud_rate(baud_rate);
    }

    // Command registry operations

    pub async fn saved_commands(&self) -> Vec<CustomCommand> {
        self.registry.lock().await.list().to_vec()
    }

    pub async fn add_command(&self, command: CustomCommand) -> Result<()> {
        self.registry.lock().await.insert(command)?;
        Ok(())
    }

    pub async fn remove_command(&self, id: &str) -> Result<()> {
        self.registry.lock().await.delete(id)?;
        Ok(())
    }

    /// Send a saved command, looked up by name or id.
    pub async fn run_saved(&self, key: &str) {
        let found = {
            let registry = self.registry.lock().await;
            registry
                .list()
                .iter()
                .find(|c| c.name == key || c.id == key)
                .map(|c| c.command.clone())
        };
        match found {
            Some(command) => self.send_command(&command).await,
            None => {
                let _ = self.events.send(AppEvent::SerialStatus(format!(
                    "No saved command named {}",
                    key
                )));
            }
        }
    }

    /// Fetch and parse the device manifest. A failed fetch or a mangled
    /// document reports a line and yields an empty list so the caller
    /// can retry.
    pub async fn load_devices(&self) -> Vec<DeviceDescriptor> {
        let document = match self.provisioner.fetch_manifest(&self.manifest_url).await {
            Ok(document) => document,
            Err(err) => {
                let _ = self.events.send(AppEvent::FlashOutput(format!(
                    "Error loading manifest: {:#}",
                    err
                )));
                return Vec::new();
            }
        };
        parse_manifest(&document)
    }

    /// Run the full select -> fetch -> flash -> report workflow for one
    /// device.
    ///
    /// Exactly one run at a time; a second call while one is outstanding
    /// is rejected with a reported line. The busy flag is cleared on
    /// every exit path.
    pub async fn flash_device(&self, device_id: &str, baud_rate: u32) -> FlashOutcome {
        if device_id.trim().is_empty() {
            let outcome = FlashOutcome::Error("no device selected".to_string());
            let _ = self.events.send(AppEvent::FlashFinished(outcome.clone()));
            return outcome;
        }

        if self.flashing.swap(true, Ordering::SeqCst) {
            let outcome = FlashOutcome::Error("flash already in progress".to_string());
            let _ = self.events.send(AppEvent::FlashFinished(outcome.clone()));
            return outcome;
        }
        let _busy = BusyGuard(&self.flashing);

        let _ = self.events.send(AppEvent::FlashOutput(format!(
            "> Selected device: {}",
            device_id
        )));
        let _ = self.events.send(AppEvent::FlashOutput(
            "Starting firmware download...".to_string(),
        ));

        let outcome = self
            .provisioner
            .fetch_and_flash(device_id, baud_rate, &self.events)
            .await;

        let _ = self.events.send(AppEvent::FlashFinished(outcome.clone()));
        outcome
    }
}

//! Fetch-and-flash pipeline and orchestrator workflow tests
//!
//! All hardware and network collaborators are doubles; these tests pin
//! down the coordination contract: short-circuiting, busy-flag
//! discipline, and the transcript lines users see.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::sync::Notify;

use bruceflash::config::FirmwareConfig;
use bruceflash::models::{AppEvent, FlashOutcome};
use bruceflash::services::orchestrator::SessionOrchestrator;
use bruceflash::services::provisioner::{Flasher, FirmwareProvisioner, FirmwareSource};
use bruceflash::services::registry::CommandRegistry;
use bruceflash::services::serial::{PortSelection, SerialSession};

struct FakeSource {
    fail: bool,
    payload: Vec<u8>,
}

impl FakeSource {
    fn ok(payload: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            payload: payload.to_vec(),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            payload: Vec::new(),
        })
    }
}

#[async_trait]
impl FirmwareSource for FakeSource {
    async fn download(&self, _url: &str) -> anyhow::Result<Vec<u8>> {
        if self.fail {
            anyhow::bail!("network down");
        }
        Ok(self.payload.clone())
    }
}

#[derive(Default)]
struct CapturingFlasher {
    calls: AtomicUsize,
    last_args: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl Flasher for CapturingFlasher {
    async fn flash(
        &self,
        args: &[String],
        _events: &mpsc::UnboundedSender<AppEvent>,
    ) -> FlashOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_args.lock().unwrap() = args.to_vec();
        FlashOutcome::Success
    }
}

/// Flasher that parks until the test releases it, for observing the
/// busy flag mid-run.
struct BlockingFlasher {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl Flasher for BlockingFlasher {
    async fn flash(
        &self,
        _args: &[String],
        _events: &mpsc::UnboundedSender<AppEvent>,
    ) -> FlashOutcome {
        self.started.notify_one();
        self.release.notified().await;
        FlashOutcome::Success
    }
}

fn provisioner_with(
    source: Arc<dyn FirmwareSource>,
    flasher: Arc<dyn Flasher>,
    scratch: std::path::PathBuf,
) -> FirmwareProvisioner {
    FirmwareProvisioner::new(FirmwareConfig::default(), source, flasher)
        .with_scratch_path(scratch)
}

fn orchestrator_with(
    dir: &TempDir,
    provisioner: FirmwareProvisioner,
    tx: mpsc::UnboundedSender<AppEvent>,
) -> SessionOrchestrator {
    let serial = SerialSession::new(tx.clone(), PortSelection::LastEnumerated, 115200);
    let registry = CommandRegistry::open(dir.path().join("cmds.json")).unwrap();
    SessionOrchestrator::with_parts(
        serial,
        Arc::new(provisioner),
        registry,
        "http://manifest.invalid/manifests.json".to_string(),
        tx,
    )
}

fn drain_lines(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(event) = rx.try_recv() {
        lines.push(event.line());
    }
    lines
}

#[tokio::test]
async fn test_download_failure_never_invokes_the_flasher() {
    let dir = TempDir::new().unwrap();
    let flasher = Arc::new(CapturingFlasher::default());
    let provisioner = provisioner_with(
        FakeSource::failing(),
        flasher.clone(),
        dir.path().join("fw.bin"),
    );
    let (tx, _rx) = mpsc::unbounded_channel();

    let outcome = provisioner.fetch_and_flash("cardputer", 115200, &tx).await;

    assert!(matches!(outcome, FlashOutcome::Error(ref msg) if msg.contains("download failed")));
    assert_eq!(flasher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_save_failure_never_invokes_the_flasher() {
    let dir = TempDir::new().unwrap();
    // A regular file where the scratch directory should be makes the
    // save stage fail.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"in the way").unwrap();

    let flasher = Arc::new(CapturingFlasher::default());
    let provisioner = provisioner_with(
        FakeSource::ok(b"firmware"),
        flasher.clone(),
        blocker.join("fw.bin"),
    );
    let (tx, _rx) = mpsc::unbounded_channel();

    let outcome = provisioner.fetch_and_flash("cardputer", 115200, &tx).await;

    assert!(matches!(outcome, FlashOutcome::Error(ref msg) if msg.contains("save")));
    assert_eq!(flasher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_successful_pipeline_stages_file_and_flashes_it() {
    let dir = TempDir::new().unwrap();
    let scratch = dir.path().join("staging").join("fw.bin");
    let flasher = Arc::new(CapturingFlasher::default());
    let provisioner = provisioner_with(FakeSource::ok(b"firmware"), flasher.clone(), scratch.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let outcome = provisioner.fetch_and_flash("cardputer", 921600, &tx).await;

    assert_eq!(outcome, FlashOutcome::Success);
    assert_eq!(flasher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(std::fs::read(&scratch).unwrap(), b"firmware");

    let args = flasher.last_args.lock().unwrap().clone();
    assert!(args.contains(&"--baud".to_string()));
    assert!(args.contains(&"921600".to_string()));
    assert!(args.contains(&"write_flash".to_string()));
    assert_eq!(args.last().unwrap(), &scratch.to_string_lossy().to_string());

    let lines = drain_lines(&mut rx);
    assert!(lines.iter().any(|l| l.starts_with("Downloading ")));
    assert!(lines.iter().any(|l| l.starts_with("Downloaded to ")));
    assert!(lines.iter().any(|l| l == "Flashing..."));
}

#[tokio::test]
async fn test_flash_device_reports_result_and_clears_busy_flag() {
    let dir = TempDir::new().unwrap();
    let flasher = Arc::new(CapturingFlasher::default());
    let provisioner = provisioner_with(
        FakeSource::ok(b"firmware"),
        flasher,
        dir.path().join("fw.bin"),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = orchestrator_with(&dir, provisioner, tx);

    let outcome = orchestrator.flash_device("cardputer", 115200).await;

    assert_eq!(outcome, FlashOutcome::Success);
    assert!(!orchestrator.flash_in_progress());

    let lines = drain_lines(&mut rx);
    assert!(lines.iter().any(|l| l == "> Selected device: cardputer"));
    assert!(lines.iter().any(|l| l == "Starting firmware download..."));
    assert_eq!(lines.last().unwrap(), "Success");
}

#[tokio::test]
async fn test_busy_flag_clears_on_download_failure() {
    let dir = TempDir::new().unwrap();
    let flasher = Arc::new(CapturingFlasher::default());
    let provisioner = provisioner_with(FakeSource::failing(), flasher, dir.path().join("fw.bin"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = orchestrator_with(&dir, provisioner, tx);

    let outcome = orchestrator.flash_device("cardputer", 115200).await;

    assert!(matches!(outcome, FlashOutcome::Error(_)));
    assert!(!orchestrator.flash_in_progress());

    // The failure is the user-visible report, as a transcript line.
    let lines = drain_lines(&mut rx);
    assert!(lines.last().unwrap().starts_with("Error: download failed"));
}

#[tokio::test]
async fn test_busy_flag_clears_on_save_failure() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"in the way").unwrap();

    let flasher = Arc::new(CapturingFlasher::default());
    let provisioner = provisioner_with(
        FakeSource::ok(b"firmware"),
        flasher,
        blocker.join("fw.bin"),
    );
    let (tx, _rx) = mpsc::unbounded_channel();
    let orchestrator = orchestrator_with(&dir, provisioner, tx);

    let outcome = orchestrator.flash_device("cardputer", 115200).await;

    assert!(matches!(outcome, FlashOutcome::Error(_)));
    assert!(!orchestrator.flash_in_progress());
}

#[tokio::test]
async fn test_busy_exactly_during_flash_and_second_run_rejected() {
    let dir = TempDir::new().unwrap();
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let flasher = Arc::new(BlockingFlasher {
        started: started.clone(),
        release: release.clone(),
    });
    let provisioner = provisioner_with(
        FakeSource::ok(b"firmware"),
        flasher,
        dir.path().join("fw.bin"),
    );
    let (tx, _rx) = mpsc::unbounded_channel();
    let orchestrator = Arc::new(orchestrator_with(&dir, provisioner, tx));

    assert!(!orchestrator.flash_in_progress());

    let worker = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.flash_device("cardputer", 115200).await })
    };

    started.notified().await;
    assert!(orchestrator.flash_in_progress());

    let second = orchestrator.flash_device("cardputer", 115200).await;
    assert_eq!(
        second,
        FlashOutcome::Error("flash already in progress".to_string())
    );

    release.notify_one();
    let outcome = worker.await.unwrap();
    assert_eq!(outcome, FlashOutcome::Success);
    assert!(!orchestrator.flash_in_progress());
}

#[tokio::test]
async fn test_empty_device_id_is_rejected_without_going_busy() {
    let dir = TempDir::new().unwrap();
    let flasher = Arc::new(CapturingFlasher::default());
    let provisioner = provisioner_with(
        FakeSource::ok(b"firmware"),
        flasher.clone(),
        dir.path().join("fw.bin"),
    );
    let (tx, _rx) = mpsc::unbounded_channel();
    let orchestrator = orchestrator_with(&dir, provisioner, tx);

    let outcome = orchestrator.flash_device("  ", 115200).await;

    assert_eq!(
        outcome,
        FlashOutcome::Error("no device selected".to_string())
    );
    assert!(!orchestrator.flash_in_progress());
    assert_eq!(flasher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_load_devices_parses_manifest_from_source() {
    let dir = TempDir::new().unwrap();
    let manifest = br#"{"Boards": [{"id": "m5stack-cardputer", "name": "M5Stack Cardputer"}]}"#;
    let flasher = Arc::new(CapturingFlasher::default());
    let provisioner = provisioner_with(FakeSource::ok(manifest), flasher, dir.path().join("fw.bin"));
    let (tx, _rx) = mpsc::unbounded_channel();
    let orchestrator = orchestrator_with(&dir, provisioner, tx);

    let devices = orchestrator.load_devices().await;

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, "m5stack-cardputer");
    assert_eq!(devices[0].category, "Boards");
}

#[tokio::test]
async fn test_load_devices_reports_fetch_failure_and_yields_empty_list() {
    let dir = TempDir::new().unwrap();
    let flasher = Arc::new(CapturingFlasher::default());
    let provisioner = provisioner_with(FakeSource::failing(), flasher, dir.path().join("fw.bin"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = orchestrator_with(&dir, provisioner, tx);

    let devices = orchestrator.load_devices().await;

    assert!(devices.is_empty());
    let lines = drain_lines(&mut rx);
    assert!(lines.iter().any(|l| l.starts_with("Error loading manifest")));
}

#[tokio::test]
async fn test_transcript_preserves_emission_order() {
    let dir = TempDir::new().unwrap();
    let flasher = Arc::new(CapturingFlasher::default());
    let provisioner = provisioner_with(
        FakeSource::ok(b"firmware"),
        flasher,
        dir.path().join("fw.bin"),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = orchestrator_with(&dir, provisioner, tx);

    orchestrator.flash_device("cardputer", 115200).await;
    while let Ok(event) = rx.try_recv() {
        orchestrator.observe(&event).await;
    }

    let transcript = orchestrator.transcript().await;
    let selected = transcript
        .iter()
        .position(|l| l == "> Selected device: cardputer")
        .unwrap();
    let flashing = transcript.iter().position(|l| l == "Flashing...").unwrap();
    let result = transcript.iter().position(|l| l == "Success").unwrap();
    assert!(selected < flashing && flashing < result);
}

#[tokio::test]
async fn test_run_saved_looks_up_by_name_and_reports_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let flasher = Arc::new(CapturingFlasher::default());
    let provisioner = provisioner_with(
        FakeSource::ok(b"firmware"),
        flasher,
        dir.path().join("fw.bin"),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = orchestrator_with(&dir, provisioner, tx);

    orchestrator
        .add_command(bruceflash::models::CustomCommand {
            id: "1".to_string(),
            name: "Reset".to_string(),
            command: "AT+RST".to_string(),
        })
        .await
        .unwrap();

    // Disconnected session: the lookup succeeds but the send degrades
    // to the no-port diagnostic.
    orchestrator.run_saved("Reset").await;
    orchestrator.run_saved("Nope").await;

    let lines = drain_lines(&mut rx);
    assert!(lines.iter().any(|l| l == "No port connected"));
    assert!(lines.iter().any(|l| l == "No saved command named Nope"));
}

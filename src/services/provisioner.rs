//! Firmware acquisition and flashing
//!
//! The provisioner downloads a device's firmware binary, stages it in
//! the cache directory and hands it to the external flashing tool. Both
//! collaborators sit behind traits (`FirmwareSource`, `Flasher`) so the
//! pipeline can be exercised with test doubles; the real implementations
//! use reqwest and a spawned `esptool` process with live-streamed
//! output.
//!
//! Nothing here propagates failures past the component boundary: every
//! anticipated problem is folded into the returned `FlashOutcome`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::config::{AppConfig, FirmwareConfig};
use crate::models::{AppEvent, FlashJob, FlashOutcome};

/// Source of firmware (and manifest) bytes.
#[async_trait]
pub trait FirmwareSource: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP firmware source with a bounded request timeout.
pub struct HttpFirmwareSource {
    client: reqwest::Client,
}

impl HttpFirmwareSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FirmwareSource for HttpFirmwareSource {
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("server rejected {}", url))?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("could not read body of {}", url))?;
        Ok(bytes.to_vec())
    }
}

/// External flashing tool. Forwards output lines as they arrive and
/// reports a `FlashOutcome` instead of erroring.
#[async_trait]
pub trait Flasher: Send + Sync {
    async fn flash(
        &self,
        args: &[String],
        events: &mpsc::UnboundedSender<AppEvent>,
    ) -> FlashOutcome;
}

/// Runs `esptool` (or whatever program the config names) as a
/// subprocess with stdout and stderr streamed line by line.
pub struct EsptoolFlasher {
    program: String,
}

impl EsptoolFlasher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Flasher for EsptoolFlasher {
    async fn flash(
        &self,
        args: &[String],
        events: &mpsc::UnboundedSender<AppEvent>,
    ) -> FlashOutcome {
        let _ = events.send(AppEvent::FlashOutput(format!(
            "Executing: {} {}",
            self.program,
            args.join(" ")
        )));

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                return FlashOutcome::Error(format!(
                    "{} (make sure '{}' is on PATH)",
                    err, self.program
                ));
            }
        };

        // Both pipes were requested above, so the handles are present.
        let stdout = child.stdout.take().unwrap();
        let stderr = child.stderr.take().unwrap();
        let stdout_task = stream_lines(stdout, events.clone());
        let stderr_task = stream_lines(stderr, events.clone());

        let status = match child.wait().await {
            Ok(status) => status,
            Err(err) => {
                return FlashOutcome::Error(format!("could not wait for flashing tool: {}", err));
            }
        };

        // Let the pipe readers drain before reporting the result so the
        // tool's last lines land ahead of it in the transcript.
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        match status.code() {
            Some(0) => FlashOutcome::Success,
            Some(code) => FlashOutcome::Failed(code),
            None => FlashOutcome::Error("flashing tool terminated by signal".to_string()),
        }
    }
}

fn stream_lines<R>(
    reader: R,
    events: mpsc::UnboundedSender<AppEvent>,
) -> tokio::task::JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buffer = String::new();
        loop {
            buffer.clear();
            match reader.read_line(&mut buffer).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = buffer.trim_end().to_string();
                    if events.send(AppEvent::FlashOutput(line)).is_err() {
                        break;
                    }
                }
                // An undecodable line is reported and skipped; the tool
                // keeps running and later lines still stream.
                Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                    let _ = events.send(AppEvent::FlashOutput(format!(
                        "could not decode tool output: {}",
                        err
                    )));
                }
                Err(err) => {
                    let _ = events.send(AppEvent::FlashOutput(format!(
                        "could not read tool output: {}",
                        err
                    )));
                    break;
                }
            }
        }
    })
}

/// Composes download, save and flash for one device.
pub struct FirmwareProvisioner {
    config: FirmwareConfig,
    source: Arc<dyn FirmwareSource>,
    flasher: Arc<dyn Flasher>,
    scratch_path: PathBuf,
}

impl FirmwareProvisioner {
    pub fn new(
        config: FirmwareConfig,
        source: Arc<dyn FirmwareSource>,
        flasher: Arc<dyn Flasher>,
    ) -> Self {
        let scratch_path = config.scratch_path();
        Self {
            config,
            source,
            flasher,
            scratch_path,
        }
    }

    /// Build a provisioner with the real HTTP source and esptool flasher.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let source = HttpFirmwareSource::new(Duration::from_secs(
            config.firmware.download_timeout_secs,
        ))?;
        let flasher = EsptoolFlasher::new(config.firmware.esptool_program.clone());
        Ok(Self::new(
            config.firmware.clone(),
            Arc::new(source),
            Arc::new(flasher),
        ))
    }

    /// Override the staging location for the downloaded binary.
    pub fn with_scratch_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_path = path.into();
        self
    }

    /// Fetch the device manifest as text.
    pub async fn fetch_manifest(&self, url: &str) -> Result<String> {
        let bytes = self.source.download(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Download the firmware for `device_id`, stage it and flash it.
    ///
    /// Short-circuits with an `Error` outcome if download or save fail;
    /// the flashing tool is never invoked without a staged file.
    pub async fn fetch_and_flash(
        &self,
        device_id: &str,
        baud_rate: u32,
        events: &mpsc::UnboundedSender<AppEvent>,
    ) -> FlashOutcome {
        let job = FlashJob {
            device_id: device_id.to_string(),
            firmware_url: self.config.firmware_url(device_id),
            local_path: self.scratch_path.clone(),
            tool_args: self.config.tool_args(baud_rate, &self.scratch_path),
        };
        log::debug!("Flash job: {:?}", job);

        let _ = events.send(AppEvent::FlashOutput(format!(
            "Downloading {}",
            job.firmware_url
        )));
        let data = match self.source.download(&job.firmware_url).await {
            Ok(data) => data,
            Err(err) => return FlashOutcome::Error(format!("download failed: {:#}", err)),
        };

        if let Err(err) = self.stage_firmware(&job.local_path, &data).await {
            return FlashOutcome::Error(format!("could not save firmware: {:#}", err));
        }
        let _ = events.send(AppEvent::FlashOutput(format!(
            "Downloaded to {}",
            job.local_path.display()
        )));

        let _ = events.send(AppEvent::FlashOutput("Flashing...".to_string()));
        self.flasher.flash(&job.tool_args, events).await
    }

    async fn stage_firmware(&self, path: &std::path::Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("could not create {}", parent.display()))?;
        }
        tokio::fs::write(path, data)
            .await
            .with_context(|| format!("could not write {}", path.display()))?;
        Ok(())
    }
}

//! Flash pipeline types

use std::fmt;
use std::path::PathBuf;

/// Terminal result of one flash attempt.
///
/// `Failed` carries the tool's exit code, `Error` covers everything that
/// kept the tool from running to completion (launch failure, download or
/// save failure). Display output keeps the wording users of the original
/// app know from the terminal view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashOutcome {
    Success,
    Failed(i32),
    Error(String),
}

impl FlashOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FlashOutcome::Success)
    }
}

impl fmt::Display for FlashOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashOutcome::Success => write!(f, "Success"),
            FlashOutcome::Failed(code) => write!(f, "Failed with exit code {}", code),
            FlashOutcome::Error(message) => write!(f, "Error: {}", message),
        }
    }
}

/// One firmware acquisition and flash run, built by the provisioner and
/// discarded after the result is reported. Not persisted.
#[derive(Debug, Clone)]
pub struct FlashJob {
    pub device_id: String,
    pub firmware_url: String,
    pub local_path: PathBuf,
    pub tool_args: Vec<String>,
}

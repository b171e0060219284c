//! Application events for communication between background workers and
//! the interactive layer

use crate::models::flash::FlashOutcome;

/// Events delivered from worker tasks to the interactive loop.
///
/// Every variant carrying a `String` is one transcript line. Workers
/// send events over an unbounded channel so nothing emitted before the
/// consumer starts draining is lost.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    // Serial session events
    SerialOutput(String), // bytes read from the wire, decoded as text
    SerialStatus(String), // connect/disconnect diagnostics and command echoes

    // Flash pipeline events
    FlashOutput(String),         // line from the flashing tool or pipeline
    FlashFinished(FlashOutcome), // terminal result of one fetch-and-flash run
}

impl AppEvent {
    /// The transcript line this event contributes.
    pub fn line(&self) -> String {
        match self {
            AppEvent::SerialOutput(line)
            | AppEvent::SerialStatus(line)
            | AppEvent::FlashOutput(line) => line.clone(),
            AppEvent::FlashFinished(outcome) => outcome.to_string(),
        }
    }
}

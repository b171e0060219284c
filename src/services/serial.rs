//! Serial session management
//!
//! One `SerialSession` owns at most one open serial port and the
//! background task reading from it. Everything the session has to say
//! (wire output, diagnostics, command echoes) is delivered as
//! `AppEvent`s over the channel supplied at construction, so the
//! interactive layer never blocks on serial I/O.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::models::AppEvent;

/// USB vendor id used by Espressif USB-serial bridges
pub const ESPRESSIF_USB_VID: u16 = 0x303a;

/// Read timeout of the background loop; also bounds how long
/// `disconnect()` can race with one final read.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

const READ_BUFFER_SIZE: usize = 1024;

/// Strategy for choosing which enumerated port to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelection {
    /// Open the given port name regardless of enumeration
    ByName(String),
    /// Pick the last enumerated port. Heuristic carried over from the
    /// original app: the USB device usually enumerates after the
    /// built-in ports. Not a correctness guarantee.
    LastEnumerated,
    /// Pick the first port whose USB vendor id matches
    FirstMatchingUsbVid(u16),
}

impl PortSelection {
    /// Pick a port name from an enumeration result.
    pub fn pick(&self, ports: &[SerialPortInfo]) -> Option<String> {
        match self {
            PortSelection::ByName(name) => Some(name.clone()),
            PortSelection::LastEnumerated => ports.last().map(|p| p.port_name.clone()),
            PortSelection::FirstMatchingUsbVid(vid) => ports
                .iter()
                .find(|p| matches!(&p.port_type, SerialPortType::UsbPort(usb) if usb.vid == *vid))
                .map(|p| p.port_name.clone()),
        }
    }
}

/// A serial connection with a background read loop.
///
/// At most one port is open per session; the port handle is `Some` iff
/// the session is connected. The read loop holds a clone of the handle
/// and exits when the stop flag is set or the port errors out.
pub struct SerialSession {
    events: mpsc::UnboundedSender<AppEvent>,
    selection: PortSelection,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
    stop: Option<Arc<AtomicBool>>,
}

impl SerialSession {
    pub fn new(
        events: mpsc::UnboundedSender<AppEvent>,
        selection: PortSelection,
        baud_rate: u32,
    ) -> Self {
        Self {
            events,
            selection,
            baud_rate,
            port: None,
            stop: None,
        }
    }

    pub fn connected(&self) -> bool {
        self.port.is_some()
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Enumerate ports, pick one per the selection strategy, open it and
    /// start the read loop. Every failure mode degrades to a status
    /// line; connecting while connected is reported, not an error.
    ///
    /// Must be called from within a tokio runtime (the read loop runs on
    /// the blocking pool).
    pub fn connect(&mut self) {
        if self.connected() {
            self.status("Already connected".to_string());
            return;
        }

        let ports = match serialport::available_ports() {
            Ok(ports) => ports,
            Err(err) => {
                self.status(format!("Port enumeration failed: {}", err));
                return;
            }
        };

        if ports.is_empty() {
            self.status("No serial ports found".to_string());
            return;
        }

        let names: Vec<&str> = ports.iter().map(|p| p.port_name.as_str()).collect();
        self.status(format!("Available ports: {}", names.join(", ")));

        let Some(name) = self.selection.pick(&ports) else {
            self.status("No serial ports found".to_string());
            return;
        };

        let port = match serialport::new(&name, self.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
        {
            Ok(port) => port,
            Err(err) => {
                self.status(format!("Failed to open {}: {}", name, err));
                return;
            }
        };

        // The read loop gets its own handle; reads and writes are
        // independent directions of the same underlying device.
        let reader = match port.try_clone() {
            Ok(reader) => reader,
            Err(err) => {
                self.status(format!("Failed to open {}: {}", name, err));
                return;
            }
        };

        self.status(format!("Connected to {} at {}", name, self.baud_rate));

        let stop = Arc::new(AtomicBool::new(false));
        let events = self.events.clone();
        let loop_stop = stop.clone();
        tokio::task::spawn_blocking(move || read_loop(reader, loop_stop, events));

        self.port = Some(port);
        self.stop = Some(stop);
    }

    /// Close the port and stop the read loop. Idempotent; reports
    /// "Disconnected" every time.
    pub fn disconnect(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.store(true, Ordering::Relaxed);
        }
        self.port = None;
        self.status("Disconnected".to_string());
    }

    /// Write `text` plus a newline to the port and echo it. Without a
    /// connected port this reports a diagnostic instead of failing.
    pub fn send_command(&mut self, text: &str) {
        let Some(port) = self.port.as_mut() else {
            self.status("No port connected".to_string());
            return;
        };

        let data = format!("{}\n", text);
        match port.write_all(data.as_bytes()).and_then(|_| port.flush()) {
            Ok(()) => self.status(format!("Sent: {}", text)),
            Err(err) => self.status(format!("Write failed: {}", err)),
        }
    }

    /// Update the stored baud rate and best-effort apply it to an open
    /// port. No reconnect required.
    pub fn set_baud_rate(&mut self, baud_rate: u32) {
        self.baud_rate = baud_rate;
        if let Some(port) = self.port.as_mut() {
            if let Err(err) = port.set_baud_rate(baud_rate) {
                log::warn!("Could not apply baud rate to open port: {}", err);
            }
        }
        self.status(format!("Baud rate set to {}", baud_rate));
    }

    fn status(&self, line: String) {
        let _ = self.events.send(AppEvent::SerialStatus(line));
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.store(true, Ordering::Relaxed);
        }
    }
}

/// Background read loop. Forwards every non-empty read as one
/// `SerialOutput` event; exits on the stop flag, a closed event channel,
/// or the first real I/O error. The session does not auto-reconnect.
fn read_loop(
    mut port: Box<dyn SerialPort>,
    stop: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<AppEvent>,
) {
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    while !stop.load(Ordering::Relaxed) {
        match port.read(&mut buffer) {
            Ok(0) => {}
            Ok(n) => {
                let text = String::from_utf8_lossy(&buffer[..n]).to_string();
                if events.send(AppEvent::SerialOutput(text)).is_err() {
                    break;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::TimedOut => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => {
                // A teardown racing the last read is not worth reporting.
                if !stop.load(Ordering::Relaxed) {
                    let _ = events.send(AppEvent::SerialStatus(format!("Read error: {}", err)));
                }
                break;
            }
        }
    }
    log::debug!("Serial read loop ended");
}

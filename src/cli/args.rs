//! Command line argument parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "bruceflash")]
#[command(about = "🔥 Bruce firmware installer and serial terminal for ESP32-class devices")]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease logging verbosity (only errors)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// List flashable devices from the remote manifest
    Devices,
    /// Download firmware for a device and flash it with esptool
    Flash {
        /// Manifest device id (e.g. m5stack-cardputer)
        device: String,
        /// Baud rate for the flashing tool (default from config, 115200)
        #[arg(short, long)]
        baud: Option<u32>,
    },
    /// Open an interactive serial terminal to the device
    Terminal {
        /// Serial port to open (e.g. /dev/ttyUSB0, COM3); defaults to
        /// the last enumerated port
        #[arg(short, long)]
        port: Option<String>,
        /// Baud rate (default from config, 115200)
        #[arg(short, long)]
        baud: Option<u32>,
        /// Prefer the first port with an Espressif USB vendor id
        #[arg(long)]
        espressif: bool,
    },
    /// Manage saved serial command shortcuts
    Cmd {
        #[command(subcommand)]
        action: CmdAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum CmdAction {
    /// Save a new command shortcut
    Add {
        /// Short label for the shortcut
        name: String,
        /// Text sent to the device when the shortcut runs
        command: String,
    },
    /// List saved command shortcuts
    List,
    /// Delete a command shortcut by id
    Remove { id: String },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

//! CLI command implementations

pub mod cmd;
pub mod devices;
pub mod flash;
pub mod terminal;

use crate::cli::args::Commands;
use anyhow::Result;

/// Execute a CLI command
pub async fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Devices => devices::execute_devices_command().await,
        Commands::Flash { device, baud } => {
            flash::execute_flash_command(&device, baud).await
        }
        Commands::Terminal {
            port,
            baud,
            espressif,
        } => terminal::execute_terminal_command(port, baud, espressif).await,
        Commands::Cmd { action } => cmd::execute_cmd_command(action).await,
    }
}

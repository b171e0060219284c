//! `cmd` command - manage saved serial command shortcuts

use anyhow::Result;

use crate::cli::args::CmdAction;
use crate::models::CustomCommand;
use crate::services::registry::CommandRegistry;

pub async fn execute_cmd_command(action: CmdAction) -> Result<()> {
    let mut registry = CommandRegistry::open(CommandRegistry::default_path())?;

    match action {
        CmdAction::Add { name, command } => {
            let id = chrono::Utc::now().timestamp_millis().to_string();
            registry.insert(CustomCommand {
                id: id.clone(),
                name: name.clone(),
                command,
            })?;
            println!("✅ Saved command '{}' (id {})", name, id);
        }
        CmdAction::List => {
            let commands = registry.list();
            if commands.is_empty() {
                println!("No saved commands");
                return Ok(());
            }
            println!("{:<16} {:<20} COMMAND", "ID", "NAME");
            for cmd in commands {
                println!("{:<16} {:<20} {}", cmd.id, cmd.name, cmd.command);
            }
        }
        CmdAction::Remove { id } => {
            registry.delete(&id)?;
            println!("Removed {} (no-op if it did not exist)", id);
        }
    }

    Ok(())
}

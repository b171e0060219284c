//! `terminal` command - interactive serial terminal
//!
//! Reads stdin lines and forwards them to the device; everything the
//! session emits is printed as it arrives. Lines starting with `:` are
//! terminal-local commands, everything else goes to the wire.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::services::orchestrator::SessionOrchestrator;
use crate::services::serial::{ESPRESSIF_USB_VID, PortSelection};

pub async fn execute_terminal_command(
    port: Option<String>,
    baud: Option<u32>,
    espressif: bool,
) -> Result<()> {
    let config = AppConfig::load()?;
    let baud_rate = baud.unwrap_or(config.serial.baud_rate);
    let selection = match port {
        Some(name) => PortSelection::ByName(name),
        None if espressif => PortSelection::FirstMatchingUsbVid(ESPRESSIF_USB_VID),
        None => PortSelection::LastEnumerated,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = SessionOrchestrator::new(&config, selection, baud_rate, tx)?;

    println!("Terminal ready... (:help for commands, :quit to exit)");
    orchestrator.connect().await;

    let stdin = BufReader::new(tokio::io::stdin());
    let mut input = stdin.lines();

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                orchestrator.observe(&event).await;
                println!("{}", event.line());
            }
            line = input.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if !handle_input(&orchestrator, line).await? {
                    break;
                }
            }
        }
    }

    orchestrator.disconnect().await;
    while let Ok(event) = rx.try_recv() {
        orchestrator.observe(&event).await;
        println!("{}", event.line());
    }

    Ok(())
}

/// Handle one line of user input. Returns false when the terminal
/// should exit.
async fn handle_input(orchestrator: &SessionOrchestrator, line: &str) -> Result<bool> {
    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        ":quit" | ":q" => return Ok(false),
        ":connect" => orchestrator.connect().await,
        ":disconnect" => orchestrator.disconnect().await,
        ":baud" => match rest.parse::<u32>() {
            Ok(rate) => orchestrator.set_baud_rate(rate).await,
            Err(_) => println!("Usage: :baud <rate>"),
        },
        ":cmds" => {
            let commands = orchestrator.saved_commands().await;
            if commands.is_empty() {
                println!("No saved commands (add one with `bruceflash cmd add`)");
            }
            for cmd in commands {
                println!("  {:<20} {}", cmd.name, cmd.command);
            }
        }
        ":run" => {
            if rest.is_empty() {
                println!("Usage: :run <name>");
            } else {
                orchestrator.run_saved(rest).await;
            }
        }
        ":help" => {
            println!(":connect / :disconnect  manage the serial connection");
            println!(":baud <rate>            change the baud rate");
            println!(":cmds                   list saved command shortcuts");
            println!(":run <name>             send a saved command");
            println!(":quit                   leave the terminal");
            println!("anything else is sent to the device verbatim");
        }
        _ => orchestrator.send_command(line).await,
    }

    Ok(true)
}

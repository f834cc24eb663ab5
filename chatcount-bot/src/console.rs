//! Console hotkeys: one command per stdin line.
//!
//! `+` / `-` go through the same mutation path as chat commands; the rest
//! drive the connection.

use std::io::BufRead;

use anyhow::Result;
use tokio::sync::mpsc;

use chatcount_sdk::client::ConnectionManager;
use chatcount_sdk::controller::CounterController;
use chatcount_sdk::ports::HotkeyPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Increment,
    Decrement,
    Show,
    Start,
    Restart,
    Stop,
    Quit,
    Help,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "+" | "inc" => Some(Self::Increment),
            "-" | "dec" => Some(Self::Decrement),
            "?" | "show" => Some(Self::Show),
            "start" => Some(Self::Start),
            "restart" => Some(Self::Restart),
            "stop" => Some(Self::Stop),
            "quit" | "exit" => Some(Self::Quit),
            "help" | "h" => Some(Self::Help),
            _ => None,
        }
    }
}

const HELP: &str = "commands: + - ? start restart stop quit";

/// Feed stdin lines from a plain thread. A blocking read on a runtime
/// thread would keep the runtime from shutting down after Ctrl-C.
pub fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run commands until `quit` or end of input.
pub async fn run(
    mut lines: mpsc::UnboundedReceiver<String>,
    manager: &ConnectionManager,
    controller: &CounterController,
) -> Result<()> {
    while let Some(line) = lines.recv().await {
        if line.trim().is_empty() {
            continue;
        }
        let Some(cmd) = ConsoleCommand::parse(&line) else {
            println!("unknown command {:?}; {HELP}", line.trim());
            continue;
        };
        match cmd {
            ConsoleCommand::Increment => controller.on_increment(),
            ConsoleCommand::Decrement => controller.on_decrement(),
            ConsoleCommand::Show => println!("{}", controller.display_text(controller.value())),
            ConsoleCommand::Start => manager.start()?,
            ConsoleCommand::Restart => manager.restart()?,
            ConsoleCommand::Stop => manager.shutdown()?,
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => return Ok(()),
        }
    }
    Ok(())
}

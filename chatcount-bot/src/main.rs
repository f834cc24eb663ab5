//! chatcount: keeps a stream counter in sync with chat commands and hotkeys.
//!
//! Connects to the chat server, watches one channel for the configured
//! triggers (default `!counter`, `!counter+`, `!counter-`) and updates the
//! counter, the overlay text and optionally answers in chat. The console
//! doubles as the hotkey facility:
//!
//!   +  /  -            increment / decrement
//!   ?                  show the current value
//!   start / restart    (re)connect
//!   stop               disconnect
//!   quit               disconnect, save the counter and exit

mod config;
mod console;
mod display;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chatcount_sdk::client::ConnectionManager;
use chatcount_sdk::controller::CounterController;
use chatcount_sdk::counter::CounterState;
use chatcount_sdk::event::Event;
use chatcount_sdk::ports::SettingsStore;

use crate::config::{Config, FileSettings, Overrides};
use crate::display::HostDisplay;

#[derive(Parser)]
#[command(name = "chatcount", about = "Chat-driven stream counter")]
struct Args {
    /// Config file (default: ~/.config/chatcount/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chat server address (host:port)
    #[arg(long)]
    server: Option<String>,

    /// Channel to watch
    #[arg(long)]
    channel: Option<String>,

    /// Bot login name
    #[arg(long)]
    nick: Option<String>,

    /// OAuth token (or set CHATCOUNT_TOKEN env var)
    #[arg(long, env = "CHATCOUNT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Don't connect until `start` is typed
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Use JSON logs when CHATCOUNT_LOG_JSON=1, human-readable otherwise
    let json_logs = std::env::var("CHATCOUNT_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chatcount=info,chatcount_sdk=info".into());
    if json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let args = Args::parse();
    let path = args.config.clone().unwrap_or_else(config::default_path);
    let file = Config::load(&path)?;
    let settings = Arc::new(FileSettings::new(
        path,
        file,
        Overrides {
            server: args.server,
            channel: args.channel,
            nick: args.nick,
            token: args.token,
        },
    ));
    let config = settings.effective();

    let counter = Arc::new(CounterState::new(settings.load_counter()));
    let display = Arc::new(HostDisplay::new(config.text_file.clone()));
    let controller = Arc::new(CounterController::new(
        counter,
        display,
        config.display_config(),
    ));

    let connect = config.connect_config();
    tracing::info!(
        server = %connect.server_addr,
        channel = %config.channel.as_deref().unwrap_or(""),
        value = controller.value(),
        "Starting chatcount"
    );

    let (manager, mut events) =
        ConnectionManager::spawn(connect, controller.clone(), settings.clone());

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            handle_event(event);
        }
    });

    if !args.offline {
        manager.start()?;
    }

    tokio::select! {
        result = console::run(console::stdin_lines(), &manager, &controller) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    manager.close().await?;
    settings.save_counter(controller.value());
    tracing::info!(value = controller.value(), "Counter saved, bye");
    Ok(())
}

fn handle_event(event: Event) {
    match event {
        Event::ServerNotice { text } if text.contains("authentication failed") => {
            tracing::error!("Login rejected; check the nick and token, then `restart`");
        }
        Event::Reconnect => {
            tracing::warn!("Server is going away; type `restart` to reconnect");
        }
        Event::Disconnected { reason } => {
            tracing::warn!(reason = %reason, "Connection closed; type `start` to reconnect");
        }
        other => tracing::debug!(event = ?other, "Event"),
    }
}

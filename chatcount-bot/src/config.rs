//! Persistent configuration for the chatcount bot.
//!
//! Config file lives at `~/.config/chatcount/config.toml` unless `--config`
//! points elsewhere. The same file is the settings store: the counter value
//! is written back to it on exit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use chatcount_sdk::client::{ConnectConfig, DEFAULT_SERVER};
use chatcount_sdk::controller::DisplayConfig;
use chatcount_sdk::ports::{Credentials, SettingsStore};
use chatcount_sdk::router::CommandBinding;

/// User configuration (persisted in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Chat server address (host:port). Default: irc.chat.twitch.tv:6667
    pub server: Option<String>,
    /// Channel to watch, with or without the leading `#`.
    pub channel: Option<String>,
    /// Bot login name.
    pub nick: Option<String>,
    /// OAuth token, with or without the `oauth:` prefix.
    pub token: Option<String>,
    /// Last saved counter value.
    pub counter: i64,
    /// Label shown before the value. Default: "Counter"
    pub counter_name: Option<String>,
    /// Overlay text element showing the counter.
    pub text_source: Option<String>,
    /// Also write the counter text to this file.
    pub text_file: Option<PathBuf>,
    /// Overlay media element played on increments.
    pub sound_source: Option<String>,
    pub sound_enabled: bool,
    /// Answer commands in chat. Default: true
    pub reply: Option<bool>,
    /// Minimum gap between chat replies. Default: 1500
    pub message_delay_ms: Option<u64>,
    /// Chat triggers. Defaults to `!counter`, `!counter+`, `!counter-`.
    pub bindings: Vec<CommandBinding>,
}

pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatcount")
        .join("config.toml")
}

impl Config {
    /// Load from `path`; a missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("can't read {}", path.display()))?;
        toml::from_str(&s).with_context(|| format!("bad config file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("can't create {}", dir.display()))?;
        }
        let s = toml::to_string_pretty(self).context("can't serialize config")?;
        std::fs::write(path, s).with_context(|| format!("can't write {}", path.display()))
    }

    pub fn connect_config(&self) -> ConnectConfig {
        let defaults = ConnectConfig::default();
        ConnectConfig {
            server_addr: self.server.clone().unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            reply: self.reply.unwrap_or(defaults.reply),
            message_delay: self
                .message_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.message_delay),
            ..defaults
        }
    }

    pub fn display_config(&self) -> DisplayConfig {
        let defaults = DisplayConfig::default();
        DisplayConfig {
            counter_name: self.counter_name.clone().unwrap_or(defaults.counter_name),
            text_source: self.text_source.clone().unwrap_or_default(),
            sound_source: self.sound_source.clone().filter(|s| !s.is_empty()),
            sound_enabled: self.sound_enabled,
        }
    }
}

/// Command-line values that take precedence over the file but are never
/// written back to it.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub channel: Option<String>,
    pub nick: Option<String>,
    pub token: Option<String>,
}

/// [`SettingsStore`] backed by the TOML config file.
pub struct FileSettings {
    path: PathBuf,
    file: Mutex<Config>,
    overrides: Overrides,
}

impl FileSettings {
    pub fn new(path: PathBuf, file: Config, overrides: Overrides) -> Self {
        Self {
            path,
            file: Mutex::new(file),
            overrides,
        }
    }

    /// The file contents with command-line overrides applied.
    pub fn effective(&self) -> Config {
        let mut config = self.file.lock().clone();
        let o = &self.overrides;
        if o.server.is_some() {
            config.server = o.server.clone();
        }
        if o.channel.is_some() {
            config.channel = o.channel.clone();
        }
        if o.nick.is_some() {
            config.nick = o.nick.clone();
        }
        if o.token.is_some() {
            config.token = o.token.clone();
        }
        config
    }
}

impl SettingsStore for FileSettings {
    fn load_counter(&self) -> i64 {
        self.file.lock().counter
    }

    fn save_counter(&self, value: i64) {
        let mut file = self.file.lock();
        file.counter = value;
        if let Err(e) = file.save(&self.path) {
            tracing::warn!(error = %e, "Can't save counter");
        }
    }

    fn load_bindings(&self) -> Vec<CommandBinding> {
        let bindings = self.file.lock().bindings.clone();
        if bindings.is_empty() {
            CommandBinding::defaults()
        } else {
            bindings
        }
    }

    fn load_credentials(&self) -> Credentials {
        let config = self.effective();
        Credentials {
            channel: config.channel.unwrap_or_default(),
            nick: config.nick.unwrap_or_default(),
            token: config.token.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatcount_sdk::router::Action;

    const SAMPLE: &str = r#"
channel = "somestreamer"
nick = "CountBot"
token = "abc"
counter = 41
counter_name = "Deaths"
text_source = "DeathText"
sound_source = "Bonk"
sound_enabled = true
message_delay_ms = 0

[[bindings]]
trigger = "!death"
action = "increment"

[[bindings]]
trigger = "!undeath"
action = "decrement"
"#;

    #[test]
    fn parses_file_with_bindings() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.counter, 41);
        assert_eq!(
            config.bindings,
            vec![
                CommandBinding::new("!death", Action::Increment),
                CommandBinding::new("!undeath", Action::Decrement),
            ]
        );
        let display = config.display_config();
        assert_eq!(display.counter_name, "Deaths");
        assert_eq!(display.sound_source.as_deref(), Some("Bonk"));
        assert_eq!(config.connect_config().message_delay, Duration::ZERO);
        assert_eq!(config.connect_config().server_addr, DEFAULT_SERVER);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.connect_config().reply);
    }

    #[test]
    fn bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "counter = \"many\"").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn empty_bindings_fall_back_to_defaults() {
        let settings = FileSettings::new(
            PathBuf::from("unused.toml"),
            Config::default(),
            Overrides::default(),
        );
        assert_eq!(settings.load_bindings(), CommandBinding::defaults());
    }

    #[test]
    fn overrides_win_but_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let file: Config = toml::from_str(SAMPLE).unwrap();
        let settings = FileSettings::new(
            path.clone(),
            file,
            Overrides {
                token: Some("from-env".into()),
                ..Default::default()
            },
        );

        assert_eq!(settings.load_credentials().token, "from-env");
        assert_eq!(settings.load_credentials().nick, "CountBot");

        settings.save_counter(42);
        let saved = Config::load(&path).unwrap();
        assert_eq!(saved.counter, 42);
        assert_eq!(saved.token.as_deref(), Some("abc"));
        assert_eq!(saved.bindings.len(), 2);
        assert_eq!(settings.load_counter(), 42);
    }
}

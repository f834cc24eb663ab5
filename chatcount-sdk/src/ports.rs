//! Interfaces to the collaborators outside the core: the on-screen display,
//! the persisted settings, and the hotkey facility.

use crate::router::CommandBinding;

/// Renders the counter. Implementations own every rendering failure; the
/// core never sees an error from here. Calls come from both the chat worker
/// and hotkey callers, so they must return promptly.
pub trait DisplayPort: Send + Sync {
    fn set_visible(&self, source: &str, visible: bool);
    fn set_text(&self, source: &str, text: &str);
    fn play_sound(&self, source: &str);
}

/// Chat login details.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub channel: String,
    pub nick: String,
    pub token: String,
}

impl Credentials {
    /// Normalize to what the server expects: lowercase nick, `#channel`,
    /// `oauth:` token.
    pub fn normalized(&self) -> Self {
        let nick = self.nick.trim().to_lowercase();
        let channel = self.channel.trim().to_lowercase();
        let channel = if channel.starts_with('#') {
            channel
        } else {
            format!("#{channel}")
        };
        let token = self.token.trim();
        let token = if token.is_empty() || token.starts_with("oauth:") {
            token.to_string()
        } else {
            format!("oauth:{token}")
        };
        Self {
            channel,
            nick,
            token,
        }
    }
}

/// Persisted settings. Read at startup and on every (re)connect; the counter
/// is written back on shutdown.
pub trait SettingsStore: Send + Sync {
    fn load_counter(&self) -> i64;
    fn save_counter(&self, value: i64);
    fn load_bindings(&self) -> Vec<CommandBinding>;
    fn load_credentials(&self) -> Credentials;
}

/// Entry points for an external key-binding facility.
pub trait HotkeyPort: Send + Sync {
    fn on_increment(&self);
    fn on_decrement(&self);
}

//! The single mutation path for the counter.
//!
//! Chat commands (from the connection worker) and hotkeys (from the host's
//! own thread) both land here, so the counter and the display always change
//! together.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::counter::CounterState;
use crate::ports::{DisplayPort, HotkeyPort};
use crate::router::Action;

/// How the counter is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Label shown before the value, e.g. `Deaths 3`.
    pub counter_name: String,
    /// Text element that shows the counter.
    pub text_source: String,
    /// Media element played when the counter goes up.
    pub sound_source: Option<String>,
    pub sound_enabled: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            counter_name: "Counter".to_string(),
            text_source: String::new(),
            sound_source: None,
            sound_enabled: false,
        }
    }
}

pub struct CounterController {
    counter: Arc<CounterState>,
    display: Arc<dyn DisplayPort>,
    config: DisplayConfig,
    /// Held across a mutation and its display update so renders land in
    /// the same order as the counter changes.
    update: Mutex<()>,
}

impl CounterController {
    pub fn new(
        counter: Arc<CounterState>,
        display: Arc<dyn DisplayPort>,
        config: DisplayConfig,
    ) -> Self {
        Self {
            counter,
            display,
            config,
            update: Mutex::new(()),
        }
    }

    pub fn value(&self) -> i64 {
        self.counter.get()
    }

    /// `"<counter name> <value>"`, used for both the display and chat replies.
    pub fn display_text(&self, value: i64) -> String {
        format!("{} {value}", self.config.counter_name)
    }

    /// Perform `action`. Returns the value to report back, or `None` for
    /// [`Action::Ignore`].
    pub fn apply(&self, action: Action) -> Option<i64> {
        match action {
            Action::Ignore => None,
            Action::Query => Some(self.counter.get()),
            Action::Increment => {
                let _guard = self.update.lock();
                let value = self.counter.increment();
                self.render(value, true);
                Some(value)
            }
            Action::Decrement => {
                let _guard = self.update.lock();
                let value = self.counter.decrement();
                self.render(value, false);
                Some(value)
            }
        }
    }

    fn render(&self, value: i64, increased: bool) {
        let text = self.display_text(value);
        tracing::debug!(value, text = %text, "Updating display");
        self.display.set_visible(&self.config.text_source, true);
        self.display.set_text(&self.config.text_source, &text);

        if increased
            && self.config.sound_enabled
            && let Some(ref sound) = self.config.sound_source
        {
            self.display.play_sound(sound);
        }
    }
}

impl HotkeyPort for CounterController {
    fn on_increment(&self) {
        self.apply(Action::Increment);
    }

    fn on_decrement(&self) {
        self.apply(Action::Decrement);
    }
}

//! Display port for the host process.
//!
//! The overlay itself lives elsewhere; this logs every display call and can
//! mirror the counter text into a file that an overlay text element reads.

use std::path::PathBuf;

use chatcount_sdk::ports::DisplayPort;

pub struct HostDisplay {
    text_file: Option<PathBuf>,
}

impl HostDisplay {
    pub fn new(text_file: Option<PathBuf>) -> Self {
        Self { text_file }
    }
}

impl DisplayPort for HostDisplay {
    fn set_visible(&self, source: &str, visible: bool) {
        tracing::debug!(source, visible, "Display visibility");
    }

    fn set_text(&self, source: &str, text: &str) {
        tracing::info!(source, text, "Display text");
        if let Some(ref path) = self.text_file
            && let Err(e) = std::fs::write(path, text)
        {
            tracing::warn!(path = %path.display(), error = %e, "Can't write counter text file");
        }
    }

    fn play_sound(&self, source: &str) {
        tracing::info!(source, "Play sound");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_mirrored_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.txt");
        let display = HostDisplay::new(Some(path.clone()));
        display.set_text("CounterText", "Deaths 3");
        display.set_text("CounterText", "Deaths 4");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Deaths 4");
    }

    #[test]
    fn unwritable_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let display = HostDisplay::new(Some(dir.path().join("missing").join("counter.txt")));
        display.set_text("CounterText", "Deaths 1");
        display.set_visible("CounterText", true);
        display.play_sound("Bonk");
    }
}

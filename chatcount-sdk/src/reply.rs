//! Outbound chat replies.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::client::ConnectionState;
use crate::error::ConnectionError;
use crate::irc::Message;

/// Tag that threads a reply under the message it answers.
pub const REPLY_TAG: &str = "reply-parent-msg-id";

/// Build a `PRIVMSG` to `channel`, tagged as a reply when `in_reply_to` is set.
/// Line breaks in `text` are flattened so the reply stays one frame.
pub fn reply_message(channel: &str, text: &str, in_reply_to: Option<&str>) -> Message {
    let text = text.replace(['\r', '\n'], " ");
    let mut msg = Message::new("PRIVMSG").with_param(channel).with_trailing(&text);
    if let Some(id) = in_reply_to {
        msg = msg.with_tag(REPLY_TAG, id);
    }
    msg
}

/// Sends replies to the configured channel, keeping at least `min_interval`
/// between consecutive sends.
#[derive(Debug)]
pub struct ReplySender {
    channel: String,
    min_interval: Duration,
    last_sent: Option<Instant>,
}

impl ReplySender {
    pub fn new(channel: &str, min_interval: Duration) -> Self {
        Self {
            channel: channel.to_string(),
            min_interval,
            last_sent: None,
        }
    }

    pub async fn reply<W>(
        &mut self,
        writer: &mut W,
        state: ConnectionState,
        text: &str,
        in_reply_to: Option<&str>,
    ) -> Result<(), ConnectionError>
    where
        W: AsyncWrite + Unpin,
    {
        if state != ConnectionState::Connected {
            return Err(ConnectionError::NotConnected);
        }
        if let Some(last) = self.last_sent {
            tokio::time::sleep_until(last + self.min_interval).await;
        }

        let frame = reply_message(&self.channel, text, in_reply_to).to_frame();
        writer
            .write_all(frame.as_bytes())
            .await
            .map_err(ConnectionError::Transmit)?;
        writer.flush().await.map_err(ConnectionError::Transmit)?;
        self.last_sent = Some(Instant::now());
        tracing::debug!(channel = %self.channel, reply_to = ?in_reply_to, "Sent reply");
        Ok(())
    }
}

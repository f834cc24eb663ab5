//! Answers server liveness checks.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::ConnectionError;
use crate::irc::Message;

/// The `PONG` for a `PING`, or `None` for anything else.
///
/// The payload is the trailing body, falling back to the first parameter.
/// A `PING` with no payload at all gets an empty one.
pub fn pong_for(msg: &Message) -> Option<Message> {
    if msg.command != "PING" {
        return None;
    }
    let payload = msg
        .trailing
        .as_deref()
        .or(msg.params.first().map(String::as_str))
        .unwrap_or("");
    Some(Message::new("PONG").with_trailing(payload))
}

/// If `msg` is a `PING`, write the matching `PONG` right away and return its
/// payload. The caller must not pass the frame on when this returns `Some`.
pub async fn answer<W>(msg: &Message, writer: &mut W) -> Result<Option<String>, ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    let Some(pong) = pong_for(msg) else {
        return Ok(None);
    };
    writer
        .write_all(pong.to_frame().as_bytes())
        .await
        .map_err(ConnectionError::Transmit)?;
    writer.flush().await.map_err(ConnectionError::Transmit)?;
    tracing::trace!(payload = ?pong.trailing, "Answered PING");
    Ok(pong.trailing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ping_gets_exactly_one_pong() {
        let mut out = Vec::new();
        let msg = Message::parse("PING :tmi.twitch.tv");
        let payload = answer(&msg, &mut out).await.unwrap();
        assert_eq!(payload.as_deref(), Some("tmi.twitch.tv"));
        assert_eq!(String::from_utf8(out).unwrap(), "PONG :tmi.twitch.tv\r\n");
    }

    #[tokio::test]
    async fn other_frames_are_untouched() {
        let mut out = Vec::new();
        let msg = Message::parse(":a!a@h PRIVMSG #c :PING");
        assert!(answer(&msg, &mut out).await.unwrap().is_none());
        assert!(out.is_empty());
    }

    #[test]
    fn ping_without_payload_gets_empty_pong() {
        let pong = pong_for(&Message::parse("PING")).unwrap();
        assert_eq!(pong.to_frame(), "PONG :\r\n");
    }

    #[test]
    fn ping_with_positional_payload() {
        let pong = pong_for(&Message::parse("PING irc.example.net")).unwrap();
        assert_eq!(pong.to_string(), "PONG :irc.example.net");
    }
}

//! IRC frame parsing and serialization, with IRCv3 message tags.
//!
//! Frame grammar:
//!
//! ```text
//! [@tag=value;tag=value ] [:prefix ] COMMAND [param ...] [ :trailing body]
//! ```
//!
//! The trailing body starts after the *first* `" :"` following the command,
//! so bodies containing colons (URLs, timestamps) survive intact.

use std::collections::HashMap;
use std::fmt;

/// Line terminator used on the wire.
pub const LINE_TERMINATOR: &str = "\r\n";

/// One parsed protocol frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    /// Uppercased command token. Empty when the frame could not be parsed.
    pub command: String,
    /// Positional parameters, not including the trailing body.
    pub params: Vec<String>,
    pub trailing: Option<String>,
}

impl Message {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, param: &str) -> Self {
        self.params.push(param.to_string());
        self
    }

    pub fn with_trailing(mut self, body: &str) -> Self {
        self.trailing = Some(body.to_string());
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Parse a single frame. Never fails: garbage yields a message with an
    /// empty command, which every consumer treats as a no-op.
    pub fn parse(raw: &str) -> Self {
        let mut msg = Message::default();
        let mut rest = raw.trim_end_matches(['\r', '\n']);

        if let Some(tagged) = rest.strip_prefix('@') {
            let (tag_str, remainder) = tagged.split_once(' ').unwrap_or((tagged, ""));
            msg.tags = parse_tags(tag_str);
            rest = remainder.trim_start_matches(' ');
        }

        if let Some(prefixed) = rest.strip_prefix(':') {
            let (prefix, remainder) = prefixed.split_once(' ').unwrap_or((prefixed, ""));
            if !prefix.is_empty() {
                msg.prefix = Some(prefix.to_string());
            }
            rest = remainder.trim_start_matches(' ');
        }

        // A body with no command in front of it is not a frame.
        if rest.starts_with(':') {
            return msg;
        }

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, body)) => (head, Some(body)),
            None => (rest, None),
        };
        msg.trailing = trailing.map(str::to_string);

        let mut words = head.split_whitespace();
        msg.command = words
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or_default();
        msg.params = words.map(str::to_string).collect();
        msg
    }

    /// Nick portion of the prefix (`nick!user@host` → `nick`).
    pub fn sender_nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .and_then(|p| p.split('!').next())
            .filter(|n| !n.is_empty())
    }

    /// The server-assigned message id (`id` tag).
    pub fn id(&self) -> Option<&str> {
        self.tags.get("id").map(String::as_str).filter(|id| !id.is_empty())
    }

    /// Whether the sender carries moderator status.
    ///
    /// True when the `mod` tag is literally `1`, or the sender has the
    /// broadcaster badge.
    pub fn is_moderator(&self) -> bool {
        if self.tags.get("mod").is_some_and(|v| v == "1") {
            return true;
        }
        self.tags
            .get("badges")
            .is_some_and(|b| b.split(',').any(|badge| badge.starts_with("broadcaster/")))
    }

    /// Serialize as a complete wire frame, including the line terminator.
    pub fn to_frame(&self) -> String {
        format!("{self}{LINE_TERMINATOR}")
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            let mut keys: Vec<&String> = self.tags.keys().collect();
            keys.sort();
            f.write_str("@")?;
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    f.write_str(";")?;
                }
                let value = &self.tags[key];
                if value.is_empty() {
                    f.write_str(key)?;
                } else {
                    write!(f, "{key}={}", escape_tag_value(value))?;
                }
            }
            f.write_str(" ")?;
        }
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;
        for param in &self.params {
            write!(f, " {param}")?;
        }
        if let Some(ref body) = self.trailing {
            write!(f, " :{body}")?;
        }
        Ok(())
    }
}

fn parse_tags(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter(|t| !t.is_empty())
        .map(|tag| match tag.split_once('=') {
            Some((k, v)) => (k.to_string(), unescape_tag_value(v)),
            None => (tag.to_string(), String::new()),
        })
        .collect()
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ';' => out.push_str("\\:"),
            ' ' => out.push_str("\\s"),
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_privmsg() {
        let msg = Message::parse("@id=abc123;mod=1 :alice!alice@x PRIVMSG #chan :!counter+\r\n");
        assert_eq!(msg.tags.get("id").map(String::as_str), Some("abc123"));
        assert_eq!(msg.tags.get("mod").map(String::as_str), Some("1"));
        assert_eq!(msg.prefix.as_deref(), Some("alice!alice@x"));
        assert_eq!(msg.sender_nick(), Some("alice"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#chan"]);
        assert_eq!(msg.trailing.as_deref(), Some("!counter+"));
        assert!(msg.is_moderator());
        assert_eq!(msg.id(), Some("abc123"));
    }

    #[test]
    fn tags_recovered_regardless_of_order() {
        let a = Message::parse("@a=1;b=2;c=3 PING :x");
        let b = Message::parse("@c=3;a=1;b=2 PING :x");
        assert_eq!(a.tags, b.tags);
        assert_eq!(a.tags.len(), 3);
        assert_eq!(a.tags["b"], "2");
    }

    #[test]
    fn trailing_keeps_internal_colons() {
        let msg = Message::parse(":bob!b@h PRIVMSG #chan :see https://example.com:8080/a:b");
        assert_eq!(
            msg.trailing.as_deref(),
            Some("see https://example.com:8080/a:b")
        );
    }

    #[test]
    fn trailing_keeps_later_delimiters() {
        let msg = Message::parse("PRIVMSG #chan :a :b :c");
        assert_eq!(msg.params, vec!["#chan"]);
        assert_eq!(msg.trailing.as_deref(), Some("a :b :c"));
    }

    #[test]
    fn ping_without_prefix() {
        let msg = Message::parse("PING :tmi.twitch.tv");
        assert_eq!(msg.command, "PING");
        assert!(msg.params.is_empty());
        assert_eq!(msg.trailing.as_deref(), Some("tmi.twitch.tv"));
    }

    #[test]
    fn no_trailing_body() {
        let msg = Message::parse(":nick!u@h JOIN #chan");
        assert_eq!(msg.command, "JOIN");
        assert_eq!(msg.params, vec!["#chan"]);
        assert!(msg.trailing.is_none());
    }

    #[test]
    fn empty_trailing_body() {
        let msg = Message::parse("PRIVMSG #chan :");
        assert_eq!(msg.trailing.as_deref(), Some(""));
    }

    #[test]
    fn malformed_frames_have_empty_command() {
        for raw in ["", "   ", "@only=tags", ":prefix.only", ":prefix :body only", "\r\n"] {
            let msg = Message::parse(raw);
            assert!(msg.command.is_empty(), "expected no command for {raw:?}, got {msg:?}");
        }
    }

    #[test]
    fn command_is_uppercased() {
        assert_eq!(Message::parse("ping :x").command, "PING");
    }

    #[test]
    fn tag_without_value_and_escapes() {
        let msg = Message::parse(r"@flag;note=a\sb\:c\\d PRIVMSG #c :hi");
        assert_eq!(msg.tags["flag"], "");
        assert_eq!(msg.tags["note"], r"a b;c\d");
    }

    #[test]
    fn moderator_flag_is_literal() {
        assert!(!Message::parse("@mod=0 PRIVMSG #c :x").is_moderator());
        assert!(!Message::parse("PRIVMSG #c :x").is_moderator());
        let broadcaster = "@badges=broadcaster/1,subscriber/0;mod=0 PRIVMSG #c :x";
        assert!(Message::parse(broadcaster).is_moderator());
    }

    #[test]
    fn server_prefix_nick() {
        let msg = Message::parse(":tmi.twitch.tv 001 bot :Welcome, GLHF!");
        assert_eq!(msg.sender_nick(), Some("tmi.twitch.tv"));
        assert_eq!(msg.command, "001");
        assert_eq!(msg.params, vec!["bot"]);
    }

    #[test]
    fn display_produces_parseable_frame() {
        let msg = Message::new("PRIVMSG")
            .with_tag("reply-parent-msg-id", "abc123")
            .with_tag("note", "two words")
            .with_param("#chan")
            .with_trailing("Counter 6");
        let text = msg.to_string();
        assert_eq!(
            text,
            r"@note=two\swords;reply-parent-msg-id=abc123 PRIVMSG #chan :Counter 6"
        );
        assert_eq!(Message::parse(&text), msg);
        assert!(msg.to_frame().ends_with("\r\n"));
    }
}

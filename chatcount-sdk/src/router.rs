//! Maps chat messages onto counter actions.

use serde::{Deserialize, Serialize};

use crate::irc::Message;

/// What a chat command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Query,
    Increment,
    Decrement,
    Ignore,
}

/// A configured trigger string and the action it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBinding {
    pub trigger: String,
    pub action: Action,
}

impl CommandBinding {
    pub fn new(trigger: &str, action: Action) -> Self {
        Self {
            trigger: trigger.to_string(),
            action,
        }
    }

    /// `!counter`, `!counter+`, `!counter-`.
    pub fn defaults() -> Vec<CommandBinding> {
        vec![
            CommandBinding::new("!counter", Action::Query),
            CommandBinding::new("!counter+", Action::Increment),
            CommandBinding::new("!counter-", Action::Decrement),
        ]
    }
}

/// Routes `PRIVMSG` bodies to actions. Built once per connection from the
/// current bindings and read-only afterwards.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    own_nick: String,
    bindings: Vec<CommandBinding>,
}

impl CommandRouter {
    pub fn new(own_nick: &str, bindings: Vec<CommandBinding>) -> Self {
        let bindings = bindings
            .into_iter()
            .filter(|b| !b.trigger.trim().is_empty())
            .collect();
        Self {
            own_nick: own_nick.to_string(),
            bindings,
        }
    }

    pub fn bindings(&self) -> &[CommandBinding] {
        &self.bindings
    }

    /// First binding whose trigger equals the trimmed body, ignoring case.
    /// Messages from our own nick, non-`PRIVMSG` frames and unmatched bodies
    /// all yield [`Action::Ignore`].
    pub fn route(&self, msg: &Message) -> Action {
        if msg
            .sender_nick()
            .is_some_and(|nick| nick.eq_ignore_ascii_case(&self.own_nick))
        {
            return Action::Ignore;
        }
        if msg.command != "PRIVMSG" {
            return Action::Ignore;
        }
        let Some(body) = msg.trailing.as_deref() else {
            return Action::Ignore;
        };
        let body = body.trim();
        self.bindings
            .iter()
            .find(|b| b.trigger.trim().to_lowercase() == body.to_lowercase())
            .map(|b| b.action)
            .unwrap_or(Action::Ignore)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> CommandRouter {
        CommandRouter::new("CountBot", CommandBinding::defaults())
    }

    fn privmsg(nick: &str, body: &str) -> Message {
        Message::parse(&format!(":{nick}!{nick}@host PRIVMSG #chan :{body}"))
    }

    #[test]
    fn matches_case_insensitively() {
        assert_eq!(router().route(&privmsg("alice", "!COUNTER+")), Action::Increment);
        assert_eq!(router().route(&privmsg("alice", "!Counter-")), Action::Decrement);
        assert_eq!(router().route(&privmsg("alice", "!counter")), Action::Query);
    }

    #[test]
    fn match_is_exact_not_substring() {
        assert_eq!(router().route(&privmsg("alice", "!counter+extra")), Action::Ignore);
        assert_eq!(router().route(&privmsg("alice", "say !counter+")), Action::Ignore);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(router().route(&privmsg("alice", "  !counter+ ")), Action::Increment);
    }

    #[test]
    fn own_messages_are_ignored() {
        assert_eq!(router().route(&privmsg("countbot", "!counter+")), Action::Ignore);
        assert_eq!(router().route(&privmsg("COUNTBOT", "!counter")), Action::Ignore);
    }

    #[test]
    fn non_chat_commands_are_ignored() {
        let notice = Message::parse(":alice!a@h NOTICE #chan :!counter+");
        assert_eq!(router().route(&notice), Action::Ignore);
        let ping = Message::parse("PING :!counter+");
        assert_eq!(router().route(&ping), Action::Ignore);
        assert_eq!(router().route(&Message::default()), Action::Ignore);
    }

    #[test]
    fn first_matching_binding_wins() {
        let router = CommandRouter::new(
            "bot",
            vec![
                CommandBinding::new("!c", Action::Decrement),
                CommandBinding::new("!C", Action::Increment),
            ],
        );
        assert_eq!(router.route(&privmsg("alice", "!c")), Action::Decrement);
    }

    #[test]
    fn blank_triggers_are_dropped() {
        let router = CommandRouter::new("bot", vec![CommandBinding::new("  ", Action::Increment)]);
        assert!(router.bindings().is_empty());
        assert_eq!(router.route(&privmsg("alice", "")), Action::Ignore);
    }
}

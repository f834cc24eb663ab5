//! Events emitted by the connection manager for the host to consume.

use crate::client::ConnectionState;
use crate::router::Action;

/// Things the host may want to log or show. Delivery is best-effort: the
/// read loop never waits on a full event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The connection state changed.
    State(ConnectionState),

    /// The server accepted our login (`001`). `nick` is the confirmed nick.
    Registered {
        nick: String,
    },

    /// A `PING` was answered with this payload.
    PingAnswered {
        payload: String,
    },

    /// A chat command was applied to the counter.
    Command {
        from: String,
        text: String,
        action: Action,
        value: i64,
        /// Informational only; no command is restricted to moderators.
        moderator: bool,
    },

    /// Server `NOTICE`, e.g. a login failure.
    ServerNotice {
        text: String,
    },

    /// The server asked us to reconnect. We do not do so on our own.
    Reconnect,

    /// The session ended.
    Disconnected {
        reason: String,
    },
}

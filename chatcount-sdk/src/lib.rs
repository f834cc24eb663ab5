//! chatcount-sdk: the connection, protocol and command-dispatch core of a
//! chat-driven counter.
//!
//! A [`client::ConnectionManager`] keeps one socket session to an IRC-style
//! chat server (Twitch TMI flavoured), answers `PING`s, and routes chat
//! commands into a shared [`counter::CounterState`] through a
//! [`controller::CounterController`]. Rendering and settings persistence live
//! behind the traits in [`ports`].

pub mod client;
pub mod controller;
pub mod counter;
pub mod error;
pub mod event;
pub mod frame;
pub mod irc;
pub mod keepalive;
pub mod ports;
pub mod reply;
pub mod router;

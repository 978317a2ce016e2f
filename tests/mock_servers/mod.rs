//! Mock servers for client integration testing
//!
//! Simulates an MPD server over TCP (and Unix sockets), so the client's
//! reconnect and command mapping can be tested without a real server.

#![allow(dead_code)]

pub mod mpd;

pub use mpd::MockMpdServer;

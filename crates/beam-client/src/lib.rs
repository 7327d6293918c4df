//! beam-client library crate.
//!
//! Connection lifecycle management for a networked projector that exposes two
//! independent WebSocket endpoints:
//!
//! ```text
//! Presentation layer (CLI, GUI — out of scope)
//!         ↕  connect / disconnect / send_command / send_file + state/status accessors
//! [beam-client]
//!   ├── config/      ClientConfig: host, ports, upload path, TOML persistence
//!   ├── channel/     The two managers: CommandChannel and UploadChannel
//!   └── transport/   Transport/FrameSink trait seam
//!         ├── ws     tokio-tungstenite implementation (the real thing)
//!         └── mock   scriptable in-memory transport for tests
//!         ↕
//! Projector  ws://host:8080 (commands)   ws://host:8081/video (media upload)
//! ```
//!
//! # Design
//!
//! Each manager exclusively owns at most one live socket handle and a pair of
//! observable values (a state enum and a one-line status message). All state
//! transitions happen inside the manager's own handlers — the consumer only
//! ever reads through accessors and calls the four operations. The two
//! managers share nothing: a command-channel disconnect never cancels an
//! in-flight upload, and vice versa.
//!
//! There is no automatic retry or reconnection anywhere in this crate; every
//! recovery is a fresh, caller-initiated operation.

/// Configuration: host/port settings and TOML persistence.
pub mod config;

/// The two connection managers and their error taxonomy.
pub mod channel;

/// The socket abstraction the managers are written against.
pub mod transport;

pub use channel::{ChannelError, CommandChannel, UploadChannel};
pub use config::ClientConfig;

//! The two connection managers.
//!
//! [`CommandChannel`] owns the text command/status connection;
//! [`UploadChannel`] owns the lazily-created binary media connection. They
//! are driven by the same [`ClientConfig`](crate::config::ClientConfig) but
//! share no state: their lifecycles, handles, and failures are fully
//! independent, and their completions may interleave arbitrarily.
//!
//! Both follow the same ownership discipline: one async mutex guards the
//! manager's state enum, status line, and (at most one) live socket handle.
//! Transitions happen only inside the manager's own operations and its
//! reader task; consumers read through accessors. An epoch counter
//! invalidates the reader task of a superseded connection, which makes
//! teardown idempotent — a remote close racing a local `disconnect` releases
//! the handle exactly once, whichever side wins.
//!
//! Errors never escape a manager as a fault: they land in the state enum and
//! the status text, and the operations additionally return them to the
//! caller. Nothing here retries; recovery is always a fresh caller-initiated
//! operation.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::transport::TransportError;

pub mod command;
pub mod upload;

pub use command::CommandChannel;
pub use upload::UploadChannel;

/// Error taxonomy of both channel managers.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Malformed host/port/path. Raised synchronously, before any socket is
    /// touched.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A command or payload was issued with no open handle.
    #[error("no connection to projector")]
    NotConnected,

    /// Handshake refusal, mid-session reset, or a failed send.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The upload payload could not be materialized into memory.
    #[error("could not read upload payload from {path}: {source}")]
    UploadRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

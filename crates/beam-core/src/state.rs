//! Observable channel states.
//!
//! Each connection manager in `beam-client` owns exactly one of these values
//! and mutates it only from its own event handlers; the presentation layer
//! reads it through an accessor. The two state machines are independent — a
//! command-channel disconnect never touches the upload state, and vice versa.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the command channel.
///
/// ```text
/// Idle → Connecting → Connected → {Disconnected, Error}
///          ↑______________________________|
/// ```
///
/// `Disconnected` and `Error` are both re-enterable into `Connecting` via a
/// fresh `connect()` call; there is no automatic retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection has been attempted yet.
    Idle,
    /// A handshake is in flight.
    Connecting,
    /// The channel is open; commands may be sent.
    Connected,
    /// The channel was closed, either locally or by the device.
    Disconnected,
    /// The last attempt or session failed; the handle has been discarded.
    Error,
}

impl ConnectionState {
    /// Whether commands may be sent in this state.
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Whether a fresh `connect()` would start a new handshake rather than
    /// being deduplicated against one already in flight.
    pub fn can_connect(self) -> bool {
        matches!(
            self,
            ConnectionState::Idle | ConnectionState::Disconnected | ConnectionState::Error
        )
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of the upload channel.
///
/// ```text
/// Idle → Connecting → Uploading → Completed
///             |______________________→ Error
/// ```
///
/// A failed handshake goes straight from `Connecting` to `Error` — the
/// `Uploading` state is only ever entered on an open channel. `Completed` is
/// reached when the channel closes after a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    /// No transfer has been attempted yet.
    Idle,
    /// The upload-endpoint handshake is in flight.
    Connecting,
    /// The payload is being (or has been) handed to the transport.
    Uploading,
    /// The channel closed after a successful send.
    Completed,
    /// Reading or sending the payload failed; the handle has been discarded.
    Error,
}

impl UploadState {
    /// Whether a transfer is currently in flight.
    pub fn is_uploading(self) -> bool {
        matches!(self, UploadState::Connecting | UploadState::Uploading)
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UploadState::Idle => "idle",
            UploadState::Connecting => "connecting",
            UploadState::Uploading => "uploading",
            UploadState::Completed => "completed",
            UploadState::Error => "error",
        };
        f.write_str(s)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connected_state_allows_sending() {
        assert!(ConnectionState::Connected.is_connected());
        for state in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Disconnected,
            ConnectionState::Error,
        ] {
            assert!(!state.is_connected(), "{state} must not allow sending");
        }
    }

    #[test]
    fn test_error_and_disconnected_are_reenterable() {
        // Both terminal states must admit a fresh connect() call.
        assert!(ConnectionState::Disconnected.can_connect());
        assert!(ConnectionState::Error.can_connect());
        assert!(ConnectionState::Idle.can_connect());
    }

    #[test]
    fn test_connecting_and_connected_dedupe_connect() {
        assert!(!ConnectionState::Connecting.can_connect());
        assert!(!ConnectionState::Connected.can_connect());
    }

    #[test]
    fn test_upload_in_flight_states() {
        assert!(UploadState::Connecting.is_uploading());
        assert!(UploadState::Uploading.is_uploading());
        assert!(!UploadState::Idle.is_uploading());
        assert!(!UploadState::Completed.is_uploading());
        assert!(!UploadState::Error.is_uploading());
    }

    #[test]
    fn test_display_strings_are_lowercase() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(UploadState::Completed.to_string(), "completed");
    }
}

//! Integration tests for the two channel managers.
//!
//! # Purpose
//!
//! These tests exercise [`CommandChannel`] and [`UploadChannel`] through
//! their *public* API, the same way the `beamctl` binary uses them, with the
//! scriptable mock transport standing in for the device. They verify the
//! load-bearing guarantees of the connection lifecycle:
//!
//! - At most one live socket handle per manager, ever — across reconnects,
//!   failures, and races.
//! - Concurrent `connect` calls collapse into a single handshake.
//! - A send with no open handle fails without touching the transport.
//! - The status line is last-write-wins with no history.
//! - A failed upload handshake never reports an upload in progress.
//! - A remote close racing a local disconnect releases the handle exactly
//!   once, whichever side wins.
//! - The two channels are fully independent: a failure on one leaves the
//!   other untouched.

use std::sync::Arc;
use std::time::Duration;

use beam_client::config::ClientConfig;
use beam_client::transport::mock::MockTransport;
use beam_client::{ChannelError, CommandChannel, UploadChannel};
use beam_core::{ConnectionState, ProjectorCommand, UploadState};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn command_channel() -> (CommandChannel, MockTransport) {
    let transport = MockTransport::new();
    let channel = CommandChannel::new(ClientConfig::default(), Arc::new(transport.clone()));
    (channel, transport)
}

fn upload_channel() -> (UploadChannel, MockTransport) {
    let transport = MockTransport::new();
    let channel = UploadChannel::new(ClientConfig::default(), Arc::new(transport.clone()));
    (channel, transport)
}

// Reader-task transitions are asynchronous, so assertions on them poll with
// a ~1s grace window.

async fn wait_for_command_state(channel: &CommandChannel, state: ConnectionState) {
    for _ in 0..100 {
        if channel.state().await == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "command channel never reached {state}; last was {}",
        channel.state().await
    );
}

async fn wait_for_upload_state(channel: &UploadChannel, state: UploadState) {
    for _ in 0..100 {
        if channel.state().await == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "upload channel never reached {state}; last was {}",
        channel.state().await
    );
}

async fn wait_for_status(channel: &CommandChannel, status: &str) {
    for _ in 0..100 {
        if channel.status_message().await == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "status never became {status:?}; last was {:?}",
        channel.status_message().await
    );
}

async fn wait_for_no_live_links(transport: &MockTransport) {
    for _ in 0..100 {
        if transport.live_links() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("a link was never released ({} still live)", transport.live_links());
}

// ── Handle uniqueness ─────────────────────────────────────────────────────────

/// A full connect / disconnect / reconnect cycle must never hold two live
/// handles at once, and must end with the old handle released.
#[tokio::test]
async fn test_reconnect_cycle_never_overlaps_handles() {
    let (channel, transport) = command_channel();

    channel.connect().await;
    channel.disconnect().await;
    channel.connect().await;
    channel.disconnect().await;
    channel.connect().await;

    assert_eq!(transport.connect_calls(), 3);
    assert_eq!(transport.live_links(), 1);
    assert_eq!(
        transport.max_live_links(),
        1,
        "two handles must never be live at once"
    );
}

/// Two tasks calling `connect` while the handshake is held open must produce
/// exactly one handshake; the loser observes the in-flight attempt and backs
/// off.
#[tokio::test]
async fn test_concurrent_connects_collapse_into_one_handshake() {
    let (channel, transport) = command_channel();
    let channel = Arc::new(channel);
    transport.hold_connects();

    // First connect parks inside the held handshake.
    let first = {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move { channel.connect().await })
    };
    wait_for_command_state(&channel, ConnectionState::Connecting).await;

    // Second connect must return immediately without a second handshake.
    channel.connect().await;

    transport.release_connect();
    first.await.expect("connect task panicked");

    assert_eq!(channel.state().await, ConnectionState::Connected);
    assert_eq!(transport.connect_calls(), 1, "dedupe must prevent a second handshake");
    assert_eq!(transport.max_live_links(), 1);
}

/// A disconnect issued while the handshake is still in flight supersedes it:
/// the handle arriving afterwards is released, never installed.
#[tokio::test]
async fn test_disconnect_during_handshake_discards_the_late_handle() {
    let (channel, transport) = command_channel();
    let channel = Arc::new(channel);
    transport.hold_connects();

    let connect = {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move { channel.connect().await })
    };
    wait_for_command_state(&channel, ConnectionState::Connecting).await;

    channel.disconnect().await;
    assert_eq!(channel.state().await, ConnectionState::Disconnected);

    // Let the handshake complete; its handle must be released on arrival.
    transport.release_connect();
    connect.await.expect("connect task panicked");

    assert_eq!(channel.state().await, ConnectionState::Disconnected);
    wait_for_no_live_links(&transport).await;
}

// ── Send gating and status ────────────────────────────────────────────────────

/// A command issued with no open handle fails locally; the transport is
/// never consulted.
#[tokio::test]
async fn test_send_without_handle_fails_without_transport_traffic() {
    let (channel, transport) = command_channel();

    let result = channel.send_command(&ProjectorCommand::brightness(50)).await;

    assert!(matches!(result, Err(ChannelError::NotConnected)));
    assert_eq!(transport.connect_calls(), 0);

    // Same after an explicit disconnect.
    channel.connect().await;
    channel.disconnect().await;
    let result = channel.send_command(&ProjectorCommand::brightness(50)).await;
    assert!(matches!(result, Err(ChannelError::NotConnected)));
}

/// The status line is a single mutable slot: each inbound message replaces
/// the previous one wholesale.
#[tokio::test]
async fn test_status_is_last_write_wins() {
    let (channel, transport) = command_channel();
    channel.connect().await;

    let device = transport.last_link();
    device.push_text("lamp warming up").await;
    device.push_text("lamp ready").await;

    wait_for_status(&channel, "Device message: lamp ready").await;
}

// ── Upload lifecycle ──────────────────────────────────────────────────────────

/// A refused upload handshake reports `Error`, not an upload in progress,
/// and leaves no handle behind.
#[tokio::test]
async fn test_refused_upload_handshake_is_an_error_not_an_upload() {
    let (channel, transport) = upload_channel();
    transport.fail_next_connect();

    let result = channel.send_payload(vec![0; 32]).await;

    assert!(matches!(result, Err(ChannelError::Transport(_))));
    assert_eq!(channel.state().await, UploadState::Error);
    assert!(!channel.is_uploading().await);
    assert_eq!(transport.live_links(), 0);
}

/// The device closing the upload channel mid-transfer completes the upload
/// and releases the handle; the next transfer gets a fresh connection.
#[tokio::test]
async fn test_upload_completion_releases_the_handle() {
    let (channel, transport) = upload_channel();

    channel.send_payload(vec![7; 128]).await.expect("send");
    assert!(channel.is_uploading().await);

    transport.last_link().close().await;
    wait_for_upload_state(&channel, UploadState::Completed).await;
    assert_eq!(transport.live_links(), 0);

    channel.send_payload(vec![8; 128]).await.expect("second send");
    assert_eq!(transport.connect_calls(), 2);
    assert_eq!(transport.max_live_links(), 1);
}

// ── Teardown races ────────────────────────────────────────────────────────────

/// A remote close arriving together with a local disconnect must converge on
/// one released handle and a `Disconnected` state, with no double-release.
#[tokio::test]
async fn test_remote_close_racing_local_disconnect_releases_once() {
    for _ in 0..20 {
        let (channel, transport) = command_channel();
        channel.connect().await;

        let device = transport.last_link();
        let closer = tokio::spawn(async move { device.close().await });
        channel.disconnect().await;
        closer.await.expect("closer panicked");

        // Give the reader task time to observe the event (or find itself
        // superseded) before asserting.
        wait_for_no_live_links(&transport).await;
        assert_eq!(channel.state().await, ConnectionState::Disconnected);
    }
}

// ── Channel independence ──────────────────────────────────────────────────────

/// The two managers share nothing: killing the command connection leaves a
/// running upload untouched, and vice versa.
#[tokio::test]
async fn test_channels_fail_independently() {
    let transport = MockTransport::new();
    let command = CommandChannel::new(ClientConfig::default(), Arc::new(transport.clone()));
    let upload = UploadChannel::new(ClientConfig::default(), Arc::new(transport.clone()));

    command.connect().await;
    let command_link = transport.last_link();
    upload.send_payload(vec![1; 64]).await.expect("send");

    // Kill the command connection only.
    command_link.fail("connection reset").await;
    wait_for_command_state(&command, ConnectionState::Error).await;

    // The upload is still in progress and still completes normally.
    assert_eq!(upload.state().await, UploadState::Uploading);
    transport.last_link().close().await;
    wait_for_upload_state(&upload, UploadState::Completed).await;
    assert_eq!(command.state().await, ConnectionState::Error);
}

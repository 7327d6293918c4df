//! beamctl — projector remote control, entry point.
//!
//! A small command-line front end over the two channel managers: it sends
//! control commands over the text channel, pushes media files over the
//! binary upload channel, and can sit and watch device status traffic.
//!
//! # Usage
//!
//! ```text
//! beamctl [OPTIONS] <COMMAND>
//!
//! Commands:
//!   send    Send one control command (e.g. `beamctl send brightness 75`)
//!   upload  Upload a media file to the projector
//!   watch   Connect and print status traffic until interrupted
//!
//! Options:
//!   --host         <HOST>  Projector address [default: from config file]
//!   --control-port <PORT>  Command channel port
//!   --upload-port  <PORT>  Upload channel port
//!   --save-config          Persist the effective settings to the config file
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable            | Description               |
//! |---------------------|---------------------------|
//! | `BEAM_HOST`         | Projector hostname or IP  |
//! | `BEAM_CONTROL_PORT` | Command channel port      |
//! | `BEAM_UPLOAD_PORT`  | Upload channel port       |
//!
//! Settings not given on the command line or in the environment come from the
//! platform config file, falling back to built-in defaults.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use beam_core::{ConnectionState, ProjectorCommand, UploadState};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use beam_client::config::{self, ClientConfig};
use beam_client::transport::{Transport, WsTransport};
use beam_client::{CommandChannel, UploadChannel};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote control client for a networked projector.
#[derive(Debug, Parser)]
#[command(
    name = "beamctl",
    about = "Remote control and media upload for a networked projector",
    version
)]
struct Cli {
    /// Projector hostname or IP address.
    #[arg(long, env = "BEAM_HOST")]
    host: Option<String>,

    /// Port of the text command/status channel.
    #[arg(long, env = "BEAM_CONTROL_PORT")]
    control_port: Option<u16>,

    /// Port of the binary media-upload channel.
    #[arg(long, env = "BEAM_UPLOAD_PORT")]
    upload_port: Option<u16>,

    /// Persist the effective settings to the platform config file.
    #[arg(long)]
    save_config: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Send one control command over the command channel.
    ///
    /// The command is given in the device's own vocabulary, e.g.
    /// `brightness 75`, `pattern checkerboard`, `factory reset`.
    Send {
        /// The command words, exactly as the device expects them.
        #[arg(required = true)]
        command: Vec<String>,
    },

    /// Upload a media file over the binary upload channel.
    ///
    /// The command channel is connected first as a reachability check; the
    /// upload itself runs over its own independent connection.
    Upload {
        /// Path of the media file to upload.
        file: PathBuf,

        /// Seconds to wait for the device to confirm the upload.
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Connect to the command channel and print status traffic until
    /// interrupted with Ctrl+C.
    Watch,
}

impl Cli {
    /// Merges the CLI overrides into the config loaded from disk.
    fn apply_to(&self, config: &mut ClientConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.control_port {
            config.control_port = port;
        }
        if let Some(port) = self.upload_port {
            config.upload_port = port;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Settings precedence: CLI args > environment > config file > defaults.
    // clap's `env = …` attributes cover the first two layers.
    let mut config = config::load_config().context("failed to load configuration")?;
    cli.apply_to(&mut config);

    // `RUST_LOG` wins over the configured log level when set.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    if cli.save_config {
        config::save_config(&config).context("failed to save configuration")?;
        info!("configuration saved to {}", config::config_file_path()?.display());
    }

    // Coerce to the trait object once; everything downstream clones this.
    let transport: Arc<dyn Transport> = Arc::new(WsTransport::new());

    match cli.action {
        Action::Send { command } => run_send(config, transport, &command.join(" ")).await,
        Action::Upload { file, timeout } => {
            run_upload(config, transport, &file, Duration::from_secs(timeout)).await
        }
        Action::Watch => run_watch(config, transport).await,
    }
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// Connects, sends one command, and reports the resulting status line.
async fn run_send(
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    raw: &str,
) -> anyhow::Result<()> {
    // Parse before connecting so a typo never costs a handshake.
    let command: ProjectorCommand = raw
        .parse()
        .with_context(|| format!("unrecognized command {raw:?}"))?;

    let channel = CommandChannel::new(config, transport);
    channel.connect().await;
    if channel.state().await != ConnectionState::Connected {
        bail!(
            "could not connect to the projector: {}",
            channel.status_message().await
        );
    }
    channel.send_command(&command).await?;

    println!("{}", channel.status_message().await);
    channel.disconnect().await;
    Ok(())
}

/// Uploads one file, first confirming the device is reachable over the
/// command channel.
async fn run_upload(
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    file: &PathBuf,
    timeout: Duration,
) -> anyhow::Result<()> {
    // Reachability gate: the upload channel accepts connections even when the
    // device is in a bad state, so a quick command-channel round trip is the
    // cheapest way to confirm the projector is actually up.
    let control = CommandChannel::new(config.clone(), Arc::clone(&transport));
    control.connect().await;
    if control.state().await != ConnectionState::Connected {
        bail!(
            "projector is not reachable, refusing to start upload: {}",
            control.status_message().await
        );
    }

    let upload = UploadChannel::new(config, transport);
    upload.send_file(file).await?;
    println!("{}", upload.status_message().await);

    // The device signals completion by closing the upload channel.
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match upload.state().await {
            UploadState::Completed => break,
            UploadState::Error => {
                control.disconnect().await;
                bail!("upload failed: {}", upload.status_message().await);
            }
            _ if tokio::time::Instant::now() >= deadline => {
                control.disconnect().await;
                bail!("timed out waiting for the device to confirm the upload");
            }
            _ => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }

    println!("{}", upload.status_message().await);
    control.disconnect().await;
    Ok(())
}

/// Connects and prints every status change until Ctrl+C.
async fn run_watch(config: ClientConfig, transport: Arc<dyn Transport>) -> anyhow::Result<()> {
    let channel = CommandChannel::new(config, transport);
    channel.connect().await;
    if channel.state().await != ConnectionState::Connected {
        bail!(
            "could not connect to the projector: {}",
            channel.status_message().await
        );
    }
    println!("{}", channel.status_message().await);

    let mut last = channel.status_message().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, disconnecting");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                let status = channel.status_message().await;
                if status != last {
                    println!("{status}");
                    last = status;
                }
                if channel.state().await == ConnectionState::Disconnected {
                    println!("connection closed by the device");
                    break;
                }
                if channel.state().await == ConnectionState::Error {
                    bail!("connection lost: {}", channel.status_message().await);
                }
            }
        }
    }

    channel.disconnect().await;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_send_collects_command_words() {
        let cli = Cli::parse_from(["beamctl", "send", "brightness", "75"]);
        match cli.action {
            Action::Send { command } => assert_eq!(command, vec!["brightness", "75"]),
            other => panic!("expected Send, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_send_requires_a_command() {
        assert!(Cli::try_parse_from(["beamctl", "send"]).is_err());
    }

    #[test]
    fn test_cli_upload_takes_a_file_path() {
        let cli = Cli::parse_from(["beamctl", "upload", "/tmp/clip.mp4"]);
        match cli.action {
            Action::Upload { file, timeout } => {
                assert_eq!(file, PathBuf::from("/tmp/clip.mp4"));
                assert_eq!(timeout, 60);
            }
            other => panic!("expected Upload, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_upload_timeout_override() {
        let cli = Cli::parse_from(["beamctl", "upload", "clip.mp4", "--timeout", "5"]);
        match cli.action {
            Action::Upload { timeout, .. } => assert_eq!(timeout, 5),
            other => panic!("expected Upload, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_overrides_replace_config_fields() {
        let cli = Cli::parse_from([
            "beamctl",
            "--host",
            "192.168.1.50",
            "--control-port",
            "9000",
            "watch",
        ]);
        let mut config = ClientConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.host, "192.168.1.50");
        assert_eq!(config.control_port, 9000);
        // Untouched fields keep their configured values.
        assert_eq!(config.upload_port, 8081);
    }

    #[test]
    fn test_cli_without_overrides_leaves_config_untouched() {
        let cli = Cli::parse_from(["beamctl", "watch"]);
        let mut config = ClientConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_cli_rejects_non_numeric_port() {
        assert!(Cli::try_parse_from(["beamctl", "--control-port", "abc", "watch"]).is_err());
    }
}

//! # beam-core
//!
//! Shared library for beamctl containing the channel state machines and the
//! projector command vocabulary.
//!
//! This crate is pure domain logic: it has zero dependencies on sockets,
//! async runtimes, or UI frameworks, which keeps the state machines and the
//! wire encoding trivially testable.
//!
//! The projector exposes two independent WebSocket endpoints:
//!
//! - **Command channel** – short lowercase text commands
//!   (`"brightness 75"`, `"factory reset"`, …) plus device status text
//!   flowing back. Modeled by [`ProjectorCommand`] and [`ConnectionState`].
//! - **Upload channel** – one binary media payload per transfer.
//!   Modeled by [`UploadState`].
//!
//! The managers that own the live connections live in `beam-client`; this
//! crate only defines what their observable states and wire payloads are.

pub mod command;
pub mod state;

// Re-export the most-used types at the crate root so callers can write
// `beam_core::ConnectionState` instead of `beam_core::state::ConnectionState`.
pub use command::{Page, ParseCommandError, ProjectorCommand, TestPattern};
pub use state::{ConnectionState, UploadState};

//! Hearth Devices — input drivers and the headless host for hearth-core.
//!
//! This crate:
//! - Implements the core's device traits for concrete hardware
//!   ([`BusMouse`]) and for prepared scripts ([`ScriptedPointer`],
//!   [`ScriptedKeyboard`]).
//! - Runs the poll loop and applies the core's [`ServerAction`]s
//!   ([`HeadlessBackend`]).
//!
//! **No port I/O or host policy leaks into `hearth-core`.**
//!
//! [`ServerAction`]: hearth_core::ServerAction

pub mod backend;
pub mod bus_mouse;
pub mod scripted;

pub use backend::{HeadlessBackend, HostStats, Portrait};
pub use bus_mouse::{BusMouse, PortIo};
pub use scripted::{ScriptedKeyboard, ScriptedPointer};

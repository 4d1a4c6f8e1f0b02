//! Error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::ClientId;
use crate::event::Key;
use crate::window::WindowId;

/// Errors raised by core operations.
///
/// None of these is fatal; the worst outcome is a dropped event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("event pool exhausted")]
    AllocationFailure,
    #[error("window {0} not found")]
    WindowNotFound(WindowId),
    #[error("client {0} not connected")]
    ClientNotFound(ClientId),
    #[error("key {0:?} already grabbed exclusively")]
    AlreadyGrabbed(Key),
    #[error("{0} read failed")]
    DeviceFailure(DeviceKind),
    #[error("termination requested")]
    TerminationRequested,
}

impl CoreError {
    /// Code used when this failure is reported to a client. Termination is
    /// not reported.
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::AllocationFailure => Some(ErrorCode::MallocFailed),
            Self::WindowNotFound(_) => Some(ErrorCode::BadWindowId),
            Self::ClientNotFound(_) => Some(ErrorCode::BadClientId),
            Self::AlreadyGrabbed(_) => Some(ErrorCode::KeyAlreadyGrabbed),
            Self::DeviceFailure(DeviceKind::Pointer) => Some(ErrorCode::MouseError),
            Self::DeviceFailure(DeviceKind::Keyboard) => Some(ErrorCode::KeyboardError),
            Self::TerminationRequested => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Pointer,
    Keyboard,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pointer => f.write_str("pointer"),
            Self::Keyboard => f.write_str("keyboard"),
        }
    }
}

/// Code carried by error records queued to a client.
///
/// Device read failures reach clients only this way; polling continues on
/// the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MallocFailed,
    BadWindowId,
    BadClientId,
    MouseError,
    KeyboardError,
    KeyAlreadyGrabbed,
}

impl ErrorCode {
    /// Allocation failures are never queued: queueing would allocate again.
    pub const fn is_allocation_failure(self) -> bool {
        matches!(self, Self::MallocFailed)
    }

    pub const fn describe(self) -> &'static str {
        match self {
            Self::MallocFailed => "out of server memory",
            Self::BadWindowId => "bad window id",
            Self::BadClientId => "bad client id",
            Self::MouseError => "mouse read error",
            Self::KeyboardError => "keyboard read error",
            Self::KeyAlreadyGrabbed => "key already grabbed",
        }
    }
}

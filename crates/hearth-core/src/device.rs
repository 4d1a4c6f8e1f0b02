//! Input device contract.
//!
//! Drivers implement [`PointerDevice`] or [`KeyboardDevice`]. Every method is
//! non-blocking: `poll` answers whether new state is ready and `read` returns
//! [`DeviceRead::NoData`] rather than waiting.

use thiserror::Error;

use crate::config::{PointerConfig, DEFAULT_SCALE, DEFAULT_THRESHOLD};
use crate::event::Key;
use crate::state::{Buttons, Modifiers};

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no {0} present")]
    NotPresent(&'static str),
    #[error("failed to open {device}: {reason}")]
    Open { device: &'static str, reason: String },
}

/// Result of a device read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRead<T> {
    Data(T),
    NoData,
    /// Hard failure; polling continues next cycle.
    Failed,
    /// The device asked for server shutdown (keyboards only).
    Quit,
}

/// One pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerReading {
    /// Position in screen coordinates (touch screens, tablets).
    Absolute { x: i32, y: i32, buttons: Buttons },
    /// Movement since the previous sample (mice).
    Relative { dx: i32, dy: i32, buttons: Buttons },
}

impl PointerReading {
    pub const fn buttons(&self) -> Buttons {
        match *self {
            Self::Absolute { buttons, .. } | Self::Relative { buttons, .. } => buttons,
        }
    }
}

/// One key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyReading {
    pub key: Key,
    pub modifiers: Modifiers,
    pub scancode: u16,
    pub pressed: bool,
}

pub trait PointerDevice {
    fn open(&mut self, config: &PointerConfig) -> Result<(), DeviceError>;
    fn close(&mut self);
    /// Buttons this device can report.
    fn button_info(&self) -> Buttons {
        Buttons::LEFT | Buttons::MIDDLE | Buttons::RIGHT
    }
    /// Default `(scale, threshold)` acceleration for this device.
    fn default_accel(&self) -> (i32, i32) {
        (DEFAULT_SCALE, DEFAULT_THRESHOLD)
    }
    fn poll(&mut self) -> bool;
    fn read(&mut self) -> DeviceRead<PointerReading>;
}

pub trait KeyboardDevice {
    fn open(&mut self) -> Result<(), DeviceError>;
    fn close(&mut self);
    fn poll(&mut self) -> bool;
    fn read(&mut self) -> DeviceRead<KeyReading>;
}

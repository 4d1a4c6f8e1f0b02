//! Polling bus mouse.
//!
//! The mouse sits behind an 8255 parallel interface. Movement counters are
//! latched and read four bits at a time; button lines are active low. Port
//! access goes through [`PortIo`] so the driver can run against real ports
//! or a test double.

use tracing::{debug, info};

use hearth_core::config::PointerConfig;
use hearth_core::device::{DeviceError, DeviceRead, PointerDevice, PointerReading};
use hearth_core::state::Buttons;

const PORT_INPUT: u16 = 0x7FD9;
const PORT_OUTPUT: u16 = 0x7FDD;
const PORT_CONTROL: u16 = 0x7FDF;

/// Hold and clear the counters while reading.
const HOLD_CLEAR: u8 = 0x80;
const SELECT_X_LOW: u8 = 0x00;
const SELECT_X_HIGH: u8 = 0x20;
const SELECT_Y_LOW: u8 = 0x40;
const SELECT_Y_HIGH: u8 = 0x60;
/// Port A and B input, port C high output, port C low input.
const CONTROL_WORD: u8 = 0x93;

const LINE_LEFT: u8 = 0x80;
const LINE_RIGHT: u8 = 0x20;
const BUTTON_LINES: u8 = 0xE0;

const SCALE: i32 = 3;
const THRESHOLD: i32 = 5;

/// Byte-wide I/O port access.
pub trait PortIo {
    fn inb(&mut self, port: u16) -> u8;
    fn outb(&mut self, port: u16, value: u8);
}

#[derive(Debug)]
pub struct BusMouse<P> {
    io: P,
    x_count: u8,
    y_count: u8,
    lines: u8,
    previous_lines: u8,
}

impl<P: PortIo> BusMouse<P> {
    pub const fn new(io: P) -> Self {
        Self {
            io,
            x_count: 0,
            y_count: 0,
            lines: 0,
            previous_lines: 0,
        }
    }

    pub fn into_inner(self) -> P {
        self.io
    }

    fn read_nibble(&mut self, select: u8) -> u8 {
        self.io.outb(PORT_OUTPUT, HOLD_CLEAR | select);
        self.io.inb(PORT_INPUT) & 0x0F
    }

    fn read_lines(&mut self) -> u8 {
        (self.io.inb(PORT_INPUT) & BUTTON_LINES) ^ BUTTON_LINES
    }
}

/// Counter byte as a signed delta.
const fn signed_delta(count: u8) -> i32 {
    count as i8 as i32
}

impl<P: PortIo> PointerDevice for BusMouse<P> {
    fn open(&mut self, config: &PointerConfig) -> Result<(), DeviceError> {
        if config.port == "none" {
            return Err(DeviceError::NotPresent("bus mouse"));
        }
        self.io.outb(PORT_CONTROL, CONTROL_WORD);
        self.lines = 0;
        self.previous_lines = 0;
        info!("bus mouse opened on {}", config.port);
        Ok(())
    }

    fn close(&mut self) {
        debug!("bus mouse closed");
    }

    fn button_info(&self) -> Buttons {
        Buttons::LEFT | Buttons::RIGHT
    }

    fn default_accel(&self) -> (i32, i32) {
        (SCALE, THRESHOLD)
    }

    fn poll(&mut self) -> bool {
        self.x_count = self.read_nibble(SELECT_X_LOW) | (self.read_nibble(SELECT_X_HIGH) << 4);
        self.y_count = self.read_nibble(SELECT_Y_LOW) | (self.read_nibble(SELECT_Y_HIGH) << 4);
        self.lines = self.read_lines();
        self.io.outb(PORT_OUTPUT, 0x00);

        if self.x_count != 0 || self.y_count != 0 || self.lines != self.previous_lines {
            self.previous_lines = self.lines;
            return true;
        }
        false
    }

    fn read(&mut self) -> DeviceRead<PointerReading> {
        let dx = signed_delta(self.x_count);
        let dy = signed_delta(self.y_count);

        // Sample the buttons again in case poll was skipped.
        self.lines = self.read_lines();
        self.previous_lines = self.lines;

        let mut buttons = Buttons::empty();
        if self.lines & LINE_LEFT != 0 {
            buttons |= Buttons::LEFT;
        }
        if self.lines & LINE_RIGHT != 0 {
            buttons |= Buttons::RIGHT;
        }
        DeviceRead::Data(PointerReading::Relative { dx, dy, buttons })
    }
}

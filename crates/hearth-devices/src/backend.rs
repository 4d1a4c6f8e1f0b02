//! Headless host: owns the core and the input devices and runs the poll
//! loop without any display attached.

use anyhow::{Context, Result};
use tracing::{debug, info, trace, warn};

use hearth_core::config::Config;
use hearth_core::device::{DeviceError, KeyboardDevice, PointerDevice};
use hearth_core::{CoreError, EventCore, ServerAction};

/// Distance from a screen edge, in pixels, that selects a portrait mode.
const PORTRAIT_EDGE: i32 = 5;

/// Screen orientation chosen from the pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Portrait {
    #[default]
    Normal,
    Left,
    Right,
    Down,
}

impl Portrait {
    /// Orientation implied by a pointer parked against a screen edge.
    pub const fn from_pointer(x: i32, y: i32, width: u32, height: u32) -> Self {
        if x >= width as i32 - PORTRAIT_EDGE {
            Self::Right
        } else if x <= PORTRAIT_EDGE {
            Self::Left
        } else if y >= height as i32 - PORTRAIT_EDGE {
            Self::Down
        } else {
            Self::Normal
        }
    }
}

/// What the host did with the actions it received, for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub iterations: u64,
    pub screensaver_resets: u64,
    pub cursor: Option<(i32, i32)>,
    pub redraws: u64,
}

pub struct HeadlessBackend {
    /// The device-agnostic core.
    pub core: EventCore,
    pointer: Option<Box<dyn PointerDevice>>,
    keyboard: Box<dyn KeyboardDevice>,
    pub portrait: Portrait,
    pub stats: HostStats,
}

impl HeadlessBackend {
    /// Open both devices and build the core. A missing pointer is allowed;
    /// any other device failure is an error. Acceleration the config leaves
    /// unset comes from the pointer.
    pub fn new(
        mut config: Config,
        mut pointer: Box<dyn PointerDevice>,
        mut keyboard: Box<dyn KeyboardDevice>,
    ) -> Result<Self> {
        let pointer = match pointer.open(&config.pointer) {
            Ok(()) => {
                config.pointer.seed_accel(pointer.default_accel());
                info!("Pointer open, buttons {:?}", pointer.button_info());
                Some(pointer)
            }
            Err(DeviceError::NotPresent(what)) => {
                warn!("No {what}, running without a pointer");
                None
            }
            Err(e) => return Err(e).context("Failed to open pointer device"),
        };
        keyboard.open().context("Failed to open keyboard device")?;

        Ok(Self {
            core: EventCore::new(config),
            pointer,
            keyboard,
            portrait: Portrait::default(),
            stats: HostStats::default(),
        })
    }

    /// Run one poll iteration. Returns whether either device produced
    /// input, or [`CoreError::TerminationRequested`] once shutdown was asked
    /// for.
    pub fn run_once(&mut self) -> Result<bool, CoreError> {
        self.stats.iterations += 1;

        let mut busy = false;
        if let Some(pointer) = self.pointer.as_deref_mut() {
            busy |= self.core.check_pointer(pointer);
        }
        busy |= self.core.check_keyboard(self.keyboard.as_mut());

        let actions = self.core.take_actions();
        self.apply_actions(&actions);

        if self.core.should_exit {
            return Err(CoreError::TerminationRequested);
        }
        Ok(busy)
    }

    /// Apply a list of core actions to the host.
    pub fn apply_actions(&mut self, actions: &[ServerAction]) {
        for action in actions {
            match *action {
                ServerAction::ResetScreenSaver => {
                    trace!("Screen saver timer reset");
                    self.stats.screensaver_resets += 1;
                }
                ServerAction::MoveCursor { x, y } => {
                    // In a real host: draw the cursor sprite here
                    trace!("Cursor at {x},{y}");
                    self.stats.cursor = Some((x, y));
                }
                ServerAction::PortraitFromPointer { x, y } => {
                    let screen = &self.core.config.screen;
                    let portrait = Portrait::from_pointer(x, y, screen.width, screen.height);
                    if portrait != self.portrait {
                        info!("Portrait mode {:?} -> {:?}", self.portrait, portrait);
                        self.portrait = portrait;
                        self.core.deliver_portrait_changed();
                    }
                }
                ServerAction::RedrawScreen => {
                    debug!("Redraw requested");
                    self.stats.redraws += 1;
                }
                ServerAction::Terminate => {
                    info!("Exit requested by core");
                }
            }
        }
    }

    /// Poll until both devices go quiet, shutdown is requested, or
    /// `max_iterations` is reached.
    pub fn run(&mut self, max_iterations: Option<u64>) -> Result<()> {
        info!("Starting Hearth (headless)");
        loop {
            if max_iterations.is_some_and(|max| self.stats.iterations >= max) {
                warn!("Stopping after {} iterations", self.stats.iterations);
                break;
            }
            match self.run_once() {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Devices idle");
                    break;
                }
                Err(CoreError::TerminationRequested) => break,
                Err(e) => return Err(e).context("Poll iteration failed"),
            }
        }
        self.close();
        info!("Hearth shutdown complete");
        Ok(())
    }

    fn close(&mut self) {
        if let Some(pointer) = self.pointer.as_deref_mut() {
            pointer.close();
        }
        self.keyboard.close();
    }
}

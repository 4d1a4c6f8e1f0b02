//! Process-wide input status.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::window::WindowId;

/// Geometry of a rectangular region in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x
            && x < self.x + self.width as i32
            && y >= self.y
            && y < self.y + self.height as i32
    }

    /// True when `other` lies entirely inside `self`.
    pub const fn encloses(self, other: Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width as i32 <= self.x + self.width as i32
            && other.y + other.height as i32 <= self.y + self.height as i32
    }

    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

bitflags! {
    /// Pointer buttons.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Buttons: u8 {
        const RIGHT       = 0b0000_0001;
        const MIDDLE      = 0b0000_0010;
        const LEFT        = 0b0000_0100;
        const SCROLL_UP   = 0b0010_0000;
        const SCROLL_DOWN = 0b0100_0000;
    }
}

impl Buttons {
    pub const SCROLL: Self = Self::SCROLL_UP.union(Self::SCROLL_DOWN);
}

bitflags! {
    /// Keyboard modifiers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u16 {
        const SHIFT     = 0b0000_0001;
        const CTRL      = 0b0000_0010;
        const ALT       = 0b0000_0100;
        const META      = 0b0000_1000;
        const CAPS_LOCK = 0b0001_0000;
        const NUM_LOCK  = 0b0010_0000;
    }
}

/// Pointer and keyboard tracking.
#[derive(Debug, Clone)]
pub struct InputState {
    pub cursor: (i32, i32),
    pub buttons: Buttons,
    pub modifiers: Modifiers,
    /// Deepest mapped window under the cursor.
    pub mouse_window: WindowId,
    pub focus_window: WindowId,
    /// Window holding the implicit button grab.
    pub grab_window: Option<WindowId>,
    /// Deliver pointer data without tree routing or grabs.
    pub raw_mode: bool,
}

impl InputState {
    pub const fn new(root: WindowId) -> Self {
        Self {
            cursor: (0, 0),
            buttons: Buttons::empty(),
            modifiers: Modifiers::empty(),
            mouse_window: root,
            focus_window: root,
            grab_window: None,
            raw_mode: false,
        }
    }
}

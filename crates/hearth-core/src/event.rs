//! Event vocabulary: types, masks, queued records, and host actions.
//!
//! [`Event`] is what ends up in a client's queue.
//! [`ServerAction`] is what the core asks the host to do.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::state::{Buttons, Geometry, Modifiers};
use crate::window::WindowId;

bitflags! {
    /// One bit per deliverable event type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EventMask: u32 {
        const EXPOSURE          = 1 << 1;
        const BUTTON_DOWN       = 1 << 2;
        const BUTTON_UP         = 1 << 3;
        const MOUSE_ENTER       = 1 << 4;
        const MOUSE_EXIT        = 1 << 5;
        const MOUSE_MOTION      = 1 << 6;
        const MOUSE_POSITION    = 1 << 7;
        const KEY_DOWN          = 1 << 8;
        const KEY_UP            = 1 << 9;
        const FOCUS_IN          = 1 << 10;
        const FOCUS_OUT         = 1 << 11;
        const UPDATE            = 1 << 12;
        const CHILD_UPDATE      = 1 << 13;
        const CLOSE_REQUEST     = 1 << 14;
        const SCREENSAVER       = 1 << 15;
        const CLIENT_DATA_REQ   = 1 << 16;
        const CLIENT_DATA       = 1 << 17;
        const SELECTION_CHANGED = 1 << 18;
        const TIMER             = 1 << 19;
        const PORTRAIT_CHANGED  = 1 << 20;
    }
}

/// Event type tag carried by every queued record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[default]
    None,
    Error,
    Exposure,
    ButtonDown,
    ButtonUp,
    MouseEnter,
    MouseExit,
    MouseMotion,
    MousePosition,
    KeyDown,
    KeyUp,
    FocusIn,
    FocusOut,
    Update,
    ChildUpdate,
    CloseRequest,
    ScreenSaver,
    ClientDataReq,
    ClientData,
    SelectionChanged,
    Timer,
    PortraitChanged,
}

impl EventType {
    /// Selection mask for this type. An empty mask means the type can never
    /// be selected for, and every delivery path treats it as a no-op.
    pub const fn mask(self) -> EventMask {
        match self {
            Self::None | Self::Error => EventMask::empty(),
            Self::Exposure => EventMask::EXPOSURE,
            Self::ButtonDown => EventMask::BUTTON_DOWN,
            Self::ButtonUp => EventMask::BUTTON_UP,
            Self::MouseEnter => EventMask::MOUSE_ENTER,
            Self::MouseExit => EventMask::MOUSE_EXIT,
            Self::MouseMotion => EventMask::MOUSE_MOTION,
            Self::MousePosition => EventMask::MOUSE_POSITION,
            Self::KeyDown => EventMask::KEY_DOWN,
            Self::KeyUp => EventMask::KEY_UP,
            Self::FocusIn => EventMask::FOCUS_IN,
            Self::FocusOut => EventMask::FOCUS_OUT,
            Self::Update => EventMask::UPDATE,
            Self::ChildUpdate => EventMask::CHILD_UPDATE,
            Self::CloseRequest => EventMask::CLOSE_REQUEST,
            Self::ScreenSaver => EventMask::SCREENSAVER,
            Self::ClientDataReq => EventMask::CLIENT_DATA_REQ,
            Self::ClientData => EventMask::CLIENT_DATA,
            Self::SelectionChanged => EventMask::SELECTION_CHANGED,
            Self::Timer => EventMask::TIMER,
            Self::PortraitChanged => EventMask::PORTRAIT_CHANGED,
        }
    }
}

/// A key value as reported by the keyboard driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(pub u16);

impl Key {
    /// Requests server shutdown.
    pub const QUIT: Self = Self(0xF0FF);
    /// Requests a full screen redraw.
    pub const REDRAW: Self = Self(0xF0FE);
}

/// Which kind of window change an update event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Map,
    Unmap,
    Move,
    Size,
    Unmapped,
    Destroy,
    Raise,
    Lower,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEvent {
    /// Operation that was running when the error happened.
    pub name: Option<&'static str>,
    pub code: ErrorCode,
    pub id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonEvent {
    pub kind: EventType,
    pub wid: WindowId,
    pub subwid: WindowId,
    pub root_x: i32,
    pub root_y: i32,
    pub x: i32,
    pub y: i32,
    pub buttons: Buttons,
    pub changed: Buttons,
    pub modifiers: Modifiers,
    pub time: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MouseEvent {
    pub kind: EventType,
    pub wid: WindowId,
    pub subwid: WindowId,
    pub root_x: i32,
    pub root_y: i32,
    pub x: i32,
    pub y: i32,
    pub buttons: Buttons,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyEvent {
    pub kind: EventType,
    pub wid: WindowId,
    pub subwid: WindowId,
    pub root_x: i32,
    pub root_y: i32,
    pub x: i32,
    pub y: i32,
    pub buttons: Buttons,
    pub modifiers: Modifiers,
    pub key: Key,
    pub scancode: u16,
    /// Delivered through a hotkey grab rather than normal routing.
    pub hotkey: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateEvent {
    pub kind: EventType,
    pub update: UpdateKind,
    /// Window the receiving client selected on.
    pub wid: WindowId,
    /// Window that actually changed.
    pub subwid: WindowId,
    pub area: Geometry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeneralEvent {
    pub kind: EventType,
    pub wid: WindowId,
    pub other: Option<WindowId>,
    pub root_x: i32,
    pub root_y: i32,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientDataEvent {
    pub wid: WindowId,
    pub rid: WindowId,
    pub serial: u32,
    /// Total length of the transfer this chunk belongs to.
    pub total_len: u32,
    pub data: Vec<u8>,
}

/// A queued event record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Event {
    #[default]
    None,
    Error(ErrorEvent),
    Button(ButtonEvent),
    Mouse(MouseEvent),
    Key(KeyEvent),
    Exposure { wid: WindowId, area: Geometry },
    Update(UpdateEvent),
    General(GeneralEvent),
    ScreenSaver { activate: bool },
    ClientDataReq { wid: WindowId, rid: WindowId, serial: u32, mime_type: u32 },
    ClientData(ClientDataEvent),
    SelectionChanged { new_owner: Option<WindowId> },
    Timer { wid: WindowId, tid: u32 },
}

impl Event {
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::None => EventType::None,
            Self::Error(_) => EventType::Error,
            Self::Button(e) => e.kind,
            Self::Mouse(e) => e.kind,
            Self::Key(e) => e.kind,
            Self::Exposure { .. } => EventType::Exposure,
            Self::Update(e) => e.kind,
            Self::General(e) => e.kind,
            Self::ScreenSaver { .. } => EventType::ScreenSaver,
            Self::ClientDataReq { .. } => EventType::ClientDataReq,
            Self::ClientData(_) => EventType::ClientData,
            Self::SelectionChanged { .. } => EventType::SelectionChanged,
            Self::Timer { .. } => EventType::Timer,
        }
    }

    /// True for a position record reported for `(wid, subwid)`.
    pub fn is_position_for(&self, wid: WindowId, subwid: WindowId) -> bool {
        matches!(self, Self::Mouse(e)
            if e.kind == EventType::MousePosition && e.wid == wid && e.subwid == subwid)
    }

    /// True for an exposure record on `wid` lying entirely inside `area`.
    pub fn is_exposure_within(&self, wid: WindowId, area: Geometry) -> bool {
        matches!(self, Self::Exposure { wid: w, area: a } if *w == wid && area.encloses(*a))
    }
}

/// Actions the core returns to the host for execution.
///
/// The host applies these to the rest of the server (screen saver timer,
/// cursor sprite, portrait policy, shutdown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAction {
    /// User activity happened; restart the idle timer.
    ResetScreenSaver,
    /// Draw the cursor sprite at this position.
    MoveCursor { x: i32, y: i32 },
    /// Re-evaluate portrait orientation from the raw pointer position.
    PortraitFromPointer { x: i32, y: i32 },
    /// Repaint the whole screen.
    RedrawScreen,
    /// Shut the server down.
    Terminate,
}

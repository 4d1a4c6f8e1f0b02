use tracing::{debug, trace};

use crate::event::{Event, EventType, Key, KeyEvent};
use crate::grab::{GrabKind, KeyGrab};
use crate::state::Modifiers;
use crate::window::WindowId;
use crate::EventCore;

impl EventCore {
    /// Deliver a keystroke.
    ///
    /// Hotkey grabs on `key` each get a copy first. A hotkey-exclusive grab
    /// ends delivery right there. Otherwise the key goes to the first client
    /// selecting for it, walking up from the delivery start window: the
    /// exclusive grab window when one applies, else the pointer window when
    /// it lies inside the focus window (or `hint`), else the focus window.
    pub fn deliver_key(
        &mut self,
        hint: Option<WindowId>,
        kind: EventType,
        key: Key,
        modifiers: Modifiers,
        scancode: u16,
    ) {
        let mask = kind.mask();
        if mask.is_empty() {
            return;
        }

        self.reset_screensaver();

        let (root_x, root_y) = self.input.cursor;
        let buttons = self.input.buttons;
        let grabs: Vec<KeyGrab> = self.grabs.iter().filter(|g| g.key == key).copied().collect();

        let mut candidate: Option<KeyGrab> = None;
        for grab in grabs {
            if grab.kind.is_hotkey() {
                let event = Event::Key(KeyEvent {
                    kind,
                    wid: grab.wid,
                    subwid: grab.wid,
                    root_x,
                    root_y,
                    x: root_x,
                    y: root_y,
                    buttons,
                    modifiers,
                    key,
                    scancode,
                    hotkey: true,
                });
                if self.post(grab.owner, event).is_err() {
                    continue;
                }
                if grab.kind == GrabKind::HotkeyExclusive {
                    trace!("{key:?} taken by hotkey-exclusive grab of {}", grab.owner);
                    return;
                }
            } else if candidate.is_none() {
                candidate = Some(grab);
            }
        }

        let root = self.windows.root();
        let (start, subwid, boundary) = match candidate {
            Some(grab) => {
                if !self.windows.contains(grab.wid) {
                    debug!("{key:?} reserved by vanished {}", grab.wid);
                    return;
                }
                let holds_focus = self.windows.is_inside(self.input.focus_window, grab.wid);
                let holds_pointer = grab.kind == GrabKind::ExclusiveMouse
                    && self.input.mouse_window == grab.wid;
                if !holds_focus && !holds_pointer {
                    return;
                }
                let boundary = if holds_focus { grab.wid } else { root };
                (grab.wid, grab.wid, boundary)
            }
            None => {
                let focus = match hint {
                    Some(wid) if self.windows.contains(wid) => wid,
                    Some(_) => return,
                    None => self.input.focus_window,
                };
                let pointer = self.input.mouse_window;
                let start = if self.windows.is_inside(pointer, focus) {
                    pointer
                } else {
                    focus
                };
                (start, start, focus)
            }
        };

        let mut wid = start;
        loop {
            let Some(window) = self.windows.get(wid) else {
                return;
            };
            let origin = (window.geometry.x, window.geometry.y);
            let no_propagate = window.no_propagate;
            let parent = window.parent;

            let receiver = window
                .subscriptions
                .iter()
                .find(|s| s.mask.intersects(mask))
                .map(|s| s.client);
            if let Some(client) = receiver {
                let event = Event::Key(KeyEvent {
                    kind,
                    wid,
                    subwid,
                    root_x,
                    root_y,
                    x: root_x - origin.0,
                    y: root_y - origin.1,
                    buttons,
                    modifiers,
                    key,
                    scancode,
                    hotkey: false,
                });
                // A failed allocation drops the keystroke.
                let _ = self.post(client, event);
                return;
            }

            if wid == root || wid == boundary || no_propagate.intersects(mask) {
                return;
            }
            match parent {
                Some(parent) => wid = parent,
                None => return,
            }
        }
    }
}

use tracing::debug;

use crate::event::{ButtonEvent, Event, EventMask, EventType, MouseEvent};
use crate::state::{Buttons, Modifiers};
use crate::window::WindowId;
use crate::EventCore;

impl EventCore {
    /// Turn a new pointer sample into motion, position and button events.
    pub fn handle_pointer_status(&mut self, x: i32, y: i32, buttons: Buttons) {
        let modifiers = self.input.modifiers;

        if self.input.raw_mode {
            self.deliver_raw_pointer(x, y, buttons, modifiers);
            return;
        }

        if (x, y) != self.input.cursor {
            self.reset_screensaver();
            self.move_cursor(x, y);
            self.deliver_motion(EventType::MouseMotion, buttons, modifiers);
            self.deliver_motion(EventType::MousePosition, buttons, modifiers);
        }

        let old = self.input.buttons;

        let released = old & !buttons;
        if !released.is_empty() {
            self.reset_screensaver();
            self.deliver_button(EventType::ButtonUp, buttons, released, modifiers);
        }

        let pressed = !old & buttons;
        if !pressed.is_empty() {
            self.reset_screensaver();
            self.check_mouse_window();
            self.deliver_button(EventType::ButtonDown, buttons, pressed, modifiers);
        }

        // Keep scrolling while a wheel button stays down.
        if self.config.pointer.scroll_repeat && buttons.intersects(Buttons::SCROLL) && pressed.is_empty()
        {
            self.deliver_button(EventType::ButtonDown, buttons, Buttons::empty(), modifiers);
        }

        self.input.buttons = buttons;
    }

    /// Where a pointer walk starts: the implicit grab window if there is
    /// one, else the window under the pointer. The sub-window id is always
    /// the window under the pointer.
    fn pointer_walk_start(&mut self) -> (WindowId, WindowId) {
        let subwid = self.input.mouse_window;
        match self.input.grab_window {
            Some(grab) if self.windows.contains(grab) => (grab, subwid),
            Some(stale) => {
                debug!("dropping implicit grab on vanished {stale}");
                self.input.grab_window = None;
                (subwid, subwid)
            }
            None => (subwid, subwid),
        }
    }

    /// Deliver a button event up the ancestry of the pointer window.
    ///
    /// Every matching subscription on a window gets its own record. On
    /// button-down with no grab in place, the first client on the window that
    /// also selected button-up grabs the pointer for that window; while a
    /// grab is held nothing propagates past the grab window, and the grab
    /// ends once no buttons remain pressed.
    pub fn deliver_button(
        &mut self,
        kind: EventType,
        buttons: Buttons,
        changed: Buttons,
        modifiers: Modifiers,
    ) {
        let mask = kind.mask();
        if mask.is_empty() {
            return;
        }

        let (mut wid, subwid) = self.pointer_walk_start();
        let (root_x, root_y) = self.input.cursor;

        loop {
            let Some(window) = self.windows.get(wid) else {
                return;
            };
            let origin = (window.geometry.x, window.geometry.y);
            let no_propagate = window.no_propagate;
            let parent = window.parent;

            for index in 0..self.windows.subscription_count(wid) {
                let Some(sub) = self.windows.subscription(wid, index) else {
                    break;
                };
                if !sub.mask.intersects(mask) {
                    continue;
                }

                if kind == EventType::ButtonDown
                    && self.input.grab_window.is_none()
                    && sub.mask.contains(EventMask::BUTTON_UP)
                {
                    debug!("implicit grab on {wid} for {}", sub.client);
                    self.input.grab_window = Some(wid);
                }

                let event = Event::Button(ButtonEvent {
                    kind,
                    wid,
                    subwid,
                    root_x,
                    root_y,
                    x: root_x - origin.0,
                    y: root_y - origin.1,
                    buttons,
                    changed,
                    modifiers,
                    time: self.timestamp(),
                });
                let _ = self.post(sub.client, event);
            }

            if self.input.grab_window.is_some() {
                if buttons.is_empty() {
                    debug!("implicit grab released on {wid}");
                    self.input.grab_window = None;
                    self.move_cursor(root_x, root_y);
                }
                return;
            }

            match parent {
                Some(parent) if !no_propagate.intersects(mask) => wid = parent,
                _ => return,
            }
        }
    }

    /// Deliver a motion or position event up the ancestry of the pointer
    /// window. A position event replaces any position event still queued for
    /// the same client, window and sub-window.
    pub fn deliver_motion(&mut self, kind: EventType, buttons: Buttons, modifiers: Modifiers) {
        let mask = kind.mask();
        if mask.is_empty() {
            return;
        }

        let (mut wid, subwid) = self.pointer_walk_start();
        let (root_x, root_y) = self.input.cursor;

        loop {
            let Some(window) = self.windows.get(wid) else {
                return;
            };
            let origin = (window.geometry.x, window.geometry.y);
            let no_propagate = window.no_propagate;
            let parent = window.parent;

            for index in 0..self.windows.subscription_count(wid) {
                let Some(sub) = self.windows.subscription(wid, index) else {
                    break;
                };
                if !sub.mask.intersects(mask) {
                    continue;
                }
                if kind == EventType::MousePosition {
                    self.release_first(sub.client, |e| e.is_position_for(wid, subwid));
                }
                let event = Event::Mouse(MouseEvent {
                    kind,
                    wid,
                    subwid,
                    root_x,
                    root_y,
                    x: root_x - origin.0,
                    y: root_y - origin.1,
                    buttons,
                    modifiers,
                });
                let _ = self.post(sub.client, event);
            }

            if self.input.grab_window.is_some() {
                return;
            }
            match parent {
                Some(parent) if !no_propagate.intersects(mask) => wid = parent,
                _ => return,
            }
        }
    }

    /// Raw mode: report device coordinates as-is, with no cursor tracking and
    /// no grabs. Position, then button-up and button-down, each walk up from
    /// the pointer window until the root or a no-propagate mask.
    pub(crate) fn deliver_raw_pointer(
        &mut self,
        raw_x: i32,
        raw_y: i32,
        buttons: Buttons,
        modifiers: Modifiers,
    ) {
        let start = self.input.mouse_window;
        self.reset_screensaver();

        self.walk_raw(start, EventMask::MOUSE_POSITION, |wid, subwid, _| {
            Event::Mouse(MouseEvent {
                kind: EventType::MousePosition,
                wid,
                subwid,
                root_x: raw_x,
                root_y: raw_y,
                x: 0,
                y: 0,
                buttons,
                modifiers,
            })
        });

        let old = self.input.buttons;
        for (kind, changed) in [
            (EventType::ButtonUp, old & !buttons),
            (EventType::ButtonDown, !old & buttons),
        ] {
            if changed.is_empty() {
                continue;
            }
            self.walk_raw(start, kind.mask(), |wid, subwid, time| {
                Event::Button(ButtonEvent {
                    kind,
                    wid,
                    subwid,
                    root_x: raw_x,
                    root_y: raw_y,
                    x: 0,
                    y: 0,
                    buttons,
                    changed,
                    modifiers,
                    time,
                })
            });
        }

        self.input.buttons = buttons;
    }

    fn walk_raw<F>(&mut self, start: WindowId, mask: EventMask, make: F)
    where
        F: Fn(WindowId, WindowId, u32) -> Event,
    {
        let mut wid = start;
        loop {
            let Some(window) = self.windows.get(wid) else {
                return;
            };
            let no_propagate = window.no_propagate;
            let parent = window.parent;

            for index in 0..self.windows.subscription_count(wid) {
                let Some(sub) = self.windows.subscription(wid, index) else {
                    break;
                };
                if !sub.mask.intersects(mask) {
                    continue;
                }
                if mask == EventMask::MOUSE_POSITION {
                    self.release_first(sub.client, |e| e.is_position_for(wid, start));
                }
                let event = make(wid, start, self.timestamp());
                let _ = self.post(sub.client, event);
            }

            match parent {
                Some(parent) if !no_propagate.intersects(mask) => wid = parent,
                _ => return,
            }
        }
    }
}

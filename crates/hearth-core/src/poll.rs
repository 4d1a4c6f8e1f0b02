//! Device poll bridge.
//!
//! The host calls these once per loop iteration. They never block: a device
//! with nothing new costs one `poll` call.

use tracing::{debug, trace};

use crate::device::{DeviceRead, KeyboardDevice, PointerDevice, PointerReading};
use crate::error::{CoreError, DeviceKind};
use crate::event::{EventType, Key, ServerAction};
use crate::EventCore;

impl EventCore {
    /// Read the pointer and deliver whatever changed. Returns whether a
    /// sample was processed.
    pub fn check_pointer(&mut self, device: &mut dyn PointerDevice) -> bool {
        if !device.poll() {
            return false;
        }

        let reading = match device.read() {
            DeviceRead::Data(reading) => reading,
            DeviceRead::NoData | DeviceRead::Quit => return false,
            DeviceRead::Failed => {
                self.report_failure(&CoreError::DeviceFailure(DeviceKind::Pointer), 0);
                return false;
            }
        };
        trace!("pointer {reading:?}");

        let buttons = reading.buttons();
        let (raw_x, raw_y) = match reading {
            PointerReading::Absolute { x, y, .. } => (x, y),
            PointerReading::Relative { dx, dy, .. } => (dx, dy),
        };

        let (x, y) = if self.input.raw_mode {
            (raw_x, raw_y)
        } else {
            let (x, y) = match reading {
                PointerReading::Absolute { x, y, .. } => (x, y),
                PointerReading::Relative { dx, dy, .. } => {
                    let pointer = &self.config.pointer;
                    let (cx, cy) = self.input.cursor;
                    (
                        cx.saturating_add(pointer.accelerate(dx)),
                        cy.saturating_add(pointer.accelerate(dy)),
                    )
                }
            };
            self.config.screen.clamp(x, y)
        };
        self.handle_pointer_status(x, y, buttons);

        if self.config.pointer.auto_portrait {
            self.push_action(ServerAction::PortraitFromPointer { x, y });
        }

        self.debug_validate("check_pointer");
        true
    }

    /// Read the keyboard and deliver the keystroke. Returns whether a key
    /// was processed.
    pub fn check_keyboard(&mut self, device: &mut dyn KeyboardDevice) -> bool {
        if !device.poll() {
            return false;
        }

        let reading = match device.read() {
            DeviceRead::Data(reading) => reading,
            DeviceRead::NoData => return false,
            DeviceRead::Quit => {
                self.request_termination();
                return false;
            }
            DeviceRead::Failed => {
                self.report_failure(&CoreError::DeviceFailure(DeviceKind::Keyboard), 0);
                return false;
            }
        };
        trace!("keyboard {reading:?}");

        match reading.key {
            Key::QUIT => self.request_termination(),
            Key::REDRAW => {
                debug!("redraw requested from keyboard");
                self.push_action(ServerAction::RedrawScreen);
            }
            _ => {}
        }

        self.input.modifiers = reading.modifiers;
        let kind = if reading.pressed {
            EventType::KeyDown
        } else {
            EventType::KeyUp
        };
        self.deliver_key(None, kind, reading.key, reading.modifiers, reading.scancode);

        self.debug_validate("check_keyboard");
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::{Config, PointerConfig};
    use crate::device::{DeviceError, KeyReading};
    use crate::error::ErrorCode;
    use crate::state::{Buttons, Modifiers};

    struct Pointer(VecDeque<DeviceRead<PointerReading>>);

    impl PointerDevice for Pointer {
        fn open(&mut self, _: &PointerConfig) -> Result<(), DeviceError> {
            Ok(())
        }
        fn close(&mut self) {}
        fn poll(&mut self) -> bool {
            !self.0.is_empty()
        }
        fn read(&mut self) -> DeviceRead<PointerReading> {
            self.0.pop_front().unwrap_or(DeviceRead::NoData)
        }
    }

    struct Keyboard(VecDeque<DeviceRead<KeyReading>>);

    impl KeyboardDevice for Keyboard {
        fn open(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }
        fn close(&mut self) {}
        fn poll(&mut self) -> bool {
            !self.0.is_empty()
        }
        fn read(&mut self) -> DeviceRead<KeyReading> {
            self.0.pop_front().unwrap_or(DeviceRead::NoData)
        }
    }

    fn key(key: Key, pressed: bool) -> DeviceRead<KeyReading> {
        DeviceRead::Data(KeyReading {
            key,
            modifiers: Modifiers::empty(),
            scancode: 0,
            pressed,
        })
    }

    #[test]
    fn idle_device_is_cheap() {
        let mut core = EventCore::new(Config::default());
        assert!(!core.check_pointer(&mut Pointer(VecDeque::new())));
        assert!(!core.check_keyboard(&mut Keyboard(VecDeque::new())));
        assert!(core.take_actions().is_empty());
    }

    #[test]
    fn relative_motion_is_accelerated_and_clamped() {
        let mut core = EventCore::new(Config::default());
        let mut mouse = Pointer(VecDeque::from([
            DeviceRead::Data(PointerReading::Relative {
                dx: 7,
                dy: 2,
                buttons: Buttons::empty(),
            }),
            DeviceRead::Data(PointerReading::Relative {
                dx: -100,
                dy: 2000,
                buttons: Buttons::empty(),
            }),
        ]));
        assert!(core.check_pointer(&mut mouse));
        assert_eq!(core.input.cursor, (11, 2));
        assert!(core.check_pointer(&mut mouse));
        assert_eq!(core.input.cursor, (0, 479));
    }

    #[test]
    fn huge_relative_motion_pins_cursor_to_screen_edge() {
        let mut core = EventCore::new(Config::default());
        let mut mouse = Pointer(VecDeque::from([
            DeviceRead::Data(PointerReading::Relative {
                dx: 1_000_000_000,
                dy: 0,
                buttons: Buttons::empty(),
            }),
            DeviceRead::Data(PointerReading::Relative {
                dx: i32::MIN,
                dy: i32::MAX,
                buttons: Buttons::empty(),
            }),
        ]));
        assert!(core.check_pointer(&mut mouse));
        assert_eq!(core.input.cursor, (639, 0));
        assert!(core.check_pointer(&mut mouse));
        assert_eq!(core.input.cursor, (0, 479));
    }

    #[test]
    fn pointer_failure_reports_mouse_error() {
        let mut core = EventCore::new(Config::default());
        let client = core.connect_client("c");
        core.set_current_client(Some(client), Some("poll"));
        let mut mouse = Pointer(VecDeque::from([DeviceRead::Failed]));
        assert!(!core.check_pointer(&mut mouse));
        assert!(matches!(
            core.next_event(client),
            Some(crate::event::Event::Error(e)) if e.code == ErrorCode::MouseError
        ));
    }

    #[test]
    fn quit_status_and_quit_key_terminate() {
        let mut core = EventCore::new(Config::default());
        let mut kbd = Keyboard(VecDeque::from([DeviceRead::Quit]));
        assert!(!core.check_keyboard(&mut kbd));
        assert!(core.should_exit);

        let mut core = EventCore::new(Config::default());
        let mut kbd = Keyboard(VecDeque::from([key(Key::QUIT, true)]));
        assert!(core.check_keyboard(&mut kbd));
        assert!(core.take_actions().contains(&ServerAction::Terminate));
    }

    #[test]
    fn redraw_key_requests_redraw() {
        let mut core = EventCore::new(Config::default());
        let mut kbd = Keyboard(VecDeque::from([key(Key::REDRAW, true)]));
        assert!(core.check_keyboard(&mut kbd));
        assert!(core.take_actions().contains(&ServerAction::RedrawScreen));
    }

    #[test]
    fn auto_portrait_reports_pointer_position() {
        let mut config = Config::default();
        config.pointer.auto_portrait = true;
        let mut core = EventCore::new(config);
        let mut mouse = Pointer(VecDeque::from([DeviceRead::Data(PointerReading::Absolute {
            x: 30,
            y: 40,
            buttons: Buttons::empty(),
        })]));
        assert!(core.check_pointer(&mut mouse));
        assert!(core
            .take_actions()
            .contains(&ServerAction::PortraitFromPointer { x: 30, y: 40 }));
    }
}

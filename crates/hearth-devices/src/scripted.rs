//! Devices that replay a prepared list of readings.
//!
//! Used by the replay tool and by tests. A script entry is handed out per
//! `read`; `poll` reports data while entries remain.

use std::collections::VecDeque;

use hearth_core::config::PointerConfig;
use hearth_core::device::{
    DeviceError, DeviceRead, KeyReading, KeyboardDevice, PointerDevice, PointerReading,
};

#[derive(Debug, Default)]
pub struct ScriptedPointer {
    script: VecDeque<DeviceRead<PointerReading>>,
    open: bool,
}

impl ScriptedPointer {
    pub fn new(script: impl IntoIterator<Item = DeviceRead<PointerReading>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            open: false,
        }
    }

    pub fn push(&mut self, reading: DeviceRead<PointerReading>) {
        self.script.push_back(reading);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl PointerDevice for ScriptedPointer {
    fn open(&mut self, _config: &PointerConfig) -> Result<(), DeviceError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn poll(&mut self) -> bool {
        self.open && !self.script.is_empty()
    }

    fn read(&mut self) -> DeviceRead<PointerReading> {
        if !self.open {
            return DeviceRead::NoData;
        }
        self.script.pop_front().unwrap_or(DeviceRead::NoData)
    }
}

#[derive(Debug, Default)]
pub struct ScriptedKeyboard {
    script: VecDeque<DeviceRead<KeyReading>>,
    open: bool,
}

impl ScriptedKeyboard {
    pub fn new(script: impl IntoIterator<Item = DeviceRead<KeyReading>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            open: false,
        }
    }

    pub fn push(&mut self, reading: DeviceRead<KeyReading>) {
        self.script.push_back(reading);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl KeyboardDevice for ScriptedKeyboard {
    fn open(&mut self) -> Result<(), DeviceError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn poll(&mut self) -> bool {
        self.open && !self.script.is_empty()
    }

    fn read(&mut self) -> DeviceRead<KeyReading> {
        if !self.open {
            return DeviceRead::NoData;
        }
        self.script.pop_front().unwrap_or(DeviceRead::NoData)
    }
}

#[cfg(test)]
mod tests {
    use hearth_core::state::Buttons;

    use super::*;

    #[test]
    fn closed_device_yields_nothing() {
        let mut pointer = ScriptedPointer::new([DeviceRead::Failed]);
        assert!(!pointer.poll());
        assert_eq!(pointer.read(), DeviceRead::NoData);
        pointer.open(&PointerConfig::default()).unwrap();
        assert!(pointer.poll());
        assert_eq!(pointer.read(), DeviceRead::Failed);
        assert!(!pointer.poll());
    }

    #[test]
    fn script_is_consumed_in_order() {
        let mut pointer = ScriptedPointer::default();
        pointer.open(&PointerConfig::default()).unwrap();
        for dx in [1, 2] {
            pointer.push(DeviceRead::Data(PointerReading::Relative {
                dx,
                dy: 0,
                buttons: Buttons::empty(),
            }));
        }
        assert_eq!(pointer.remaining(), 2);
        assert!(matches!(
            pointer.read(),
            DeviceRead::Data(PointerReading::Relative { dx: 1, .. })
        ));
        assert_eq!(pointer.remaining(), 1);
    }
}

//! Scenario replay
//!
//! A scenario is a TOML file describing a window tree, the clients watching
//! it, and scripted pointer and keyboard input. Replaying it runs the
//! headless backend until the scripts run out and returns every client's
//! queue as JSON lines.
//!
//! ```toml
//! focus = "editor"
//!
//! [[windows]]
//! name = "editor"
//! x = 10
//! y = 10
//! width = 200
//! height = 100
//!
//! [[clients]]
//! name = "app"
//! [[clients.select]]
//! window = "editor"
//! mask = "BUTTON_DOWN | BUTTON_UP | KEY_DOWN"
//!
//! [[pointer]]
//! x = 20
//! y = 30
//! buttons = "LEFT"
//!
//! [[keyboard]]
//! key = 97
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use hearth_core::config::Config;
use hearth_core::device::{DeviceRead, KeyReading, PointerReading};
use hearth_core::event::{Event, EventMask, Key};
use hearth_core::grab::GrabKind;
use hearth_core::state::{Buttons, Geometry, Modifiers};
use hearth_core::window::WindowClass;
use hearth_core::WindowId;
use hearth_devices::{HeadlessBackend, ScriptedKeyboard, ScriptedPointer};

/// Name that always refers to the root window.
const ROOT_NAME: &str = "root";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Window given keyboard focus before input starts
    pub focus: Option<String>,
    /// Stop after this many poll iterations
    pub max_iterations: Option<u64>,
    #[serde(default)]
    pub windows: Vec<WindowDef>,
    #[serde(default)]
    pub clients: Vec<ClientDef>,
    #[serde(default)]
    pub pointer: Vec<PointerStep>,
    #[serde(default)]
    pub keyboard: Vec<KeyStep>,
}

/// A window in absolute screen coordinates, created in file order.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowDef {
    pub name: String,
    #[serde(default = "root_name")]
    pub parent: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub class: WindowClass,
    #[serde(default = "default_true")]
    pub mapped: bool,
    #[serde(default)]
    pub no_propagate: EventMask,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientDef {
    pub name: String,
    pub queue_limit: Option<usize>,
    #[serde(default)]
    pub select: Vec<SelectDef>,
    #[serde(default)]
    pub grabs: Vec<GrabDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectDef {
    pub window: String,
    pub mask: EventMask,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrabDef {
    pub key: u16,
    pub kind: GrabKind,
    pub window: String,
}

/// One pointer reading: absolute when `x`/`y` are given, relative when
/// `dx`/`dy` are, a read failure when `fail` is set.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointerStep {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub dx: Option<i32>,
    pub dy: Option<i32>,
    #[serde(default)]
    pub buttons: Buttons,
    #[serde(default)]
    pub fail: bool,
}

impl PointerStep {
    fn reading(&self) -> DeviceRead<PointerReading> {
        if self.fail {
            return DeviceRead::Failed;
        }
        let buttons = self.buttons;
        if self.x.is_some() || self.y.is_some() {
            DeviceRead::Data(PointerReading::Absolute {
                x: self.x.unwrap_or_default(),
                y: self.y.unwrap_or_default(),
                buttons,
            })
        } else {
            DeviceRead::Data(PointerReading::Relative {
                dx: self.dx.unwrap_or_default(),
                dy: self.dy.unwrap_or_default(),
                buttons,
            })
        }
    }
}

/// One keyboard reading. `quit` reports the device's shutdown status and
/// `fail` a read failure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyStep {
    #[serde(default)]
    pub key: u16,
    #[serde(default = "default_true")]
    pub pressed: bool,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub scancode: u16,
    #[serde(default)]
    pub quit: bool,
    #[serde(default)]
    pub fail: bool,
}

impl KeyStep {
    const fn reading(&self) -> DeviceRead<KeyReading> {
        if self.quit {
            return DeviceRead::Quit;
        }
        if self.fail {
            return DeviceRead::Failed;
        }
        DeviceRead::Data(KeyReading {
            key: Key(self.key),
            modifiers: self.modifiers,
            scancode: self.scancode,
            pressed: self.pressed,
        })
    }
}

fn root_name() -> String {
    String::from(ROOT_NAME)
}

const fn default_true() -> bool {
    true
}

/// One output line.
#[derive(Debug, Serialize)]
struct EventLine<'a> {
    client: &'a str,
    event: &'a Event,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario: {path:?}"))?;
        Self::parse(&content).with_context(|| format!("Failed to parse scenario: {path:?}"))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replay against a fresh core built from `config`.
    pub fn run(&self, config: Config) -> Result<Vec<String>> {
        let pointer = ScriptedPointer::new(self.pointer.iter().map(PointerStep::reading));
        let keyboard = ScriptedKeyboard::new(self.keyboard.iter().map(KeyStep::reading));
        let mut backend = HeadlessBackend::new(config, Box::new(pointer), Box::new(keyboard))?;

        let mut windows = HashMap::from([(root_name(), backend.core.windows.root())]);
        let lookup = |windows: &HashMap<String, WindowId>, name: &str| {
            windows
                .get(name)
                .copied()
                .ok_or_else(|| anyhow!("Unknown window '{name}'"))
        };

        for def in &self.windows {
            if windows.contains_key(&def.name) {
                return Err(anyhow!("Duplicate window '{}'", def.name));
            }
            let parent = lookup(&windows, &def.parent)?;
            let geometry = Geometry::new(def.x, def.y, def.width, def.height);
            let wid = backend
                .core
                .create_window(parent, geometry, def.class, None)
                .with_context(|| format!("Failed to create window '{}'", def.name))?;
            backend.core.set_no_propagate(wid, def.no_propagate)?;
            if def.mapped {
                backend.core.map_window(wid)?;
            }
            debug!("Window '{}' is {wid}", def.name);
            windows.insert(def.name.clone(), wid);
        }

        let mut clients = Vec::with_capacity(self.clients.len());
        for def in &self.clients {
            let id = backend.core.connect_client(def.name.as_str());
            if def.queue_limit.is_some() {
                backend.core.set_queue_limit(id, def.queue_limit)?;
            }
            for select in &def.select {
                let wid = lookup(&windows, &select.window)?;
                backend.core.select_events(wid, id, select.mask)?;
            }
            for grab in &def.grabs {
                let wid = lookup(&windows, &grab.window)?;
                backend
                    .core
                    .grab_key(Key(grab.key), grab.kind, id, wid)
                    .with_context(|| format!("Client '{}' failed to grab key", def.name))?;
            }
            clients.push((def.name.as_str(), id));
        }

        if let Some(focus) = &self.focus {
            backend.core.set_focus(lookup(&windows, focus)?)?;
        }

        backend.run(self.max_iterations)?;
        backend
            .core
            .validate_invariants()
            .context("Core invariants violated after replay")?;
        info!(
            "Replay finished after {} iterations",
            backend.stats.iterations
        );

        let mut lines = Vec::new();
        for (name, id) in clients {
            while let Some(event) = backend.core.next_event(id) {
                let line = serde_json::to_string(&EventLine {
                    client: name,
                    event: &event,
                })?;
                lines.push(line);
            }
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const DRAG_AND_TYPE: &str = r#"
focus = "editor"

[[windows]]
name = "editor"
x = 10
y = 10
width = 200
height = 100

[[clients]]
name = "app"
[[clients.select]]
window = "editor"
mask = "BUTTON_DOWN | BUTTON_UP | KEY_DOWN"

[[pointer]]
x = 20
y = 30
buttons = "LEFT"

[[pointer]]
x = 20
y = 30

[[keyboard]]
key = 97
"#;

    #[test]
    fn replay_prints_one_line_per_event() {
        let scenario = Scenario::parse(DRAG_AND_TYPE).unwrap();
        let lines = scenario.run(Config::default()).unwrap();
        assert_eq!(lines.len(), 3);

        let values: Vec<serde_json::Value> = lines
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let kinds: Vec<_> = values
            .iter()
            .map(|v| v["event"]["kind"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(kinds, vec!["button_down", "key_down", "button_up"]);
        assert!(values.iter().all(|v| v["client"] == "app"));
        assert_eq!(values[0]["event"]["record"], "button");
        assert_eq!(values[0]["event"]["x"], 10);
    }

    #[test]
    fn unknown_window_is_reported() {
        let scenario = Scenario::parse(
            r#"
[[clients]]
name = "app"
[[clients.select]]
window = "nowhere"
mask = "EXPOSURE"
"#,
        )
        .unwrap();
        let err = scenario.run(Config::default()).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn pointer_step_forms() {
        let relative = PointerStep {
            dx: Some(-2),
            ..PointerStep::default()
        };
        assert_eq!(
            relative.reading(),
            DeviceRead::Data(PointerReading::Relative {
                dx: -2,
                dy: 0,
                buttons: Buttons::empty()
            })
        );
        let failed = PointerStep {
            x: Some(1),
            fail: true,
            ..PointerStep::default()
        };
        assert_eq!(failed.reading(), DeviceRead::Failed);
    }

    #[test]
    fn quit_key_stops_replay_early() {
        let scenario = Scenario::parse(
            r#"
[[clients]]
name = "shell"
[[clients.select]]
window = "root"
mask = "KEY_DOWN"

[[keyboard]]
key = 120

[[keyboard]]
quit = true

[[keyboard]]
key = 121
"#,
        )
        .unwrap();
        let lines = scenario.run(Config::default()).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"key\":120"));
    }

    #[test]
    fn shipped_drag_scenario_replays() {
        let scenario = Scenario::parse(include_str!("../scenarios/drag.toml")).unwrap();
        let lines = scenario.run(Config::default()).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("\"modifiers\":\"SHIFT\""));
        assert!(lines[2].contains("\"kind\":\"button_up\""));
        // Released after the relative nudge of four pixels.
        assert!(lines[2].contains("\"root_x\":24"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{DRAG_AND_TYPE}").unwrap();
        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.windows.len(), 1);
        assert_eq!(scenario.focus.as_deref(), Some("editor"));
    }
}

//! Invariant validation for the core state.
//!
//! Called after every device poll in debug builds.

use std::collections::HashSet;

use crate::event::{Event, EventType};
use crate::EventCore;

/// Error indicating which invariant was violated.
#[derive(Debug, thiserror::Error)]
pub enum InvariantError {
    #[error("Grab window {0} does not exist")]
    GrabWindowMissing(String),

    #[error("Grab held on {0} with no buttons pressed")]
    GrabWithoutButtons(String),

    #[error("Focus window {0} does not exist")]
    FocusWindowMissing(String),

    #[error("Pointer window {0} does not exist")]
    MouseWindowMissing(String),

    #[error("Event slot {0} is owned {1} times")]
    SlotOwnership(usize, usize),

    #[error("Pool has {pool} slots but {owned} are accounted for")]
    SlotLeak { pool: usize, owned: usize },

    #[error("Client {0} has more than one position event queued for one window pair")]
    DuplicatePosition(String),

    #[error("Hotkey grab on key {0} is listed before an exclusive grab")]
    GrabOrder(u16),
}

/// Validate all core invariants. Returns the first violation found.
pub fn validate(core: &EventCore) -> Result<(), InvariantError> {
    // 1. The implicit grab names a live window and some button is down
    if let Some(grab) = core.input.grab_window {
        if !core.windows.contains(grab) {
            return Err(InvariantError::GrabWindowMissing(format!("{grab}")));
        }
        if core.input.buttons.is_empty() {
            return Err(InvariantError::GrabWithoutButtons(format!("{grab}")));
        }
    }

    // 2. Focus and pointer windows exist
    if !core.windows.contains(core.input.focus_window) {
        return Err(InvariantError::FocusWindowMissing(format!(
            "{}",
            core.input.focus_window
        )));
    }
    if !core.windows.contains(core.input.mouse_window) {
        return Err(InvariantError::MouseWindowMissing(format!(
            "{}",
            core.input.mouse_window
        )));
    }

    // 3. Every slot is on the free list or in exactly one queue
    let mut owners = vec![0usize; core.pool.len()];
    let queued = core.clients.values().flat_map(|c| c.queue.iter());
    for handle in core.pool.free_handles().iter().chain(queued) {
        match owners.get_mut(handle.index()) {
            Some(count) => *count += 1,
            None => return Err(InvariantError::SlotOwnership(handle.index(), 0)),
        }
    }
    if let Some((slot, &count)) = owners.iter().enumerate().find(|(_, &n)| n > 1) {
        return Err(InvariantError::SlotOwnership(slot, count));
    }
    let owned = owners.iter().filter(|&&n| n == 1).count();
    if owned != core.pool.len() {
        return Err(InvariantError::SlotLeak {
            pool: core.pool.len(),
            owned,
        });
    }

    // 4. Position events are coalesced per (window, sub-window)
    for client in core.clients.values() {
        let mut seen = HashSet::new();
        for &handle in &client.queue {
            if let Event::Mouse(e) = &core.pool[handle] {
                if e.kind == EventType::MousePosition && !seen.insert((e.wid, e.subwid)) {
                    return Err(InvariantError::DuplicatePosition(format!("{}", client.id)));
                }
            }
        }
    }

    // 5. Exclusive grabs precede hotkey grabs for the same key
    if let Some(key) = core.grabs.misordered_key() {
        return Err(InvariantError::GrabOrder(key.0));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::event::EventMask;
    use crate::state::Buttons;

    #[test]
    fn fresh_core_is_valid() {
        let core = EventCore::new(Config::default());
        assert!(validate(&core).is_ok());
    }

    #[test]
    fn grab_without_buttons_is_flagged() {
        let mut core = EventCore::new(Config::default());
        core.input.grab_window = Some(core.windows.root());
        assert!(matches!(
            validate(&core),
            Err(InvariantError::GrabWithoutButtons(_))
        ));
        core.input.buttons = Buttons::LEFT;
        assert!(validate(&core).is_ok());
    }

    #[test]
    fn queued_records_are_accounted_for() {
        let mut core = EventCore::new(Config::default());
        let client = core.connect_client("c");
        core.select_events(core.windows.root(), client, EventMask::SCREENSAVER)
            .unwrap();
        for _ in 0..40 {
            core.deliver_screensaver(true);
        }
        assert!(validate(&core).is_ok());
        while core.next_event(client).is_some() {}
        assert!(validate(&core).is_ok());
    }
}

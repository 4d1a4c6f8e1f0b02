//! Reserved keys.
//!
//! Keyboard delivery scans this list in order and needs every exclusive
//! entry for a key to come before the hotkey entries for that key. The list
//! keeps that order by construction: exclusive grabs go to the head, hotkey
//! grabs to the tail.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ClientId;
use crate::error::CoreError;
use crate::event::Key;
use crate::window::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrabKind {
    /// Owner gets a copy; normal delivery continues.
    Hotkey,
    /// Owner gets the key and nobody else does.
    HotkeyExclusive,
    /// Key goes to the grab window while it contains the focus window.
    Exclusive,
    /// Like `Exclusive`, or while the grab window is the one under the pointer.
    ExclusiveMouse,
}

impl GrabKind {
    pub const fn is_hotkey(self) -> bool {
        matches!(self, Self::Hotkey | Self::HotkeyExclusive)
    }

    /// At most one grab of these kinds may exist per key.
    const fn is_exclusive(self) -> bool {
        !matches!(self, Self::Hotkey)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGrab {
    pub key: Key,
    pub kind: GrabKind,
    pub owner: ClientId,
    pub wid: WindowId,
}

#[derive(Debug, Default)]
pub struct KeyGrabList {
    entries: Vec<KeyGrab>,
}

impl KeyGrabList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyGrab> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reserve `key` for `owner` on `wid`.
    ///
    /// Registering the same grab twice is a no-op. A second exclusive grab
    /// on a key fails with [`CoreError::AlreadyGrabbed`].
    pub fn grab(&mut self, grab: KeyGrab) -> Result<(), CoreError> {
        if self.entries.contains(&grab) {
            return Ok(());
        }
        if grab.kind.is_exclusive()
            && self
                .entries
                .iter()
                .any(|g| g.key == grab.key && g.kind.is_exclusive())
        {
            return Err(CoreError::AlreadyGrabbed(grab.key));
        }

        match grab.kind {
            GrabKind::Exclusive | GrabKind::ExclusiveMouse => self.entries.insert(0, grab),
            GrabKind::Hotkey | GrabKind::HotkeyExclusive => self.entries.push(grab),
        }
        debug!("{} grabbed key {:?} ({:?}) on {}", grab.owner, grab.key, grab.kind, grab.wid);
        Ok(())
    }

    /// Release every grab of `key` held by `owner` on `wid`.
    pub fn ungrab(&mut self, key: Key, owner: ClientId, wid: WindowId) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|g| !(g.key == key && g.owner == owner && g.wid == wid));
        before != self.entries.len()
    }

    pub fn drop_client(&mut self, owner: ClientId) {
        self.entries.retain(|g| g.owner != owner);
    }

    pub fn drop_window(&mut self, wid: WindowId) {
        self.entries.retain(|g| g.wid != wid);
    }

    /// First key whose hotkey entries are not all after its exclusive ones.
    pub fn misordered_key(&self) -> Option<Key> {
        self.entries.iter().enumerate().find_map(|(i, g)| {
            let late_exclusive = g.kind.is_hotkey()
                && self.entries[i + 1..]
                    .iter()
                    .any(|later| later.key == g.key && !later.kind.is_hotkey());
            late_exclusive.then_some(g.key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grab(key: u16, kind: GrabKind, owner: u32) -> KeyGrab {
        KeyGrab {
            key: Key(key),
            kind,
            owner: ClientId(owner),
            wid: WindowId(1),
        }
    }

    #[test]
    fn exclusive_registered_after_hotkey_still_scans_first() {
        let mut list = KeyGrabList::new();
        list.grab(grab(b'a'.into(), GrabKind::Hotkey, 1)).unwrap();
        list.grab(grab(b'a'.into(), GrabKind::Exclusive, 2)).unwrap();
        let kinds: Vec<_> = list.iter().map(|g| g.kind).collect();
        assert_eq!(kinds, vec![GrabKind::Exclusive, GrabKind::Hotkey]);
        assert_eq!(list.misordered_key(), None);
    }

    #[test]
    fn second_exclusive_grab_is_rejected() {
        let mut list = KeyGrabList::new();
        list.grab(grab(7, GrabKind::Exclusive, 1)).unwrap();
        assert_eq!(
            list.grab(grab(7, GrabKind::ExclusiveMouse, 2)),
            Err(CoreError::AlreadyGrabbed(Key(7)))
        );
        assert_eq!(
            list.grab(grab(7, GrabKind::HotkeyExclusive, 2)),
            Err(CoreError::AlreadyGrabbed(Key(7)))
        );
        list.grab(grab(7, GrabKind::Hotkey, 2)).unwrap();
        list.grab(grab(7, GrabKind::Hotkey, 3)).unwrap();
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn duplicate_registration_is_idempotent() {
        let mut list = KeyGrabList::new();
        list.grab(grab(7, GrabKind::Exclusive, 1)).unwrap();
        list.grab(grab(7, GrabKind::Exclusive, 1)).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn ungrab_and_client_cleanup() {
        let mut list = KeyGrabList::new();
        list.grab(grab(1, GrabKind::Hotkey, 1)).unwrap();
        list.grab(grab(2, GrabKind::Hotkey, 1)).unwrap();
        list.grab(grab(2, GrabKind::Hotkey, 2)).unwrap();
        assert!(list.ungrab(Key(1), ClientId(1), WindowId(1)));
        assert!(!list.ungrab(Key(1), ClientId(1), WindowId(1)));
        list.drop_client(ClientId(1));
        assert_eq!(list.len(), 1);
    }
}

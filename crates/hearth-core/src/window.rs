//! Window arena.
//!
//! Only what routing needs lives here: the parent/child tree, screen
//! position, visibility flags, the no-propagate mask and per-client event
//! subscriptions. Windows are addressed by id; walks are id hops toward the
//! root, and the tree cannot contain cycles because a window's parent must
//! exist before the window is created.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ClientId;
use crate::error::CoreError;
use crate::event::EventMask;
use crate::state::Geometry;

/// Unique, opaque window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "win:{}", self.0)
    }
}

/// The root window always has this id.
pub const ROOT_WINDOW_ID: WindowId = WindowId(1);

/// Whether a window can be drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowClass {
    #[default]
    InputOutput,
    InputOnly,
}

/// One client's interest in a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub client: ClientId,
    pub mask: EventMask,
}

#[derive(Debug, Clone)]
pub struct Window {
    pub id: WindowId,
    pub parent: Option<WindowId>,
    pub children: Vec<WindowId>,
    pub owner: Option<ClientId>,
    /// Absolute screen geometry.
    pub geometry: Geometry,
    pub class: WindowClass,
    pub mapped: bool,
    /// Event types that must not bubble past this window.
    pub no_propagate: EventMask,
    pub subscriptions: Vec<Subscription>,
}

impl Window {
    fn new(id: WindowId, parent: Option<WindowId>, geometry: Geometry) -> Self {
        Self {
            id,
            parent,
            children: Vec::new(),
            owner: None,
            geometry,
            class: WindowClass::InputOutput,
            mapped: false,
            no_propagate: EventMask::empty(),
            subscriptions: Vec::new(),
        }
    }

    pub const fn is_output(&self) -> bool {
        matches!(self.class, WindowClass::InputOutput)
    }

    /// Selection mask of `client` on this window.
    pub fn mask_for(&self, client: ClientId) -> EventMask {
        self.subscriptions
            .iter()
            .find(|s| s.client == client)
            .map_or(EventMask::empty(), |s| s.mask)
    }
}

#[derive(Debug)]
pub struct WindowTree {
    windows: IndexMap<WindowId, Window>,
    next_id: u32,
}

impl WindowTree {
    /// Create a tree holding only the mapped root window covering `screen`.
    pub fn new(screen: Geometry) -> Self {
        let mut root = Window::new(ROOT_WINDOW_ID, None, screen);
        root.mapped = true;
        let mut windows = IndexMap::new();
        windows.insert(ROOT_WINDOW_ID, root);
        Self {
            windows,
            next_id: ROOT_WINDOW_ID.0 + 1,
        }
    }

    pub const fn root(&self) -> WindowId {
        ROOT_WINDOW_ID
    }

    pub fn get(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id)
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Window> {
        self.windows.values()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn parent(&self, id: WindowId) -> Option<WindowId> {
        self.windows.get(&id).and_then(|w| w.parent)
    }

    /// Create an unmapped child of `parent`.
    pub fn create(
        &mut self,
        parent: WindowId,
        geometry: Geometry,
        class: WindowClass,
        owner: Option<ClientId>,
    ) -> Result<WindowId, CoreError> {
        let parent_window = self
            .windows
            .get_mut(&parent)
            .ok_or(CoreError::WindowNotFound(parent))?;
        let id = WindowId(self.next_id);
        self.next_id += 1;
        parent_window.children.push(id);

        let mut window = Window::new(id, Some(parent), geometry);
        window.class = class;
        window.owner = owner;
        self.windows.insert(id, window);
        debug!("created {id} under {parent}");
        Ok(id)
    }

    /// Remove `id` and its whole subtree. Returns the removed ids, deepest
    /// last. The root cannot be destroyed.
    pub fn destroy(&mut self, id: WindowId) -> Result<Vec<WindowId>, CoreError> {
        let window = self
            .windows
            .get(&id)
            .ok_or(CoreError::WindowNotFound(id))?;
        let Some(parent) = window.parent else {
            return Err(CoreError::WindowNotFound(id));
        };
        if let Some(p) = self.windows.get_mut(&parent) {
            p.children.retain(|&c| c != id);
        }

        let mut removed = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(w) = self.windows.shift_remove(&next) {
                pending.extend(w.children);
                removed.push(next);
            }
        }
        debug!("destroyed {} window(s) rooted at {id}", removed.len());
        Ok(removed)
    }

    pub fn set_mapped(&mut self, id: WindowId, mapped: bool) -> Result<(), CoreError> {
        let window = self
            .windows
            .get_mut(&id)
            .ok_or(CoreError::WindowNotFound(id))?;
        if window.parent.is_some() {
            window.mapped = mapped;
        }
        Ok(())
    }

    /// A window is viewable when it and all its ancestors are mapped.
    pub fn is_viewable(&self, id: WindowId) -> bool {
        let mut current = Some(id);
        while let Some(wid) = current {
            match self.windows.get(&wid) {
                Some(w) if w.mapped => current = w.parent,
                _ => return false,
            }
        }
        true
    }

    /// True when `id` is `ancestor` or lies somewhere beneath it.
    pub fn is_inside(&self, id: WindowId, ancestor: WindowId) -> bool {
        let mut current = Some(id);
        while let Some(wid) = current {
            if wid == ancestor {
                return true;
            }
            current = self.parent(wid);
        }
        false
    }

    /// Deepest mapped window containing the screen point. Later children
    /// are stacked above earlier ones.
    pub fn window_at(&self, x: i32, y: i32) -> WindowId {
        let mut current = ROOT_WINDOW_ID;
        'descend: loop {
            let Some(window) = self.windows.get(&current) else {
                return ROOT_WINDOW_ID;
            };
            for &child in window.children.iter().rev() {
                if let Some(c) = self.windows.get(&child) {
                    if c.mapped && c.geometry.contains(x, y) {
                        current = child;
                        continue 'descend;
                    }
                }
            }
            return current;
        }
    }

    /// Subscription number `index` on `id`, if any.
    pub fn subscription(&self, id: WindowId, index: usize) -> Option<Subscription> {
        self.windows
            .get(&id)
            .and_then(|w| w.subscriptions.get(index).copied())
    }

    pub fn subscription_count(&self, id: WindowId) -> usize {
        self.windows.get(&id).map_or(0, |w| w.subscriptions.len())
    }

    /// Set `client`'s selection on `id`, replacing any previous mask. An empty
    /// mask removes the subscription.
    pub fn select(
        &mut self,
        id: WindowId,
        client: ClientId,
        mask: EventMask,
    ) -> Result<(), CoreError> {
        let window = self
            .windows
            .get_mut(&id)
            .ok_or(CoreError::WindowNotFound(id))?;
        if let Some(existing) = window.subscriptions.iter_mut().find(|s| s.client == client) {
            existing.mask = mask;
        } else if !mask.is_empty() {
            window.subscriptions.push(Subscription { client, mask });
        }
        window.subscriptions.retain(|s| !s.mask.is_empty());
        Ok(())
    }

    /// Remove every subscription held by `client`.
    pub fn drop_client(&mut self, client: ClientId) {
        for window in self.windows.values_mut() {
            window.subscriptions.retain(|s| s.client != client);
            if window.owner == Some(client) {
                window.owner = None;
            }
        }
    }
}

//! Hearth Core — event delivery for a small-footprint windowing server
//!
//! This crate turns raw pointer and keyboard status into typed, per-client
//! event records, routes them through the window tree according to
//! subscription masks and grabs, and manages the records' lifetime in a
//! bounded pool. It never draws and never talks to a transport: clients pop
//! records from their queue, and everything the rest of the server must do
//! comes back as a [`ServerAction`].
//!
//! # Quick Start
//! ```
//! use hearth_core::config::Config;
//! use hearth_core::event::{EventMask, EventType};
//! use hearth_core::state::{Buttons, Geometry};
//! use hearth_core::window::WindowClass;
//! use hearth_core::EventCore;
//!
//! let mut core = EventCore::new(Config::default());
//! let client = core.connect_client("demo");
//! let root = core.windows.root();
//! let wid = core
//!     .create_window(root, Geometry::new(0, 0, 100, 100), WindowClass::InputOutput, Some(client))
//!     .unwrap();
//! core.map_window(wid).unwrap();
//! core.select_events(wid, client, EventMask::BUTTON_DOWN | EventMask::BUTTON_UP).unwrap();
//!
//! core.handle_pointer_status(10, 10, Buttons::LEFT);
//! assert_eq!(core.input.grab_window, Some(wid));
//! assert!(core
//!     .queued(client)
//!     .any(|e| e.event_type() == EventType::ButtonDown));
//! ```

pub mod client;
pub mod config;
pub mod deliver;
pub mod device;
pub mod error;
pub mod event;
pub mod grab;
pub mod invariants;
pub mod poll;
pub mod pool;
pub mod report;
pub mod state;
pub mod window;

// Re-export primary API types at crate root
pub use client::ClientId;
pub use error::{CoreError, ErrorCode};
pub use event::{Event, EventMask, EventType, ServerAction};
pub use window::WindowId;

use std::time::Instant;

use indexmap::IndexMap;
use tracing::{info, trace, warn};

use client::Client;
use config::Config;
use event::Key;
use grab::{GrabKind, KeyGrab, KeyGrabList};
use pool::EventPool;
use state::{Geometry, InputState};
use window::{WindowClass, WindowTree};

/// The event delivery engine.
///
/// Owns all routing state. Every operation takes `&mut self`, so exclusive
/// access covers allocation, free-list splicing and coalescing. A feeder on
/// another thread shares the engine as `Arc<Mutex<EventCore>>`.
pub struct EventCore {
    pub config: Config,
    /// Pointer, keyboard, focus and grab tracking
    pub input: InputState,
    pub windows: WindowTree,
    /// Reserved keys, in scan order
    pub grabs: KeyGrabList,
    pool: EventPool,
    clients: IndexMap<ClientId, Client>,
    next_client: u32,
    /// Client on whose behalf the server is currently working
    current_client: Option<ClientId>,
    /// Name of the request being served, for error records
    current_op: Option<&'static str>,
    actions: Vec<ServerAction>,
    epoch: Instant,
    /// Shutdown requested
    pub should_exit: bool,
}

impl EventCore {
    pub fn new(config: Config) -> Self {
        let pool = EventPool::new(config.pool.capacity, config.pool.preallocate);
        let windows = WindowTree::new(config.screen.geometry());
        let mut input = InputState::new(windows.root());
        input.raw_mode = config.pointer.raw_mode;

        Self {
            config,
            input,
            windows,
            grabs: KeyGrabList::new(),
            pool,
            clients: IndexMap::new(),
            next_client: 1,
            current_client: None,
            current_op: None,
            actions: Vec::new(),
            epoch: Instant::now(),
            should_exit: false,
        }
    }

    // ── Clients ──────────────────────────────────────────────────────

    pub fn connect_client(&mut self, name: impl Into<String>) -> ClientId {
        let id = ClientId(self.next_client);
        self.next_client += 1;
        let client = Client::new(id, name.into(), self.config.pool.client_queue_limit);
        info!("{id} connected ({})", client.name);
        self.clients.insert(id, client);
        id
    }

    /// Disconnect a client, returning its queued records to the pool and
    /// dropping its subscriptions and key grabs.
    pub fn disconnect_client(&mut self, id: ClientId) -> Result<(), CoreError> {
        let mut client = self
            .clients
            .shift_remove(&id)
            .ok_or(CoreError::ClientNotFound(id))?;
        self.pool.drain(&mut client.queue);
        self.windows.drop_client(id);
        self.grabs.drop_client(id);
        if self.current_client == Some(id) {
            self.current_client = None;
            self.current_op = None;
        }
        info!("{id} disconnected ({})", client.name);
        Ok(())
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn set_queue_limit(&mut self, id: ClientId, limit: Option<usize>) -> Result<(), CoreError> {
        let client = self
            .clients
            .get_mut(&id)
            .ok_or(CoreError::ClientNotFound(id))?;
        client.queue_limit = limit;
        Ok(())
    }

    /// Mark `client` as the one being served, with the request name used in
    /// error records. `None` clears the context.
    pub fn set_current_client(&mut self, client: Option<ClientId>, op: Option<&'static str>) {
        self.current_client = client;
        self.current_op = op;
    }

    pub const fn current_client(&self) -> Option<ClientId> {
        self.current_client
    }

    /// Pop the oldest queued record for `client`.
    pub fn next_event(&mut self, client: ClientId) -> Option<Event> {
        let c = self.clients.get_mut(&client)?;
        self.pool.pop_front(&mut c.queue)
    }

    pub fn peek_event(&self, client: ClientId) -> Option<&Event> {
        let c = self.clients.get(&client)?;
        c.queue.front().map(|&h| &self.pool[h])
    }

    /// Queued records for `client`, oldest first.
    pub fn queued(&self, client: ClientId) -> impl Iterator<Item = &Event> + '_ {
        self.clients
            .get(&client)
            .into_iter()
            .flat_map(move |c| c.queue.iter().map(move |&h| &self.pool[h]))
    }

    pub fn queue_len(&self, client: ClientId) -> usize {
        self.clients.get(&client).map_or(0, |c| c.queue.len())
    }

    pub const fn pool(&self) -> &EventPool {
        &self.pool
    }

    // ── Windows ──────────────────────────────────────────────────────

    pub fn create_window(
        &mut self,
        parent: WindowId,
        geometry: Geometry,
        class: WindowClass,
        owner: Option<ClientId>,
    ) -> Result<WindowId, CoreError> {
        self.windows.create(parent, geometry, class, owner)
    }

    /// Destroy a window and its subtree, forgetting every reference the
    /// routing state holds to the removed windows.
    pub fn destroy_window(&mut self, id: WindowId) -> Result<(), CoreError> {
        let parent = self.windows.parent(id);
        let removed = self.windows.destroy(id)?;
        for wid in &removed {
            self.grabs.drop_window(*wid);
        }
        if self.input.grab_window.is_some_and(|g| removed.contains(&g)) {
            self.input.grab_window = None;
        }
        if removed.contains(&self.input.focus_window) {
            self.input.focus_window = parent.unwrap_or_else(|| self.windows.root());
        }
        if removed.contains(&self.input.mouse_window) {
            self.input.mouse_window = self.windows.root();
        }
        self.check_mouse_window();
        Ok(())
    }

    pub fn map_window(&mut self, id: WindowId) -> Result<(), CoreError> {
        self.windows.set_mapped(id, true)?;
        let area = self.windows.get(id).map(|w| w.geometry).unwrap_or_default();
        self.deliver_update(id, event::UpdateKind::Map, area);
        self.check_mouse_window();
        Ok(())
    }

    pub fn unmap_window(&mut self, id: WindowId) -> Result<(), CoreError> {
        self.windows.set_mapped(id, false)?;
        let area = self.windows.get(id).map(|w| w.geometry).unwrap_or_default();
        self.deliver_update(id, event::UpdateKind::Unmap, area);
        self.check_mouse_window();
        Ok(())
    }

    pub fn set_no_propagate(&mut self, id: WindowId, mask: EventMask) -> Result<(), CoreError> {
        let window = self
            .windows
            .get_mut(id)
            .ok_or(CoreError::WindowNotFound(id))?;
        window.no_propagate = mask;
        Ok(())
    }

    /// Set `client`'s event selection on `wid`.
    pub fn select_events(
        &mut self,
        wid: WindowId,
        client: ClientId,
        mask: EventMask,
    ) -> Result<(), CoreError> {
        if !self.clients.contains_key(&client) {
            return Err(CoreError::ClientNotFound(client));
        }
        self.windows.select(wid, client, mask)
    }

    /// Move keyboard focus, telling the old and new windows.
    pub fn set_focus(&mut self, id: WindowId) -> Result<(), CoreError> {
        if !self.windows.contains(id) {
            return Err(CoreError::WindowNotFound(id));
        }
        let old = self.input.focus_window;
        if old == id {
            return Ok(());
        }
        self.input.focus_window = id;
        self.deliver_general(old, EventType::FocusOut, Some(id));
        self.deliver_general(id, EventType::FocusIn, Some(old));
        Ok(())
    }

    pub fn set_raw_mode(&mut self, raw: bool) {
        self.input.raw_mode = raw;
    }

    // ── Key grabs ────────────────────────────────────────────────────

    pub fn grab_key(
        &mut self,
        key: Key,
        kind: GrabKind,
        owner: ClientId,
        wid: WindowId,
    ) -> Result<(), CoreError> {
        if !self.clients.contains_key(&owner) {
            return Err(CoreError::ClientNotFound(owner));
        }
        if !self.windows.contains(wid) {
            return Err(CoreError::WindowNotFound(wid));
        }
        self.grabs.grab(KeyGrab {
            key,
            kind,
            owner,
            wid,
        })
    }

    pub fn ungrab_key(&mut self, key: Key, owner: ClientId, wid: WindowId) -> bool {
        self.grabs.ungrab(key, owner, wid)
    }

    // ── Host actions ─────────────────────────────────────────────────

    /// Take the actions accumulated since the last call.
    pub fn take_actions(&mut self) -> Vec<ServerAction> {
        std::mem::take(&mut self.actions)
    }

    pub(crate) fn push_action(&mut self, action: ServerAction) {
        self.actions.push(action);
    }

    pub(crate) fn reset_screensaver(&mut self) {
        if !self.actions.contains(&ServerAction::ResetScreenSaver) {
            self.actions.push(ServerAction::ResetScreenSaver);
        }
    }

    pub(crate) fn request_termination(&mut self) {
        info!("termination requested");
        self.should_exit = true;
        self.push_action(ServerAction::Terminate);
    }

    /// Move the cursor and re-evaluate the window under it.
    pub(crate) fn move_cursor(&mut self, x: i32, y: i32) {
        self.input.cursor = (x, y);
        self.push_action(ServerAction::MoveCursor { x, y });
        self.check_mouse_window();
    }

    /// Recompute the window under the pointer, sending exit/enter on change.
    pub(crate) fn check_mouse_window(&mut self) {
        let (x, y) = self.input.cursor;
        let new = self.windows.window_at(x, y);
        let old = self.input.mouse_window;
        if new == old {
            return;
        }
        trace!("pointer window {old} -> {new}");
        self.input.mouse_window = new;
        self.deliver_general(old, EventType::MouseExit, Some(new));
        self.deliver_general(new, EventType::MouseEnter, Some(old));
    }

    /// Milliseconds since the core was created.
    pub(crate) fn timestamp(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }

    // ── Pool access ──────────────────────────────────────────────────

    /// Allocate a record on `client`'s queue and fill it with `event`.
    ///
    /// On failure an allocation error is reported on `client`'s behalf (which
    /// only logs) and the event is dropped.
    pub(crate) fn post(&mut self, client: ClientId, event: Event) -> Result<(), CoreError> {
        let Some(c) = self.clients.get_mut(&client) else {
            return Err(CoreError::ClientNotFound(client));
        };
        match self.pool.allocate(&mut c.queue, c.queue_limit) {
            Ok(handle) => {
                trace!("queue {:?} for {client}", event.event_type());
                self.pool[handle] = event;
                Ok(())
            }
            Err(err) => {
                let previous = self.current_client.replace(client);
                self.report_failure(&err, 0);
                self.current_client = previous;
                Err(err)
            }
        }
    }

    /// Drop the first queued record of `client` matching `pred`.
    pub(crate) fn release_first<F>(&mut self, client: ClientId, pred: F) -> bool
    where
        F: FnMut(&Event) -> bool,
    {
        match self.clients.get_mut(&client) {
            Some(c) => self.pool.release_first(&mut c.queue, pred),
            None => false,
        }
    }

    /// Validate core invariants. See `invariants` module.
    pub fn validate_invariants(&self) -> Result<(), invariants::InvariantError> {
        invariants::validate(self)
    }

    pub(crate) fn debug_validate(&self, context: &str) {
        if cfg!(debug_assertions) {
            if let Err(e) = self.validate_invariants() {
                warn!("Invariant violation after {}: {}", context, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_send<T: Send>() {}

    #[test]
    fn core_can_cross_threads() {
        assert_send::<EventCore>();
    }

    #[test]
    fn disconnect_returns_records_to_pool() {
        let mut core = EventCore::new(Config::default());
        let client = core.connect_client("c");
        core.select_events(core.windows.root(), client, EventMask::SCREENSAVER)
            .unwrap();
        core.deliver_screensaver(true);
        core.deliver_screensaver(false);
        assert_eq!(core.queue_len(client), 2);
        let free_before = core.pool().free_len();
        core.disconnect_client(client).unwrap();
        assert_eq!(core.pool().free_len(), free_before + 2);
        assert_eq!(core.windows.subscription_count(core.windows.root()), 0);
        assert_eq!(
            core.disconnect_client(client),
            Err(CoreError::ClientNotFound(client))
        );
    }

    #[test]
    fn focus_change_notifies_both_windows() {
        let mut core = EventCore::new(Config::default());
        let client = core.connect_client("c");
        let root = core.windows.root();
        let w = core
            .create_window(root, Geometry::new(0, 0, 10, 10), WindowClass::InputOutput, None)
            .unwrap();
        core.select_events(root, client, EventMask::FOCUS_OUT).unwrap();
        core.select_events(w, client, EventMask::FOCUS_IN).unwrap();
        core.set_focus(w).unwrap();
        let kinds: Vec<_> = core.queued(client).map(Event::event_type).collect();
        assert_eq!(kinds, vec![EventType::FocusOut, EventType::FocusIn]);
        assert_eq!(core.set_focus(WindowId(99)), Err(CoreError::WindowNotFound(WindowId(99))));
    }

    #[test]
    fn destroying_focus_window_moves_focus_to_parent() {
        let mut core = EventCore::new(Config::default());
        let root = core.windows.root();
        let a = core
            .create_window(root, Geometry::new(0, 0, 10, 10), WindowClass::InputOutput, None)
            .unwrap();
        let b = core
            .create_window(a, Geometry::new(0, 0, 5, 5), WindowClass::InputOutput, None)
            .unwrap();
        core.set_focus(b).unwrap();
        core.destroy_window(a).unwrap();
        assert_eq!(core.input.focus_window, root);
    }
}

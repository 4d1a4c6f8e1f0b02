use tracing::{trace, warn};

use crate::client::ClientId;
use crate::error::{CoreError, ErrorCode};
use crate::event::{ClientDataEvent, Event, EventMask, EventType, GeneralEvent, UpdateEvent, UpdateKind};
use crate::state::Geometry;
use crate::window::WindowId;
use crate::EventCore;

impl EventCore {
    /// Clients on `wid` whose selection intersects `mask`, in subscription
    /// order. Empty for unknown windows.
    fn subscribers(&self, wid: WindowId, mask: EventMask) -> Vec<ClientId> {
        self.windows.get(wid).map_or_else(Vec::new, |w| {
            w.subscriptions
                .iter()
                .filter(|s| s.mask.intersects(mask))
                .map(|s| s.client)
                .collect()
        })
    }

    /// Post a copy of `event` to every client in `clients`, carrying on past
    /// failed allocations.
    fn broadcast(&mut self, clients: Vec<ClientId>, event: &Event) {
        for client in clients {
            // `post` has already logged any failure.
            let _ = self.post(client, event.clone());
        }
    }

    /// Tell `wid`'s clients that `area` needs repainting.
    ///
    /// Nothing is sent for unmapped or input-only windows. Any exposure still
    /// queued for `wid` that lies inside `area` is dropped first.
    pub fn deliver_exposure(&mut self, wid: WindowId, area: Geometry) {
        let Some(window) = self.windows.get(wid) else {
            return;
        };
        if !window.is_output() || !self.windows.is_viewable(wid) {
            trace!("exposure on hidden {wid} skipped");
            return;
        }

        for client in self.subscribers(wid, EventMask::EXPOSURE) {
            self.release_first(client, |e| e.is_exposure_within(wid, area));
            let _ = self.post(client, Event::Exposure { wid, area });
        }
    }

    /// Report a change to window `wid`: first to its own update subscribers,
    /// then to its parent's child-update subscribers. `area` is absolute and
    /// is reported relative to the parent.
    pub fn deliver_update(&mut self, wid: WindowId, update: UpdateKind, area: Geometry) {
        let Some(window) = self.windows.get(wid) else {
            return;
        };
        let parent = window.parent;
        let area = match parent.and_then(|p| self.windows.get(p)) {
            Some(p) => area.translate(-p.geometry.x, -p.geometry.y),
            None => area,
        };

        let own = Event::Update(UpdateEvent {
            kind: EventType::Update,
            update,
            wid,
            subwid: wid,
            area,
        });
        let clients = self.subscribers(wid, EventMask::UPDATE);
        self.broadcast(clients, &own);

        let Some(parent) = parent else {
            return;
        };
        let child = Event::Update(UpdateEvent {
            kind: EventType::ChildUpdate,
            update,
            wid: parent,
            subwid: wid,
            area,
        });
        let clients = self.subscribers(parent, EventMask::CHILD_UPDATE);
        self.broadcast(clients, &child);
    }

    /// Send a focus, enter, exit or close-request style event to `wid`'s
    /// subscribers. Does not propagate.
    pub fn deliver_general(&mut self, wid: WindowId, kind: EventType, other: Option<WindowId>) {
        let mask = kind.mask();
        if mask.is_empty() {
            return;
        }
        let Some(window) = self.windows.get(wid) else {
            return;
        };
        let (root_x, root_y) = self.input.cursor;
        let event = Event::General(GeneralEvent {
            kind,
            wid,
            other,
            root_x,
            root_y,
            x: root_x - window.geometry.x,
            y: root_y - window.geometry.y,
        });
        let clients = self.subscribers(wid, mask);
        self.broadcast(clients, &event);
    }

    /// Tell every window selecting for it that the screen orientation
    /// changed.
    pub fn deliver_portrait_changed(&mut self) {
        let (root_x, root_y) = self.input.cursor;
        let targets: Vec<(WindowId, Geometry)> = self
            .windows
            .iter()
            .filter(|w| {
                w.subscriptions
                    .iter()
                    .any(|s| s.mask.intersects(EventMask::PORTRAIT_CHANGED))
            })
            .map(|w| (w.id, w.geometry))
            .collect();

        for (wid, geometry) in targets {
            let event = Event::General(GeneralEvent {
                kind: EventType::PortraitChanged,
                wid,
                other: None,
                root_x,
                root_y,
                x: root_x - geometry.x,
                y: root_y - geometry.y,
            });
            let clients = self.subscribers(wid, EventMask::PORTRAIT_CHANGED);
            self.broadcast(clients, &event);
        }
    }

    /// Screen saver state change, sent to every root window subscriber.
    pub fn deliver_screensaver(&mut self, activate: bool) {
        let clients = self.subscribers(self.windows.root(), EventMask::SCREENSAVER);
        self.broadcast(clients, &Event::ScreenSaver { activate });
    }

    /// Selection ownership moved away from `old_owner`.
    pub fn deliver_selection_changed(&mut self, old_owner: WindowId, new_owner: Option<WindowId>) {
        let clients = self.subscribers(old_owner, EventMask::SELECTION_CHANGED);
        self.broadcast(clients, &Event::SelectionChanged { new_owner });
    }

    /// Ask `wid`'s clients to send data of `mime_type` to `rid`.
    pub fn deliver_client_data_request(
        &mut self,
        wid: WindowId,
        rid: WindowId,
        serial: u32,
        mime_type: u32,
    ) {
        let event = Event::ClientDataReq {
            wid,
            rid,
            serial,
            mime_type,
        };
        let clients = self.subscribers(wid, EventMask::CLIENT_DATA_REQ);
        self.broadcast(clients, &event);
    }

    /// Hand one chunk of a client-to-client transfer to `wid`'s clients.
    ///
    /// Each receiving client gets its own copy of `data`. When a copy cannot
    /// be made, that client gets a [`ErrorCode::MallocFailed`] report instead
    /// and delivery moves on to the next client.
    pub fn deliver_client_data(
        &mut self,
        wid: WindowId,
        rid: WindowId,
        serial: u32,
        total_len: u32,
        data: &[u8],
    ) {
        for client in self.subscribers(wid, EventMask::CLIENT_DATA) {
            let copy = match self.copy_payload(data) {
                Ok(copy) => copy,
                Err(err) => {
                    warn!("client data for {client} on {wid} dropped: {err}");
                    let previous = self.current_client;
                    self.current_client = Some(client);
                    self.report_error(ErrorCode::MallocFailed, wid.0);
                    self.current_client = previous;
                    continue;
                }
            };
            let event = Event::ClientData(ClientDataEvent {
                wid,
                rid,
                serial,
                total_len,
                data: copy,
            });
            let _ = self.post(client, event);
        }
    }

    fn copy_payload(&self, data: &[u8]) -> Result<Vec<u8>, CoreError> {
        if data.len() > self.config.pool.client_data_limit {
            return Err(CoreError::AllocationFailure);
        }
        let mut copy = Vec::new();
        copy.try_reserve_exact(data.len())
            .map_err(|_| CoreError::AllocationFailure)?;
        copy.extend_from_slice(data);
        Ok(copy)
    }

    /// Timer `tid` fired; only `client`, and only if it selected for timers
    /// on `wid`, hears about it.
    pub fn deliver_timer(&mut self, client: ClientId, wid: WindowId, tid: u32) {
        let selected = self
            .windows
            .get(wid)
            .is_some_and(|w| w.mask_for(client).contains(EventMask::TIMER));
        if selected {
            // Dropped when the pool is exhausted.
            let _ = self.post(client, Event::Timer { wid, tid });
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::config::Config;
    use crate::event::{Event, EventMask, EventType, UpdateKind};
    use crate::state::Geometry;
    use crate::window::WindowClass;
    use crate::EventCore;

    #[test]
    fn general_event_carries_window_relative_cursor() {
        let mut core = EventCore::new(Config::default());
        let client = core.connect_client("c");
        let root = core.windows.root();
        let w = core
            .create_window(root, Geometry::new(100, 50, 10, 10), WindowClass::InputOutput, None)
            .unwrap();
        core.select_events(w, client, EventMask::CLOSE_REQUEST).unwrap();
        core.input.cursor = (105, 52);
        core.deliver_general(w, EventType::CloseRequest, None);
        match core.next_event(client) {
            Some(Event::General(e)) => {
                assert_eq!((e.root_x, e.root_y), (105, 52));
                assert_eq!((e.x, e.y), (5, 2));
                assert_eq!(e.other, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn timer_reaches_only_the_registering_client() {
        let mut core = EventCore::new(Config::default());
        let a = core.connect_client("a");
        let b = core.connect_client("b");
        let root = core.windows.root();
        core.select_events(root, a, EventMask::TIMER).unwrap();
        core.select_events(root, b, EventMask::TIMER).unwrap();
        core.deliver_timer(a, root, 9);
        assert_eq!(core.queue_len(a), 1);
        assert_eq!(core.queue_len(b), 0);
    }

    #[test]
    fn update_area_is_parent_relative() {
        let mut core = EventCore::new(Config::default());
        let client = core.connect_client("c");
        let root = core.windows.root();
        let parent = core
            .create_window(root, Geometry::new(10, 20, 100, 100), WindowClass::InputOutput, None)
            .unwrap();
        let child = core
            .create_window(parent, Geometry::new(15, 25, 5, 5), WindowClass::InputOutput, None)
            .unwrap();
        core.select_events(parent, client, EventMask::CHILD_UPDATE).unwrap();
        core.deliver_update(child, UpdateKind::Move, Geometry::new(15, 25, 5, 5));
        match core.next_event(client) {
            Some(Event::Update(e)) => {
                assert_eq!(e.kind, EventType::ChildUpdate);
                assert_eq!(e.wid, parent);
                assert_eq!(e.subwid, child);
                assert_eq!(e.area, Geometry::new(5, 5, 5, 5));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn selection_change_goes_to_previous_owner() {
        let mut core = EventCore::new(Config::default());
        let client = core.connect_client("c");
        let root = core.windows.root();
        let old = core
            .create_window(root, Geometry::new(0, 0, 5, 5), WindowClass::InputOutput, None)
            .unwrap();
        let new = core
            .create_window(root, Geometry::new(0, 0, 5, 5), WindowClass::InputOutput, None)
            .unwrap();
        core.select_events(new, client, EventMask::SELECTION_CHANGED).unwrap();
        core.deliver_selection_changed(old, Some(new));
        assert_eq!(core.queue_len(client), 0);
        core.select_events(old, client, EventMask::SELECTION_CHANGED).unwrap();
        core.deliver_selection_changed(old, Some(new));
        assert_eq!(
            core.next_event(client),
            Some(Event::SelectionChanged { new_owner: Some(new) })
        );
    }
}

//! Event record pool.
//!
//! Records live in a slot arena and are addressed by [`EventHandle`]. A slot
//! is either on the free list or in exactly one client queue. Released slots
//! are recycled before the arena grows, and growth is bounded by the
//! configured capacity and by fallible reservation, so exhaustion surfaces as
//! [`CoreError::AllocationFailure`] rather than an abort.

use std::collections::VecDeque;
use std::ops::{Index, IndexMut};

use crate::error::CoreError;
use crate::event::Event;

/// Index of a slot in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHandle(u32);

impl EventHandle {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A client's FIFO of queued records.
pub type EventQueue = VecDeque<EventHandle>;

#[derive(Debug, Default)]
pub struct EventPool {
    slots: Vec<Event>,
    free: Vec<EventHandle>,
    capacity: Option<usize>,
}

impl EventPool {
    /// Create a pool holding at most `capacity` records (unbounded when
    /// `None`), with `preallocate` slots ready on the free list.
    pub fn new(capacity: Option<usize>, preallocate: usize) -> Self {
        let mut pool = Self {
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
        };
        let count = capacity.map_or(preallocate, |cap| preallocate.min(cap));
        for _ in 0..count {
            if pool.grow().is_err() {
                break;
            }
        }
        // Hand out low indices first.
        pool.free.reverse();
        pool
    }

    fn grow(&mut self) -> Result<EventHandle, CoreError> {
        if self.capacity.is_some_and(|cap| self.slots.len() >= cap) {
            return Err(CoreError::AllocationFailure);
        }
        let index = u32::try_from(self.slots.len()).map_err(|_| CoreError::AllocationFailure)?;
        self.slots
            .try_reserve(1)
            .map_err(|_| CoreError::AllocationFailure)?;
        self.free
            .try_reserve(1)
            .map_err(|_| CoreError::AllocationFailure)?;
        self.slots.push(Event::None);
        let handle = EventHandle(index);
        self.free.push(handle);
        Ok(handle)
    }

    /// Take a slot and append it to `queue`. The returned record is of type
    /// `none`; the caller fills it in.
    pub fn allocate(
        &mut self,
        queue: &mut EventQueue,
        queue_limit: Option<usize>,
    ) -> Result<EventHandle, CoreError> {
        if queue_limit.is_some_and(|limit| queue.len() >= limit) {
            return Err(CoreError::AllocationFailure);
        }
        queue
            .try_reserve(1)
            .map_err(|_| CoreError::AllocationFailure)?;

        if self.free.is_empty() {
            self.grow()?;
        }
        let handle = self.free.pop().ok_or(CoreError::AllocationFailure)?;
        self.slots[handle.index()] = Event::None;
        queue.push_back(handle);
        Ok(handle)
    }

    /// Remove the first queued record matching `pred` and recycle its slot.
    /// Returns whether a record was removed.
    pub fn release_first<F>(&mut self, queue: &mut EventQueue, mut pred: F) -> bool
    where
        F: FnMut(&Event) -> bool,
    {
        let Some(pos) = queue.iter().position(|&h| pred(&self.slots[h.index()])) else {
            return false;
        };
        if let Some(handle) = queue.remove(pos) {
            self.recycle(handle);
        }
        true
    }

    /// Dequeue the oldest record, recycling its slot.
    pub fn pop_front(&mut self, queue: &mut EventQueue) -> Option<Event> {
        let handle = queue.pop_front()?;
        let event = std::mem::take(&mut self.slots[handle.index()]);
        self.free.push(handle);
        Some(event)
    }

    /// Return every queued slot to the free list.
    pub fn drain(&mut self, queue: &mut EventQueue) {
        while let Some(handle) = queue.pop_front() {
            self.recycle(handle);
        }
    }

    fn recycle(&mut self, handle: EventHandle) {
        // Drop any payload now rather than when the slot is reused.
        self.slots[handle.index()] = Event::None;
        self.free.push(handle);
    }

    /// Total slots ever created.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    pub fn free_handles(&self) -> &[EventHandle] {
        &self.free
    }

    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Index<EventHandle> for EventPool {
    type Output = Event;

    fn index(&self, handle: EventHandle) -> &Event {
        &self.slots[handle.index()]
    }
}

impl IndexMut<EventHandle> for EventPool {
    fn index_mut(&mut self, handle: EventHandle) -> &mut Event {
        &mut self.slots[handle.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use crate::window::WindowId;
    use pretty_assertions::assert_eq;

    fn timer(tid: u32) -> Event {
        Event::Timer {
            wid: WindowId(1),
            tid,
        }
    }

    #[test]
    fn allocation_appends_to_queue_tail() {
        let mut pool = EventPool::new(None, 0);
        let mut queue = EventQueue::new();
        let first = pool.allocate(&mut queue, None).unwrap();
        assert_eq!(pool[first].event_type(), EventType::None);
        pool[first] = timer(1);
        let second = pool.allocate(&mut queue, None).unwrap();
        pool[second] = timer(2);
        assert_eq!(queue, VecDeque::from([first, second]));
        assert_eq!(pool.pop_front(&mut queue), Some(timer(1)));
        assert_eq!(pool.free_len(), 1);
    }

    #[test]
    fn released_slots_are_reused_before_growing() {
        let mut pool = EventPool::new(Some(2), 0);
        let mut queue = EventQueue::new();
        let a = pool.allocate(&mut queue, None).unwrap();
        pool.allocate(&mut queue, None).unwrap();
        assert_eq!(
            pool.allocate(&mut queue, None),
            Err(CoreError::AllocationFailure)
        );
        pool[a] = timer(9);
        assert!(pool.release_first(&mut queue, |e| *e == timer(9)));
        let c = pool.allocate(&mut queue, None).unwrap();
        assert_eq!(c, a);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn release_of_last_record_keeps_tail_consistent() {
        let mut pool = EventPool::new(None, 4);
        let mut queue = EventQueue::new();
        for tid in 0..3 {
            let h = pool.allocate(&mut queue, None).unwrap();
            pool[h] = timer(tid);
        }
        assert!(pool.release_first(&mut queue, |e| *e == timer(2)));
        let h = pool.allocate(&mut queue, None).unwrap();
        pool[h] = timer(3);
        let drained: Vec<_> = std::iter::from_fn(|| pool.pop_front(&mut queue)).collect();
        assert_eq!(drained, vec![timer(0), timer(1), timer(3)]);
    }

    #[test]
    fn queue_limit_fails_allocation() {
        let mut pool = EventPool::new(None, 0);
        let mut queue = EventQueue::new();
        pool.allocate(&mut queue, Some(1)).unwrap();
        assert_eq!(
            pool.allocate(&mut queue, Some(1)),
            Err(CoreError::AllocationFailure)
        );
        assert_eq!(pool.free_len(), 0);
    }

    #[test]
    fn preallocation_respects_capacity() {
        let pool = EventPool::new(Some(3), 10);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.free_len(), 3);
    }

    #[test]
    fn drain_returns_everything() {
        let mut pool = EventPool::new(None, 0);
        let mut queue = EventQueue::new();
        for _ in 0..5 {
            pool.allocate(&mut queue, None).unwrap();
        }
        pool.drain(&mut queue);
        assert!(queue.is_empty());
        assert_eq!(pool.free_len(), 5);
    }
}

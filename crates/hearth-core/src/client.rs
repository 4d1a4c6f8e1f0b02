//! Connected event consumers.

use serde::{Deserialize, Serialize};

use crate::pool::EventQueue;

/// Unique identifier for a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client:{}", self.0)
    }
}

#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Queued records, oldest first.
    pub queue: EventQueue,
    /// Maximum records this client may have queued.
    pub queue_limit: Option<usize>,
}

impl Client {
    pub fn new(id: ClientId, name: String, queue_limit: Option<usize>) -> Self {
        Self {
            id,
            name,
            queue: EventQueue::new(),
            queue_limit,
        }
    }
}

//! Error records for the client being served.

use tracing::{debug, warn};

use crate::error::{CoreError, ErrorCode};
use crate::event::{ErrorEvent, Event};
use crate::EventCore;

impl EventCore {
    /// Queue an error record for the current client.
    ///
    /// Always logged. Nothing is queued without a current client, or for an
    /// allocation failure, since queueing that would need another record.
    pub fn report_error(&mut self, code: ErrorCode, id: u32) {
        match self.current_op {
            Some(op) => warn!("{op}: {} (id {id})", code.describe()),
            None => warn!("{} (id {id})", code.describe()),
        }

        let Some(client) = self.current_client else {
            return;
        };
        if code.is_allocation_failure() {
            return;
        }

        let event = Event::Error(ErrorEvent {
            name: self.current_op,
            code,
            id,
        });
        // Cannot recurse: a failed post reports `MallocFailed`, which stops above.
        let _ = self.post(client, event);
    }

    /// Report a core failure under its error code.
    pub fn report_failure(&mut self, err: &CoreError, id: u32) {
        match err.code() {
            Some(code) => self.report_error(code, id),
            None => debug!("not reported: {err}"),
        }
    }
}

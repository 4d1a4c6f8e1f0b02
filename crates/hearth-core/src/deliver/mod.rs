//! Event routing.
//!
//! Each submodule adds delivery operations to [`EventCore`](crate::EventCore):
//! pointer status and tree walks in `pointer`, keystrokes and key grabs in
//! `keyboard`, and the directly invoked notifications (exposure, update,
//! focus/enter/exit, screensaver, selection, client data, timers) in
//! `notify`.
//!
//! Every path follows the same rules: an event type with an empty mask is
//! never delivered, and a failed allocation for one client never stops
//! delivery to the remaining clients.

mod keyboard;
mod notify;
mod pointer;

//! SETTINGS negotiation.
//!
//! A peer's SETTINGS are applied the moment they are received, but a
//! *locally* sent SETTINGS frame only takes effect once its ACK comes back,
//! so we keep a small pending queue.

use std::collections::VecDeque;

/// The subset of SETTINGS identifiers (RFC 7540 §6.5.2) this core acts on.
#[derive(Copy, Clone, Default, Eq, PartialEq, Debug)]
pub struct SettingsValues {
    pub header_table_size: Option<u32>,
    pub enable_push: Option<bool>,
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: Option<u32>,
    pub max_frame_size: Option<u32>,
    pub max_header_list_size: Option<u32>,
}

/// Tracks locally sent SETTINGS frames awaiting their ACK.
#[derive(Default, Debug)]
pub struct PendingSettings {
    queue: VecDeque<SettingsValues>,
}

impl PendingSettings {
    pub fn new() -> PendingSettings {
        PendingSettings::default()
    }

    /// Record a SETTINGS frame we are about to send locally.
    pub fn push(&mut self, values: SettingsValues) {
        self.queue.push_back(values);
    }

    /// The peer ACKed our oldest outstanding SETTINGS frame; it now takes
    /// effect. Returns `None` if an ACK arrived with nothing outstanding,
    /// which callers should treat as a protocol error: an unmatched ACK
    /// cannot be applied.
    pub fn ack(&mut self) -> Option<SettingsValues> {
        self.queue.pop_front()
    }

    pub fn has_outstanding(&self) -> bool {
        !self.queue.is_empty()
    }
}

//! The state-change event emitted per frame.
//!
//! Rather than handing parsed frames back up to the caller one at a time
//! over an async `Stream`, this core returns a single tagged-union value
//! per frame describing what changed.

use crate::error::Reason;
use crate::stream_id::StreamId;

/// A per-stream flow-control update, reported alongside the connection-level
/// windows when a DATA frame or WINDOW_UPDATE changes both axes at once.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct StreamWindowChange {
    pub stream_id: StreamId,
    pub local_window: i32,
    pub remote_window: i32,
}

/// The result of processing one frame through the connection state machine.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ConnectionStateChange {
    /// A new stream entered the map.
    StreamCreated {
        stream_id: StreamId,
        local_initial_window: u32,
        remote_initial_window: u32,
    },

    /// A stream left the map (reached `closed`).
    StreamClosed {
        stream_id: StreamId,
        conn_local_window: i32,
        conn_remote_window: i32,
        reason: Option<Reason>,
    },

    /// A push-promise response carried END_STREAM: the stream was created
    /// and immediately closed by the same frame.
    StreamCreatedAndClosed { stream_id: StreamId },

    /// A DATA frame or WINDOW_UPDATE changed the connection windows, and
    /// optionally a single stream's windows alongside it.
    FlowControlChange {
        conn_local_window: i32,
        conn_remote_window: i32,
        stream_window_change: Option<StreamWindowChange>,
    },

    /// GOAWAY closed the tail of streams above `last_stream_id`, in
    /// strictly increasing order.
    BulkStreamClosure { stream_ids: Vec<StreamId> },

    /// `INITIAL_WINDOW_SIZE` was re-baselined across every open stream.
    SettingsChanged { stream_window_size_delta: i32 },

    /// A frame was validated and applied but caused no observable change
    /// worth reporting beyond success (e.g. an accepted PING, a local
    /// SETTINGS ACK, or a PRIORITY frame, which this core ignores).
    NoOp,
}

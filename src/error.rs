//! HTTP/2 error codes and the two-axis error taxonomy: stream-scoped vs.
//! connection-scoped.

use std::fmt;

use crate::stream_id::StreamId;

/// An HTTP/2 error code (RFC 7540 §11.4).
///
/// Represented as a newtype over `u32`, not a closed enum, so that an
/// unrecognized or future-reserved code still round-trips through the core
/// instead of being unrepresentable.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Reason(u32);

impl Reason {
    pub const NO_ERROR: Reason = Reason(0x0);
    pub const PROTOCOL_ERROR: Reason = Reason(0x1);
    pub const INTERNAL_ERROR: Reason = Reason(0x2);
    pub const FLOW_CONTROL_ERROR: Reason = Reason(0x3);
    pub const SETTINGS_TIMEOUT: Reason = Reason(0x4);
    pub const STREAM_CLOSED: Reason = Reason(0x5);
    pub const FRAME_SIZE_ERROR: Reason = Reason(0x6);
    pub const REFUSED_STREAM: Reason = Reason(0x7);
    pub const CANCEL: Reason = Reason(0x8);
    pub const COMPRESSION_ERROR: Reason = Reason(0x9);
    pub const CONNECT_ERROR: Reason = Reason(0xa);
    pub const ENHANCE_YOUR_CALM: Reason = Reason(0xb);
    pub const INADEQUATE_SECURITY: Reason = Reason(0xc);
    pub const HTTP_1_1_REQUIRED: Reason = Reason(0xd);

    /// Construct a `Reason` from a raw wire value, including unrecognized ones.
    pub fn from_u32(value: u32) -> Reason {
        Reason(value)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    fn name(&self) -> Option<&'static str> {
        let name = match self.0 {
            0x0 => "NO_ERROR",
            0x1 => "PROTOCOL_ERROR",
            0x2 => "INTERNAL_ERROR",
            0x3 => "FLOW_CONTROL_ERROR",
            0x4 => "SETTINGS_TIMEOUT",
            0x5 => "STREAM_CLOSED",
            0x6 => "FRAME_SIZE_ERROR",
            0x7 => "REFUSED_STREAM",
            0x8 => "CANCEL",
            0x9 => "COMPRESSION_ERROR",
            0xa => "CONNECT_ERROR",
            0xb => "ENHANCE_YOUR_CALM",
            0xc => "INADEQUATE_SECURITY",
            0xd => "HTTP_1_1_REQUIRED",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Debug for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "Reason({:#x})", self.0),
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "unknown error code {:#x}", self.0),
        }
    }
}

/// Flow-control arithmetic failures.
#[derive(Copy, Clone, Eq, PartialEq, Debug, thiserror::Error)]
pub enum FlowControlError {
    #[error("flow control window would exceed the valid range")]
    InvalidFlowControlWindowSize,
    #[error("window increment of zero is not a valid WINDOW_UPDATE")]
    InvalidWindowIncrementSize,
}

/// An error scoped to a single stream: the connection signals it with a
/// RST_STREAM and keeps running.
#[derive(Copy, Clone, Eq, PartialEq, Debug, thiserror::Error)]
#[error("stream error: {reason}")]
pub struct StreamError {
    pub stream_id: StreamId,
    pub reason: Reason,
}

impl StreamError {
    pub fn new(stream_id: StreamId, reason: Reason) -> StreamError {
        StreamError { stream_id, reason }
    }
}

/// An error scoped to the whole connection: the connection signals it with
/// a GOAWAY and transitions to `Closed`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, thiserror::Error)]
#[error("connection error: {reason}")]
pub struct ConnectionError {
    pub reason: Reason,
}

impl ConnectionError {
    pub fn new(reason: Reason) -> ConnectionError {
        ConnectionError { reason }
    }
}

impl From<FlowControlError> for ConnectionError {
    fn from(err: FlowControlError) -> ConnectionError {
        match err {
            FlowControlError::InvalidFlowControlWindowSize => {
                ConnectionError::new(Reason::FLOW_CONTROL_ERROR)
            }
            FlowControlError::InvalidWindowIncrementSize => {
                ConnectionError::new(Reason::PROTOCOL_ERROR)
            }
        }
    }
}

/// The top-level error returned by `receive_frame`/`send_frame`: either the
/// whole connection dies, or just one stream does.
#[derive(Copy, Clone, Eq, PartialEq, Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl CoreError {
    pub fn reason(&self) -> Reason {
        match self {
            CoreError::Connection(e) => e.reason,
            CoreError::Stream(e) => e.reason,
        }
    }

    pub fn connection(reason: Reason) -> CoreError {
        CoreError::Connection(ConnectionError::new(reason))
    }

    pub fn stream(stream_id: StreamId, reason: Reason) -> CoreError {
        CoreError::Stream(StreamError::new(stream_id, reason))
    }
}

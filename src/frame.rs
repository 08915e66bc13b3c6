//! The structured frame value the core consumes.
//!
//! Bit-exact wire framing and HPACK are an external collaborator's
//! responsibility; this module only models the fields the state machine
//! actually inspects: frame type, flags, stream ID, and payload length for
//! flow-control accounting.

use crate::settings::SettingsValues;
use crate::stream_id::StreamId;

/// HTTP/2 frame type octet values (RFC 7540 §11.2).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum FrameType {
    Data = 0x0,
    Headers = 0x1,
    Priority = 0x2,
    RstStream = 0x3,
    Settings = 0x4,
    PushPromise = 0x5,
    Ping = 0x6,
    GoAway = 0x7,
    WindowUpdate = 0x8,
    Continuation = 0x9,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct DataFrame {
    pub stream_id: StreamId,
    pub payload_len: u32,
    /// `Some(padding_len)` when the PADDED flag is set.
    pub padding_len: Option<u8>,
    pub end_stream: bool,
}

impl DataFrame {
    /// Total bytes this frame consumes from the flow-control window:
    /// payload + padding + the pad-length octet itself.
    pub fn flow_controlled_size(&self) -> u32 {
        self.payload_len + self.padding_len.map_or(0, |p| p as u32 + 1)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct HeadersFrame {
    pub stream_id: StreamId,
    pub end_stream: bool,
    pub end_headers: bool,
    /// `true` when the header decoder reports no request/response
    /// pseudo-headers present — this frame is trailers, not initial
    /// headers.
    pub is_trailers: bool,
    /// The parsed `content-length` header value, if present.
    pub content_length: Option<u64>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct PriorityFrame {
    pub stream_id: StreamId,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct RstStreamFrame {
    pub stream_id: StreamId,
    pub error_code: u32,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SettingsFrame {
    pub ack: bool,
    pub values: SettingsValues,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct PushPromiseFrame {
    pub stream_id: StreamId,
    pub promised_stream_id: StreamId,
    pub end_headers: bool,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct PingFrame {
    pub ack: bool,
    pub payload: [u8; 8],
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct GoAwayFrame {
    pub last_stream_id: StreamId,
    pub error_code: u32,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct WindowUpdateFrame {
    pub stream_id: StreamId,
    pub increment: u32,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ContinuationFrame {
    pub stream_id: StreamId,
    pub end_headers: bool,
}

/// A structured HTTP/2 frame, as handed to the core by the frame parser.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Frame {
    Data(DataFrame),
    Headers(HeadersFrame),
    Priority(PriorityFrame),
    RstStream(RstStreamFrame),
    Settings(SettingsFrame),
    PushPromise(PushPromiseFrame),
    Ping(PingFrame),
    GoAway(GoAwayFrame),
    WindowUpdate(WindowUpdateFrame),
    Continuation(ContinuationFrame),
}

impl Frame {
    pub fn stream_id(&self) -> StreamId {
        match self {
            Frame::Data(f) => f.stream_id,
            Frame::Headers(f) => f.stream_id,
            Frame::Priority(f) => f.stream_id,
            Frame::RstStream(f) => f.stream_id,
            Frame::Settings(_) => StreamId::ZERO,
            Frame::PushPromise(f) => f.stream_id,
            Frame::Ping(_) => StreamId::ZERO,
            Frame::GoAway(_) => StreamId::ZERO,
            Frame::WindowUpdate(f) => f.stream_id,
            Frame::Continuation(f) => f.stream_id,
        }
    }

    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Data(_) => FrameType::Data,
            Frame::Headers(_) => FrameType::Headers,
            Frame::Priority(_) => FrameType::Priority,
            Frame::RstStream(_) => FrameType::RstStream,
            Frame::Settings(_) => FrameType::Settings,
            Frame::PushPromise(_) => FrameType::PushPromise,
            Frame::Ping(_) => FrameType::Ping,
            Frame::GoAway(_) => FrameType::GoAway,
            Frame::WindowUpdate(_) => FrameType::WindowUpdate,
            Frame::Continuation(_) => FrameType::Continuation,
        }
    }
}

//! HTTP/2 connection and stream state machine core.
//!
//! This crate owns exactly the state transitions RFC 7540 describes for a
//! connection and its streams: the stream lifecycle (§5.1), flow-control
//! window arithmetic (§6.9), SETTINGS negotiation (§6.5), and GOAWAY-driven
//! quiescence (§6.8). Wire framing, HPACK, TLS, and I/O scheduling are the
//! caller's responsibility — this core consumes already-parsed `Frame`
//! values and returns `ConnectionStateChange` events, nothing more.

pub mod connection;
pub mod error;
pub mod event;
pub mod flow_control;
pub mod frame;
pub mod settings;
pub mod store;
pub mod stream;
pub mod stream_id;

pub use connection::{ConnectionStateMachine, Role};
pub use error::{ConnectionError, CoreError, FlowControlError, Reason, StreamError};
pub use event::{ConnectionStateChange, StreamWindowChange};
pub use flow_control::FlowControlWindow;
pub use frame::Frame;
pub use settings::SettingsValues;
pub use stream::{Stream, StreamState};
pub use stream_id::StreamId;

//! The connection-level state machine.
//!
//! A synchronous `&mut self` API: every inbound or outbound frame produces
//! exactly one `ConnectionStateChange`, rather than a socket being polled
//! for the next event.

use std::collections::VecDeque;

use log::{debug, trace};

use crate::error::{CoreError, Reason};
use crate::event::{ConnectionStateChange, StreamWindowChange};
use crate::flow_control::{FlowControlWindow, DEFAULT_INITIAL_WINDOW_SIZE};
use crate::frame::{self, Frame, FrameType};
use crate::settings::{PendingSettings, SettingsValues};
use crate::store::Store;
use crate::stream::{Stream, StreamState};
use crate::stream_id::StreamId;

/// Which side of the connection this state machine represents.
///
/// With HTTP-semantic concerns (request/response head conversion, push
/// dispatch policy) owned elsewhere, the only thing that differs by role
/// here is which stream-ID parity is "ours".
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    fn is_locally_initiated(&self, id: StreamId) -> bool {
        match self {
            Role::Client => id.is_client_initiated(),
            Role::Server => id.is_server_initiated(),
        }
    }
}

const RECENTLY_RESET_CAPACITY: usize = 32;

/// Top-level connection lifecycle, as a flat enum rather than a cluster of
/// booleans.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Lifecycle {
    Idle,
    PrefaceExchange,
    Active,
    Quiescing,
    Closed,
}

/// The HTTP/2 connection and stream state machine core.
#[derive(Debug)]
pub struct ConnectionStateMachine {
    role: Role,
    lifecycle: Lifecycle,
    store: Store,

    conn_local_window: FlowControlWindow,
    conn_remote_window: FlowControlWindow,

    local_settings: SettingsValues,
    remote_settings: SettingsValues,
    pending_local_settings: PendingSettings,
    local_preface_sent: bool,
    remote_preface_received: bool,

    next_local_stream_id: u32,
    highest_remote_stream_id: StreamId,

    /// Bounded FIFO of streams we RST recently enough that late-arriving
    /// frames for them are absorbed rather than treated as errors.
    recently_reset: VecDeque<StreamId>,

    sent_goaway_last_stream_id: Option<StreamId>,
    received_goaway_last_stream_id: Option<StreamId>,

    local_continuation_stream_id: Option<StreamId>,
    remote_continuation_stream_id: Option<StreamId>,
}

impl ConnectionStateMachine {
    pub fn new(role: Role) -> ConnectionStateMachine {
        ConnectionStateMachine {
            role,
            lifecycle: Lifecycle::Idle,
            store: Store::new(),
            conn_local_window: FlowControlWindow::default(),
            conn_remote_window: FlowControlWindow::default(),
            local_settings: SettingsValues::default(),
            remote_settings: SettingsValues::default(),
            pending_local_settings: PendingSettings::new(),
            local_preface_sent: false,
            remote_preface_received: false,
            next_local_stream_id: if role == Role::Client { 1 } else { 2 },
            highest_remote_stream_id: StreamId::ZERO,
            recently_reset: VecDeque::with_capacity(RECENTLY_RESET_CAPACITY),
            sent_goaway_last_stream_id: None,
            received_goaway_last_stream_id: None,
            local_continuation_stream_id: None,
            remote_continuation_stream_id: None,
        }
    }

    /// Process a frame arriving from the peer.
    pub fn receive_frame(&mut self, frame: Frame) -> Result<ConnectionStateChange, CoreError> {
        self.dispatch(frame, false)
    }

    /// Process a frame this side is about to send.
    pub fn send_frame(&mut self, frame: Frame) -> Result<ConnectionStateChange, CoreError> {
        self.dispatch(frame, true)
    }

    pub fn connection_windows(&self) -> (i32, i32) {
        (self.conn_local_window.value(), self.conn_remote_window.value())
    }

    pub fn stream_windows(&self, id: StreamId) -> Option<(i32, i32)> {
        self.store
            .lookup(id)
            .map(|s| (s.inbound_window.value(), s.outbound_window.value()))
    }

    pub fn is_quiescing(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Quiescing)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Closed)
    }

    /// Begin a locally-initiated graceful shutdown: refuse any further
    /// remote-initiated stream above the highest one already accepted, and
    /// close our own streams the peer won't get to process.
    pub fn goaway(&mut self, reason: Reason, _debug_data: &[u8]) -> ConnectionStateChange {
        let last_stream_id = self.highest_remote_stream_id;
        let frame = frame::GoAwayFrame {
            last_stream_id,
            error_code: reason.as_u32(),
        };
        self.dispatch_goaway(frame, true)
            .unwrap_or(ConnectionStateChange::NoOp)
    }

    /// Unconditionally tear the connection down, dropping every remaining
    /// stream.
    pub fn teardown(&mut self) -> ConnectionStateChange {
        let mut ids: Vec<StreamId> = self.store.iterate().map(|s| s.id).collect();
        ids.sort_by_key(|id| id.as_u32());
        for id in &ids {
            self.store.remove(*id);
        }
        self.lifecycle = Lifecycle::Closed;
        debug!("{:?} connection closed, {} streams dropped", self.role, ids.len());
        ConnectionStateChange::BulkStreamClosure { stream_ids: ids }
    }

    // ===== dispatch =====

    fn dispatch(&mut self, frame: Frame, local: bool) -> Result<ConnectionStateChange, CoreError> {
        if self.lifecycle == Lifecycle::Closed {
            return Err(CoreError::connection(Reason::INTERNAL_ERROR));
        }

        if self.lifecycle == Lifecycle::Idle {
            self.lifecycle = Lifecycle::PrefaceExchange;
        }

        self.guard_preface_legality(&frame)?;
        self.track_continuation(&frame, local)?;

        trace!(
            "{:?} {} {:?} frame stream={:?}",
            self.role,
            if local { "send" } else { "recv" },
            frame.frame_type(),
            frame.stream_id()
        );

        let result = match frame {
            Frame::Headers(f) => self.dispatch_headers(f, local),
            Frame::Data(f) => self.dispatch_data(f, local),
            Frame::Priority(_) => Ok(ConnectionStateChange::NoOp),
            Frame::RstStream(f) => self.dispatch_rst_stream(f, local),
            Frame::Settings(f) => self.dispatch_settings(f, local),
            Frame::PushPromise(f) => self.dispatch_push_promise(f, local),
            Frame::Ping(_) => Ok(ConnectionStateChange::NoOp),
            Frame::GoAway(f) => self.dispatch_goaway(f, local),
            Frame::WindowUpdate(f) => self.dispatch_window_update(f, local),
            Frame::Continuation(_) => Ok(ConnectionStateChange::NoOp),
        };

        if result.is_ok() {
            self.advance_preface(&frame, local);
        }

        result
    }

    /// During preface exchange, only SETTINGS, WINDOW_UPDATE, and PING are
    /// legal; everything else must wait for the initial SETTINGS round-trip
    /// (RFC 7540 §3.5).
    fn guard_preface_legality(&self, frame: &Frame) -> Result<(), CoreError> {
        if self.lifecycle != Lifecycle::PrefaceExchange {
            return Ok(());
        }
        match frame.frame_type() {
            FrameType::Settings | FrameType::WindowUpdate | FrameType::Ping => Ok(()),
            _ => Err(CoreError::connection(Reason::PROTOCOL_ERROR)),
        }
    }

    fn advance_preface(&mut self, frame: &Frame, local: bool) {
        if let Frame::Settings(f) = frame {
            if !f.ack {
                if local {
                    self.local_preface_sent = true;
                } else {
                    self.remote_preface_received = true;
                }
            }
        }

        if self.lifecycle == Lifecycle::PrefaceExchange
            && self.local_preface_sent
            && self.remote_preface_received
        {
            self.lifecycle = Lifecycle::Active;
            debug!("{:?} connection active", self.role);
        }
    }

    /// HEADERS frames may not be interleaved with other frames on other
    /// streams until END_HEADERS arrives; only a CONTINUATION on the same
    /// stream is legal in between (RFC 7540 §6.10).
    fn track_continuation(&mut self, frame: &Frame, local: bool) -> Result<(), CoreError> {
        let expected = if local {
            self.local_continuation_stream_id
        } else {
            self.remote_continuation_stream_id
        };

        if let Some(expected_id) = expected {
            return match frame {
                Frame::Continuation(f) if f.stream_id == expected_id => {
                    if f.end_headers {
                        if local {
                            self.local_continuation_stream_id = None;
                        } else {
                            self.remote_continuation_stream_id = None;
                        }
                    }
                    Ok(())
                }
                _ => Err(CoreError::connection(Reason::PROTOCOL_ERROR)),
            };
        }

        match frame {
            Frame::Headers(f) if !f.end_headers => {
                if local {
                    self.local_continuation_stream_id = Some(f.stream_id);
                } else {
                    self.remote_continuation_stream_id = Some(f.stream_id);
                }
            }
            Frame::PushPromise(f) if !f.end_headers => {
                if local {
                    self.local_continuation_stream_id = Some(f.stream_id);
                } else {
                    self.remote_continuation_stream_id = Some(f.stream_id);
                }
            }
            _ => {}
        }
        Ok(())
    }

    // ===== per-frame-type handlers =====

    fn dispatch_headers(
        &mut self,
        f: frame::HeadersFrame,
        local: bool,
    ) -> Result<ConnectionStateChange, CoreError> {
        let id = f.stream_id;
        let is_new = self.store.lookup(id).is_none();

        if is_new {
            if f.is_trailers {
                return Err(CoreError::connection(Reason::PROTOCOL_ERROR));
            }
            if self.refused_by_goaway(id, local) {
                return Err(CoreError::stream(id, Reason::REFUSED_STREAM));
            }
            self.validate_new_stream_id(id, local)?;
            self.check_concurrency_limit(id, local)?;

            let stream = Stream::new(id, local, self.local_initial_window(), self.remote_initial_window());
            self.store.insert(stream);
        }

        let stream = self.store.lookup_mut(id).expect("just ensured present");
        let was_reserved = matches!(stream.state, StreamState::ReservedLocal | StreamState::ReservedRemote);
        if local {
            stream.send_headers(f.end_stream)?;
        } else {
            stream.recv_headers(f.end_stream, f.content_length)?;
        }

        let closed_now = stream.is_closed();
        if is_new {
            trace!("{:?} stream created id={:?}", self.role, id);
            if closed_now {
                self.store.remove(id);
                return Ok(ConnectionStateChange::StreamCreatedAndClosed { stream_id: id });
            }
            return Ok(ConnectionStateChange::StreamCreated {
                stream_id: id,
                local_initial_window: self.local_initial_window(),
                remote_initial_window: self.remote_initial_window(),
            });
        }

        if closed_now {
            self.store.remove(id);
            // A push-promised stream is already in the map by the time its
            // first real HEADERS arrives, so `is_new` is false here even
            // though this is the frame that both opens and (with END_STREAM)
            // immediately closes it.
            if was_reserved {
                return Ok(ConnectionStateChange::StreamCreatedAndClosed { stream_id: id });
            }
            let (cl, cr) = self.connection_windows();
            return Ok(ConnectionStateChange::StreamClosed {
                stream_id: id,
                conn_local_window: cl,
                conn_remote_window: cr,
                reason: None,
            });
        }

        Ok(ConnectionStateChange::NoOp)
    }

    fn dispatch_data(
        &mut self,
        f: frame::DataFrame,
        local: bool,
    ) -> Result<ConnectionStateChange, CoreError> {
        let id = f.stream_id;
        let size = f.flow_controlled_size();

        if id.is_zero() {
            return Err(CoreError::connection(Reason::PROTOCOL_ERROR));
        }

        if local {
            self.conn_remote_window
                .decrement_by(size)
                .map_err(|_| CoreError::connection(Reason::FLOW_CONTROL_ERROR))?;
        } else {
            self.conn_local_window
                .decrement_by(size)
                .map_err(|_| CoreError::connection(Reason::FLOW_CONTROL_ERROR))?;
        }

        let stream = match self.store.lookup_mut(id) {
            Some(s) => s,
            None if self.recently_reset.contains(&id) => {
                let (cl, cr) = self.connection_windows();
                return Ok(ConnectionStateChange::FlowControlChange {
                    conn_local_window: cl,
                    conn_remote_window: cr,
                    stream_window_change: None,
                });
            }
            None => return Err(CoreError::stream(id, Reason::STREAM_CLOSED)),
        };

        if local {
            stream.send_data(size, f.end_stream)?;
        } else {
            stream.recv_data(size, f.end_stream)?;
        }

        let closed_now = stream.is_closed();
        let (local_window, remote_window) = (stream.inbound_window.value(), stream.outbound_window.value());

        if closed_now {
            self.store.remove(id);
            let (cl, cr) = self.connection_windows();
            return Ok(ConnectionStateChange::StreamClosed {
                stream_id: id,
                conn_local_window: cl,
                conn_remote_window: cr,
                reason: None,
            });
        }

        let (cl, cr) = self.connection_windows();
        Ok(ConnectionStateChange::FlowControlChange {
            conn_local_window: cl,
            conn_remote_window: cr,
            stream_window_change: Some(StreamWindowChange {
                stream_id: id,
                local_window,
                remote_window,
            }),
        })
    }

    fn dispatch_rst_stream(
        &mut self,
        f: frame::RstStreamFrame,
        _local: bool,
    ) -> Result<ConnectionStateChange, CoreError> {
        let id = f.stream_id;
        let stream = match self.store.lookup_mut(id) {
            Some(s) => s,
            None if self.recently_reset.contains(&id) => return Ok(ConnectionStateChange::NoOp),
            None => return Err(CoreError::connection(Reason::PROTOCOL_ERROR)),
        };

        stream.reset()?;
        self.store.remove(id);
        self.remember_recently_reset(id);

        let (cl, cr) = self.connection_windows();
        Ok(ConnectionStateChange::StreamClosed {
            stream_id: id,
            conn_local_window: cl,
            conn_remote_window: cr,
            reason: Some(Reason::from_u32(f.error_code)),
        })
    }

    fn dispatch_settings(
        &mut self,
        f: frame::SettingsFrame,
        local: bool,
    ) -> Result<ConnectionStateChange, CoreError> {
        if f.ack {
            if local {
                return Ok(ConnectionStateChange::NoOp);
            }
            let applied = self
                .pending_local_settings
                .ack()
                .ok_or_else(|| CoreError::connection(Reason::PROTOCOL_ERROR))?;
            let delta = self.apply_initial_window_delta(applied.initial_window_size, true)?;
            self.local_settings = merge_settings(self.local_settings, applied);
            return Ok(ConnectionStateChange::SettingsChanged {
                stream_window_size_delta: delta,
            });
        }

        if local {
            self.pending_local_settings.push(f.values);
            return Ok(ConnectionStateChange::NoOp);
        }

        let delta = self.apply_initial_window_delta(f.values.initial_window_size, false)?;
        self.remote_settings = merge_settings(self.remote_settings, f.values);
        Ok(ConnectionStateChange::SettingsChanged {
            stream_window_size_delta: delta,
        })
    }

    fn dispatch_push_promise(
        &mut self,
        f: frame::PushPromiseFrame,
        local: bool,
    ) -> Result<ConnectionStateChange, CoreError> {
        if self.store.lookup(f.stream_id).is_none() {
            return Err(CoreError::connection(Reason::PROTOCOL_ERROR));
        }
        if self.refused_by_goaway(f.promised_stream_id, local) {
            return Err(CoreError::stream(f.promised_stream_id, Reason::REFUSED_STREAM));
        }

        self.validate_new_stream_id(f.promised_stream_id, local)?;
        self.check_concurrency_limit(f.promised_stream_id, local)?;

        let mut stream = Stream::new(
            f.promised_stream_id,
            local,
            self.local_initial_window(),
            self.remote_initial_window(),
        );
        if local {
            stream.reserve_local()?;
        } else {
            stream.reserve_remote()?;
        }
        self.store.insert(stream);

        Ok(ConnectionStateChange::StreamCreated {
            stream_id: f.promised_stream_id,
            local_initial_window: self.local_initial_window(),
            remote_initial_window: self.remote_initial_window(),
        })
    }

    fn dispatch_goaway(
        &mut self,
        f: frame::GoAwayFrame,
        local: bool,
    ) -> Result<ConnectionStateChange, CoreError> {
        let prior = if local {
            self.sent_goaway_last_stream_id
        } else {
            self.received_goaway_last_stream_id
        };
        if let Some(prior_id) = prior {
            if f.last_stream_id.as_u32() > prior_id.as_u32() {
                return Err(CoreError::connection(Reason::PROTOCOL_ERROR));
            }
        }

        if local {
            self.sent_goaway_last_stream_id = Some(f.last_stream_id);
        } else {
            self.received_goaway_last_stream_id = Some(f.last_stream_id);
        }
        if self.lifecycle == Lifecycle::Active || self.lifecycle == Lifecycle::PrefaceExchange {
            self.lifecycle = Lifecycle::Quiescing;
        }

        let mut ids = self.close_streams_above(f.last_stream_id, !local);
        ids.sort_by_key(|id| id.as_u32());

        trace!(
            "{:?} GOAWAY last_stream_id={:?} closed={:?}",
            self.role,
            f.last_stream_id,
            ids
        );
        Ok(ConnectionStateChange::BulkStreamClosure { stream_ids: ids })
    }

    fn dispatch_window_update(
        &mut self,
        f: frame::WindowUpdateFrame,
        local: bool,
    ) -> Result<ConnectionStateChange, CoreError> {
        let id = f.stream_id;

        if id.is_zero() {
            if local {
                self.conn_local_window
                    .increment_by(f.increment)
                    .map_err(|e| CoreError::Connection(e.into()))?;
            } else {
                self.conn_remote_window
                    .increment_by(f.increment)
                    .map_err(|e| CoreError::Connection(e.into()))?;
            }
            let (cl, cr) = self.connection_windows();
            return Ok(ConnectionStateChange::FlowControlChange {
                conn_local_window: cl,
                conn_remote_window: cr,
                stream_window_change: None,
            });
        }

        let stream = match self.store.lookup_mut(id) {
            Some(s) => s,
            None if self.recently_reset.contains(&id) => return Ok(ConnectionStateChange::NoOp),
            None => return Err(CoreError::connection(Reason::PROTOCOL_ERROR)),
        };

        if local {
            stream.send_window_update(f.increment)?;
        } else {
            stream.recv_window_update(f.increment)?;
        }

        let stream_window_change = Some(StreamWindowChange {
            stream_id: id,
            local_window: stream.inbound_window.value(),
            remote_window: stream.outbound_window.value(),
        });
        let (cl, cr) = self.connection_windows();
        Ok(ConnectionStateChange::FlowControlChange {
            conn_local_window: cl,
            conn_remote_window: cr,
            stream_window_change,
        })
    }

    // ===== helpers =====

    fn local_initial_window(&self) -> u32 {
        self.local_settings
            .initial_window_size
            .unwrap_or(DEFAULT_INITIAL_WINDOW_SIZE)
    }

    fn remote_initial_window(&self) -> u32 {
        self.remote_settings
            .initial_window_size
            .unwrap_or(DEFAULT_INITIAL_WINDOW_SIZE)
    }

    /// Whether a not-yet-seen stream with this ID and direction has already
    /// been refused by a GOAWAY in flight. A GOAWAY(last_stream_id) only
    /// refuses streams above that threshold in the class it names — streams
    /// at or below it were already promised and still need to be accepted
    /// (RFC 7540 §6.8: "All streams up to and including the identified
    /// stream... may be acted upon").
    ///
    /// `local` tells us whose new stream this is, and therefore which side's
    /// GOAWAY threshold applies: a remotely-initiated stream is bounded by
    /// what *we* sent, a locally-initiated one by what the *peer* sent.
    fn refused_by_goaway(&self, id: StreamId, local: bool) -> bool {
        let threshold = if local {
            self.received_goaway_last_stream_id
        } else {
            self.sent_goaway_last_stream_id
        };
        match threshold {
            Some(last) => id.as_u32() > last.as_u32(),
            None => false,
        }
    }

    /// New stream IDs must be strictly increasing within their initiator
    /// class.
    fn validate_new_stream_id(&mut self, id: StreamId, local: bool) -> Result<(), CoreError> {
        if self.role.is_locally_initiated(id) != local {
            return Err(CoreError::connection(Reason::PROTOCOL_ERROR));
        }

        if local {
            if id.as_u32() != self.next_local_stream_id {
                return Err(CoreError::connection(Reason::PROTOCOL_ERROR));
            }
            self.next_local_stream_id += 2;
        } else {
            if id.as_u32() <= self.highest_remote_stream_id.as_u32() {
                return Err(CoreError::connection(Reason::PROTOCOL_ERROR));
            }
            self.highest_remote_stream_id = id;
        }
        Ok(())
    }

    fn check_concurrency_limit(&self, id: StreamId, local: bool) -> Result<(), CoreError> {
        let limit = if local {
            self.remote_settings.max_concurrent_streams
        } else {
            self.local_settings.max_concurrent_streams
        };

        if let Some(limit) = limit {
            let count = self.store.iterate().filter(|s| s.is_locally_initiated == local).count();
            if count as u32 >= limit {
                return Err(CoreError::stream(id, Reason::REFUSED_STREAM));
            }
        }
        Ok(())
    }

    /// Re-baselines every open stream's window by `delta`, validating all of
    /// them before mutating any: a SETTINGS change that would overflow any
    /// single stream's window is rejected wholesale, with no partial
    /// mutation.
    fn apply_initial_window_delta(
        &mut self,
        new_value: Option<u32>,
        affects_local_settings: bool,
    ) -> Result<i32, CoreError> {
        let new_value = match new_value {
            Some(v) => v,
            None => return Ok(0),
        };
        let old_value = if affects_local_settings {
            self.local_settings.initial_window_size.unwrap_or(DEFAULT_INITIAL_WINDOW_SIZE)
        } else {
            self.remote_settings.initial_window_size.unwrap_or(DEFAULT_INITIAL_WINDOW_SIZE)
        };
        let delta = new_value as i64 - old_value as i64;
        if delta == 0 {
            return Ok(0);
        }

        for stream in self.store.iterate() {
            let window = if affects_local_settings {
                &stream.inbound_window
            } else {
                &stream.outbound_window
            };
            window
                .checked_add_delta(delta)
                .map_err(|_| CoreError::connection(Reason::FLOW_CONTROL_ERROR))?;
        }

        for stream in self.store.iterate_mut() {
            let window = if affects_local_settings {
                &mut stream.inbound_window
            } else {
                &mut stream.outbound_window
            };
            window.apply_delta(delta);
        }

        Ok(delta as i32)
    }

    fn remember_recently_reset(&mut self, id: StreamId) {
        if self.recently_reset.len() == RECENTLY_RESET_CAPACITY {
            self.recently_reset.pop_front();
        }
        self.recently_reset.push_back(id);
    }

    /// Collects, removes, and returns (unsorted) the IDs of every stream
    /// above `last_stream_id` whose initiator class matches
    /// `target_locally_initiated`.
    fn close_streams_above(&mut self, last_stream_id: StreamId, target_locally_initiated: bool) -> Vec<StreamId> {
        let role = self.role;
        let ids: Vec<StreamId> = self
            .store
            .iterate()
            .filter(|s| s.id.as_u32() > last_stream_id.as_u32())
            .filter(|s| role.is_locally_initiated(s.id) == target_locally_initiated)
            .map(|s| s.id)
            .collect();

        for id in &ids {
            self.store.remove(*id);
        }
        ids
    }
}

fn merge_settings(base: SettingsValues, update: SettingsValues) -> SettingsValues {
    SettingsValues {
        header_table_size: update.header_table_size.or(base.header_table_size),
        enable_push: update.enable_push.or(base.enable_push),
        max_concurrent_streams: update.max_concurrent_streams.or(base.max_concurrent_streams),
        initial_window_size: update.initial_window_size.or(base.initial_window_size),
        max_frame_size: update.max_frame_size.or(base.max_frame_size),
        max_header_list_size: update.max_header_list_size.or(base.max_header_list_size),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frame::{DataFrame, GoAwayFrame, HeadersFrame, RstStreamFrame, SettingsFrame, WindowUpdateFrame};

    fn headers(id: u32, end_stream: bool) -> Frame {
        Frame::Headers(HeadersFrame {
            stream_id: StreamId::new(id),
            end_stream,
            end_headers: true,
            is_trailers: false,
            content_length: None,
        })
    }

    fn data(id: u32, len: u32, end_stream: bool) -> Frame {
        Frame::Data(DataFrame {
            stream_id: StreamId::new(id),
            payload_len: len,
            padding_len: None,
            end_stream,
        })
    }

    fn complete_preface(conn: &mut ConnectionStateMachine) {
        conn.send_frame(Frame::Settings(SettingsFrame {
            ack: false,
            values: SettingsValues::default(),
        }))
        .unwrap();
        conn.receive_frame(Frame::Settings(SettingsFrame {
            ack: false,
            values: SettingsValues::default(),
        }))
        .unwrap();
    }

    #[test]
    fn request_response_roundtrip_creates_and_closes_stream() {
        let mut conn = ConnectionStateMachine::new(Role::Server);
        complete_preface(&mut conn);

        let created = conn.receive_frame(headers(1, false)).unwrap();
        assert!(matches!(created, ConnectionStateChange::StreamCreated { .. }));

        let closed = conn.send_frame(headers(1, true)).unwrap();
        match closed {
            ConnectionStateChange::NoOp => panic!("stream should still be open one side"),
            ConnectionStateChange::StreamClosed { .. } => panic!("only one side closed"),
            _ => {}
        }

        let closed = conn.receive_frame(data(1, 0, true)).unwrap();
        assert!(matches!(closed, ConnectionStateChange::StreamClosed { .. }));
        assert!(conn.stream_windows(StreamId::new(1)).is_none());
    }

    #[test]
    fn data_consumes_connection_and_stream_windows() {
        let mut conn = ConnectionStateMachine::new(Role::Server);
        complete_preface(&mut conn);
        conn.receive_frame(headers(1, false)).unwrap();

        let before = conn.connection_windows();
        conn.receive_frame(data(1, 100, false)).unwrap();
        let after = conn.connection_windows();
        assert_eq!(after.0, before.0 - 100);
        assert_eq!(conn.stream_windows(StreamId::new(1)).unwrap().0, 65_535 - 100);
    }

    #[test]
    fn goaway_bulk_closes_streams_above_last_stream_id() {
        // Streams 1/3/5 are client-initiated; for receiving this GOAWAY to
        // bulk-close them, the receiver's *own* locally-initiated class must
        // be the odd one, i.e. this connection plays the client role (the
        // GOAWAY itself was sent by the server).
        let mut conn = ConnectionStateMachine::new(Role::Client);
        complete_preface(&mut conn);
        conn.send_frame(headers(1, false)).unwrap();
        conn.send_frame(headers(3, false)).unwrap();
        conn.send_frame(headers(5, false)).unwrap();

        let result = conn
            .receive_frame(Frame::GoAway(GoAwayFrame {
                last_stream_id: StreamId::new(1),
                error_code: Reason::NO_ERROR.as_u32(),
            }))
            .unwrap();

        match result {
            ConnectionStateChange::BulkStreamClosure { stream_ids } => {
                assert_eq!(stream_ids, vec![StreamId::new(3), StreamId::new(5)]);
            }
            other => panic!("expected bulk closure, got {:?}", other),
        }
        assert!(conn.is_quiescing());
        assert!(conn.stream_windows(StreamId::new(1)).is_some());
    }

    #[test]
    fn second_goaway_with_higher_last_stream_id_is_rejected() {
        let mut conn = ConnectionStateMachine::new(Role::Server);
        complete_preface(&mut conn);
        conn.receive_frame(Frame::GoAway(GoAwayFrame {
            last_stream_id: StreamId::new(5),
            error_code: Reason::NO_ERROR.as_u32(),
        }))
        .unwrap();

        let err = conn
            .receive_frame(Frame::GoAway(GoAwayFrame {
                last_stream_id: StreamId::new(7),
                error_code: Reason::NO_ERROR.as_u32(),
            }))
            .unwrap_err();
        assert_eq!(err.reason(), Reason::PROTOCOL_ERROR);
    }

    #[test]
    fn rst_stream_then_late_data_is_silently_absorbed() {
        let mut conn = ConnectionStateMachine::new(Role::Server);
        complete_preface(&mut conn);
        conn.receive_frame(headers(1, false)).unwrap();
        conn.receive_frame(Frame::RstStream(RstStreamFrame {
            stream_id: StreamId::new(1),
            error_code: Reason::CANCEL.as_u32(),
        }))
        .unwrap();

        let result = conn.receive_frame(data(1, 10, false)).unwrap();
        assert!(matches!(
            result,
            ConnectionStateChange::FlowControlChange {
                stream_window_change: None,
                ..
            }
        ));
    }

    #[test]
    fn data_on_unknown_stream_is_a_stream_scoped_error() {
        let mut conn = ConnectionStateMachine::new(Role::Server);
        complete_preface(&mut conn);
        let err = conn.receive_frame(data(99, 10, false)).unwrap_err();
        match err {
            CoreError::Stream(e) => assert_eq!(e.reason, Reason::STREAM_CLOSED),
            other => panic!("expected stream error, got {:?}", other),
        }
    }

    #[test]
    fn initial_window_size_change_rebaselines_open_streams() {
        let mut conn = ConnectionStateMachine::new(Role::Server);
        complete_preface(&mut conn);
        conn.receive_frame(headers(1, false)).unwrap();

        conn.send_frame(Frame::Settings(SettingsFrame {
            ack: false,
            values: SettingsValues {
                initial_window_size: Some(100_000),
                ..Default::default()
            },
        }))
        .unwrap();
        // First ack applies the preface's (empty) SETTINGS; the second
        // applies the INITIAL_WINDOW_SIZE change just pushed above.
        conn.receive_frame(Frame::Settings(SettingsFrame {
            ack: true,
            values: SettingsValues::default(),
        }))
        .unwrap();
        let changed = conn
            .receive_frame(Frame::Settings(SettingsFrame {
                ack: true,
                values: SettingsValues::default(),
            }))
            .unwrap();

        match changed {
            ConnectionStateChange::SettingsChanged { stream_window_size_delta } => {
                assert_eq!(stream_window_size_delta, 100_000 - 65_535);
            }
            other => panic!("expected settings changed, got {:?}", other),
        }
        assert_eq!(conn.stream_windows(StreamId::new(1)).unwrap().0, 100_000);
    }

    #[test]
    fn frames_other_than_settings_ping_window_update_are_rejected_during_preface() {
        let mut conn = ConnectionStateMachine::new(Role::Server);
        let err = conn.receive_frame(headers(1, false)).unwrap_err();
        assert_eq!(err.reason(), Reason::PROTOCOL_ERROR);
    }

    #[test]
    fn continuation_on_a_different_stream_is_rejected() {
        let mut conn = ConnectionStateMachine::new(Role::Server);
        complete_preface(&mut conn);

        conn.receive_frame(Frame::Headers(HeadersFrame {
            stream_id: StreamId::new(1),
            end_stream: false,
            end_headers: false,
            is_trailers: false,
            content_length: None,
        }))
        .unwrap();

        let err = conn.receive_frame(headers(3, false)).unwrap_err();
        assert_eq!(err.reason(), Reason::PROTOCOL_ERROR);
    }

    #[test]
    fn window_update_zero_increment_is_rejected() {
        let mut conn = ConnectionStateMachine::new(Role::Server);
        complete_preface(&mut conn);
        let err = conn
            .receive_frame(Frame::WindowUpdate(WindowUpdateFrame {
                stream_id: StreamId::ZERO,
                increment: 0,
            }))
            .unwrap_err();
        assert_eq!(err.reason(), Reason::PROTOCOL_ERROR);
    }

    #[test]
    fn stream_at_goaway_threshold_is_still_accepted() {
        // The server sends GOAWAY(last_stream_id=5) before ever having seen
        // stream 5 itself (e.g. the HEADERS crossed the GOAWAY on the wire).
        // RFC 7540 §6.8 only refuses streams *above* the threshold, so this
        // HEADERS must still be accepted rather than REFUSED_STREAM.
        let mut conn = ConnectionStateMachine::new(Role::Server);
        complete_preface(&mut conn);

        conn.send_frame(Frame::GoAway(GoAwayFrame {
            last_stream_id: StreamId::new(5),
            error_code: Reason::NO_ERROR.as_u32(),
        }))
        .unwrap();

        let created = conn.receive_frame(headers(5, false)).unwrap();
        assert!(matches!(created, ConnectionStateChange::StreamCreated { .. }));

        let refused = conn.receive_frame(headers(7, false)).unwrap_err();
        assert_eq!(refused.reason(), Reason::REFUSED_STREAM);
    }

    #[test]
    fn max_concurrent_streams_refuses_over_limit() {
        // MAX_CONCURRENT_STREAMS we advertise bounds streams the peer may
        // open towards us; it only takes effect once the peer ACKs it.
        let mut conn = ConnectionStateMachine::new(Role::Server);
        complete_preface(&mut conn);
        conn.send_frame(Frame::Settings(SettingsFrame {
            ack: false,
            values: SettingsValues {
                max_concurrent_streams: Some(1),
                ..Default::default()
            },
        }))
        .unwrap();
        // Two local SETTINGS frames are now outstanding (the preface one and
        // this one); both acks arrive before the limit takes effect.
        conn.receive_frame(Frame::Settings(SettingsFrame {
            ack: true,
            values: SettingsValues::default(),
        }))
        .unwrap();
        conn.receive_frame(Frame::Settings(SettingsFrame {
            ack: true,
            values: SettingsValues::default(),
        }))
        .unwrap();

        conn.receive_frame(headers(1, false)).unwrap();
        let err = conn.receive_frame(headers(3, false)).unwrap_err();
        match err {
            CoreError::Stream(e) => assert_eq!(e.reason, Reason::REFUSED_STREAM),
            other => panic!("expected stream error, got {:?}", other),
        }
    }
}

//! The per-stream lifecycle, RFC 7540 §5.1.
//!
//! A flat enum rather than variants carrying per-direction flow-control
//! windows: this core keeps windows on the owning `Stream` unconditionally
//! (a closed stream's windows are simply unused, not absent), which lets
//! the lifecycle enum stay a plain `Copy` value with no payload.
//!
//! ```not_rust
//!                              +--------+
//!                      send PP |        | recv PP
//!                     ,--------|  idle  |--------.
//!                    /         |        |         \
//!                   v          +--------+          v
//!            +----------+          |           +----------+
//!            |          |          | send H /  |          |
//!     ,------| reserved |          | recv H    | reserved |------.
//!     |      | (local)  |          |           | (remote) |      |
//!     |      +----------+          v           +----------+      |
//!     |          |             +--------+             |          |
//!     |          |     recv ES |        | send ES     |          |
//!     |   send H |     ,-------|  open  |-------.     | recv H   |
//!     |          |    /        |        |        \    |          |
//!     |          v   v         +--------+         v   v          |
//!     |      +----------+          |           +----------+      |
//!     |      |   half   |          |           |   half   |      |
//!     |      |  closed  |          | send R /  |  closed  |      |
//!     |      | (remote) |          | recv R    | (local)  |      |
//!     |      +----------+          |           +----------+      |
//!     |           |                |                 |           |
//!     |           | send ES /      |       recv ES / |           |
//!     |           | send R /       v        send R / |           |
//!     |           | recv R     +--------+   recv R   |           |
//!     | send R /  `----------->|        |<-----------'  send R / |
//!     | recv R                 | closed |               recv R   |
//!     `----------------------->|        |<----------------------'
//!                              +--------+
//! ```

use crate::error::Reason;

/// A stream's position in the RFC 7540 §5.1 lifecycle.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StreamState {
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

use self::StreamState::*;

impl StreamState {
    /// First HEADERS received opening the stream (or on a push-reserved
    /// stream, the response headers closing the `ReservedRemote` reservation).
    pub fn recv_open(&mut self, end_stream: bool) -> Result<(), Reason> {
        match *self {
            Idle => {
                *self = if end_stream { HalfClosedRemote } else { Open };
                Ok(())
            }
            ReservedRemote => {
                *self = if end_stream { Closed } else { HalfClosedLocal };
                Ok(())
            }
            _ => Err(Reason::PROTOCOL_ERROR),
        }
    }

    /// First HEADERS sent opening the stream (or responding on a
    /// locally-reserved push stream).
    pub fn send_open(&mut self, end_stream: bool) -> Result<(), Reason> {
        match *self {
            Idle => {
                *self = if end_stream { HalfClosedLocal } else { Open };
                Ok(())
            }
            ReservedLocal => {
                *self = if end_stream { Closed } else { HalfClosedRemote };
                Ok(())
            }
            _ => Err(Reason::PROTOCOL_ERROR),
        }
    }

    /// A HEADERS frame after the initial one in this direction: must carry
    /// END_STREAM (trailers) or it is a protocol violation.
    pub fn recv_trailers(&mut self, end_stream: bool) -> Result<(), Reason> {
        if !end_stream {
            return Err(Reason::PROTOCOL_ERROR);
        }
        match *self {
            Open => {
                *self = HalfClosedRemote;
                Ok(())
            }
            HalfClosedLocal => {
                *self = Closed;
                Ok(())
            }
            _ => Err(Reason::STREAM_CLOSED),
        }
    }

    pub fn send_trailers(&mut self, end_stream: bool) -> Result<(), Reason> {
        if !end_stream {
            return Err(Reason::PROTOCOL_ERROR);
        }
        match *self {
            Open => {
                *self = HalfClosedLocal;
                Ok(())
            }
            HalfClosedRemote => {
                *self = Closed;
                Ok(())
            }
            _ => Err(Reason::STREAM_CLOSED),
        }
    }

    /// Whether DATA may currently be received, without applying the
    /// transition. Lets a caller validate before touching other per-stream
    /// state (flow-control window, content-length counter) that must stay
    /// untouched when the frame turns out to be illegal.
    pub fn can_recv_data(&self) -> Result<(), Reason> {
        match *self {
            Open | HalfClosedLocal => Ok(()),
            _ => Err(Reason::STREAM_CLOSED),
        }
    }

    /// Zero-length DATA with END_STREAM is permitted.
    pub fn recv_data(&mut self, end_stream: bool) -> Result<(), Reason> {
        match *self {
            Open => {
                if end_stream {
                    *self = HalfClosedRemote;
                }
                Ok(())
            }
            HalfClosedLocal => {
                if end_stream {
                    *self = Closed;
                }
                Ok(())
            }
            _ => Err(Reason::STREAM_CLOSED),
        }
    }

    pub fn send_data(&mut self, end_stream: bool) -> Result<(), Reason> {
        match *self {
            Open => {
                if end_stream {
                    *self = HalfClosedLocal;
                }
                Ok(())
            }
            HalfClosedRemote => {
                if end_stream {
                    *self = Closed;
                }
                Ok(())
            }
            _ => Err(Reason::STREAM_CLOSED),
        }
    }

    pub fn reserve_local(&mut self) -> Result<(), Reason> {
        match *self {
            Idle => {
                *self = ReservedLocal;
                Ok(())
            }
            _ => Err(Reason::PROTOCOL_ERROR),
        }
    }

    pub fn reserve_remote(&mut self) -> Result<(), Reason> {
        match *self {
            Idle => {
                *self = ReservedRemote;
                Ok(())
            }
            _ => Err(Reason::PROTOCOL_ERROR),
        }
    }

    /// RST_STREAM in either direction. Idle is explicitly excluded: an
    /// idle stream has no peer-visible existence yet, so resetting one is
    /// a connection-level PROTOCOL_ERROR rather than a no-op.
    pub fn reset(&mut self) -> Result<(), Reason> {
        match *self {
            Idle => Err(Reason::PROTOCOL_ERROR),
            _ => {
                *self = Closed;
                Ok(())
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Closed)
    }

    pub fn is_recv_closed(&self) -> bool {
        matches!(self, HalfClosedRemote | Closed)
    }

    pub fn is_send_closed(&self) -> bool {
        matches!(self, HalfClosedLocal | Closed)
    }
}

impl Default for StreamState {
    fn default() -> StreamState {
        Idle
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_response_lifecycle() {
        let mut client_side = StreamState::Idle;
        client_side.send_open(true).unwrap();
        assert_eq!(client_side, HalfClosedLocal);

        let mut server_side = StreamState::Idle;
        server_side.recv_open(true).unwrap();
        assert_eq!(server_side, HalfClosedRemote);
    }

    #[test]
    fn data_with_end_stream_closes_half_closed_stream() {
        let mut s = StreamState::Open;
        s.send_data(false).unwrap();
        assert_eq!(s, Open);
        s.recv_data(true).unwrap();
        assert_eq!(s, HalfClosedRemote);
        s.send_data(true).unwrap();
        assert_eq!(s, Closed);
    }

    #[test]
    fn rst_stream_on_idle_is_protocol_error() {
        let mut s = StreamState::Idle;
        assert_eq!(s.reset().unwrap_err(), Reason::PROTOCOL_ERROR);
    }

    #[test]
    fn rst_stream_from_any_non_idle_state_closes() {
        for mut s in [Open, HalfClosedLocal, HalfClosedRemote, ReservedLocal, ReservedRemote] {
            s.reset().unwrap();
            assert_eq!(s, Closed);
        }
    }

    #[test]
    fn headers_after_end_stream_is_stream_closed() {
        let mut s = StreamState::Closed;
        assert_eq!(s.recv_trailers(true).unwrap_err(), Reason::STREAM_CLOSED);
    }

    #[test]
    fn push_promise_reservation_lifecycle() {
        let mut pushed = StreamState::Idle;
        pushed.reserve_local().unwrap();
        assert_eq!(pushed, ReservedLocal);
        pushed.send_open(false).unwrap();
        assert_eq!(pushed, HalfClosedRemote);

        let mut client_view = StreamState::Idle;
        client_view.reserve_remote().unwrap();
        assert_eq!(client_view, ReservedRemote);
        client_view.recv_open(false).unwrap();
        assert_eq!(client_view, HalfClosedLocal);
    }

    #[test]
    fn monotone_no_backward_transition_from_closed() {
        let mut s = StreamState::Closed;
        assert!(s.recv_open(false).is_err());
        assert!(s.send_open(false).is_err());
        assert_eq!(s, Closed);
    }
}

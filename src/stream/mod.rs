//! Per-stream state.

pub mod state;

use crate::error::{CoreError, FlowControlError, Reason};
use crate::flow_control::FlowControlWindow;
use crate::stream_id::StreamId;

pub use self::state::StreamState;

/// content-length policing bookkeeping.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ContentLength {
    Omitted,
    Remaining(u64),
}

/// A single HTTP/2 stream: lifecycle plus the per-stream flow-control axes.
///
/// Tracks byte counts only, not buffered body data — holding and draining
/// the bytes themselves is the I/O layer's concern.
#[derive(Clone, Debug)]
pub struct Stream {
    pub id: StreamId,
    pub state: StreamState,
    pub inbound_window: FlowControlWindow,
    pub outbound_window: FlowControlWindow,
    pub is_locally_initiated: bool,
    content_length: ContentLength,
    recv_initial_headers_done: bool,
    send_initial_headers_done: bool,
}

impl Stream {
    pub fn new(
        id: StreamId,
        is_locally_initiated: bool,
        inbound_initial_window: u32,
        outbound_initial_window: u32,
    ) -> Stream {
        Stream {
            id,
            state: StreamState::Idle,
            inbound_window: FlowControlWindow::new(inbound_initial_window),
            outbound_window: FlowControlWindow::new(outbound_initial_window),
            is_locally_initiated,
            content_length: ContentLength::Omitted,
            recv_initial_headers_done: false,
            send_initial_headers_done: false,
        }
    }

    pub fn recv_headers(
        &mut self,
        end_stream: bool,
        content_length: Option<u64>,
    ) -> Result<(), CoreError> {
        if self.recv_initial_headers_done {
            return self.recv_trailers(end_stream);
        }

        self.state
            .recv_open(end_stream)
            .map_err(|r| self.scoped_error(r))?;
        self.recv_initial_headers_done = true;

        if let Some(n) = content_length {
            self.content_length = ContentLength::Remaining(n);
        }

        if end_stream {
            self.check_content_length_on_close()?;
        }

        Ok(())
    }

    pub fn send_headers(&mut self, end_stream: bool) -> Result<(), CoreError> {
        if self.send_initial_headers_done {
            return self.send_trailers(end_stream);
        }

        self.state
            .send_open(end_stream)
            .map_err(|r| self.scoped_error(r))?;
        self.send_initial_headers_done = true;

        Ok(())
    }

    fn recv_trailers(&mut self, end_stream: bool) -> Result<(), CoreError> {
        self.state
            .recv_trailers(end_stream)
            .map_err(|r| self.scoped_error(r))?;
        self.check_content_length_on_close()
    }

    fn send_trailers(&mut self, end_stream: bool) -> Result<(), CoreError> {
        self.state
            .send_trailers(end_stream)
            .map_err(|r| self.scoped_error(r))
    }

    /// `size` is the DATA payload length plus padding plus the pad-length
    /// octet.
    pub fn recv_data(&mut self, size: u32, end_stream: bool) -> Result<(), CoreError> {
        self.state
            .can_recv_data()
            .map_err(|r| self.scoped_error(r))?;

        self.inbound_window
            .decrement_by(size)
            .map_err(|_| CoreError::stream(self.id, Reason::FLOW_CONTROL_ERROR))?;

        if let ContentLength::Remaining(ref mut remaining) = self.content_length {
            *remaining = remaining
                .checked_sub(size as u64)
                .ok_or_else(|| CoreError::stream(self.id, Reason::PROTOCOL_ERROR))?;
        }

        self.state
            .recv_data(end_stream)
            .map_err(|r| self.scoped_error(r))?;

        if end_stream {
            self.check_content_length_on_close()?;
        }

        Ok(())
    }

    pub fn send_data(&mut self, size: u32, end_stream: bool) -> Result<(), CoreError> {
        self.outbound_window
            .decrement_by(size)
            .map_err(|_| CoreError::stream(self.id, Reason::FLOW_CONTROL_ERROR))?;

        self.state
            .send_data(end_stream)
            .map_err(|r| self.scoped_error(r))
    }

    /// Applies a WINDOW_UPDATE received from the peer: grows the window we
    /// may send into.
    pub fn recv_window_update(&mut self, increment: u32) -> Result<(), CoreError> {
        self.outbound_window
            .increment_by(increment)
            .map_err(|e| self.flow_control_error(e))
    }

    /// Validates a WINDOW_UPDATE we are about to send: grows the window the
    /// peer believes it may send into.
    pub fn send_window_update(&mut self, increment: u32) -> Result<(), CoreError> {
        self.inbound_window
            .increment_by(increment)
            .map_err(|e| self.flow_control_error(e))
    }

    pub fn reserve_local(&mut self) -> Result<(), CoreError> {
        self.state.reserve_local().map_err(|r| self.scoped_error(r))
    }

    pub fn reserve_remote(&mut self) -> Result<(), CoreError> {
        self.state
            .reserve_remote()
            .map_err(|r| self.scoped_error(r))
    }

    pub fn reset(&mut self) -> Result<(), CoreError> {
        self.state.reset().map_err(|r| self.scoped_error(r))
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    fn check_content_length_on_close(&self) -> Result<(), CoreError> {
        if let ContentLength::Remaining(remaining) = self.content_length {
            if remaining != 0 {
                return Err(CoreError::stream(self.id, Reason::PROTOCOL_ERROR));
            }
        }
        Ok(())
    }

    fn flow_control_error(&self, err: FlowControlError) -> CoreError {
        match err {
            FlowControlError::InvalidWindowIncrementSize => {
                CoreError::stream(self.id, Reason::PROTOCOL_ERROR)
            }
            FlowControlError::InvalidFlowControlWindowSize => {
                CoreError::stream(self.id, Reason::FLOW_CONTROL_ERROR)
            }
        }
    }

    /// `STREAM_CLOSED` is this stream's own fault and is signalled with a
    /// stream-scoped error; every other lifecycle violation indicates the
    /// peer broke the overall protocol ordering and is connection-scoped.
    fn scoped_error(&self, reason: Reason) -> CoreError {
        if reason == Reason::STREAM_CLOSED {
            CoreError::stream(self.id, reason)
        } else {
            CoreError::connection(reason)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn content_length_mismatch_on_close_is_a_stream_error() {
        let mut s = Stream::new(StreamId::new(1), false, 65_535, 65_535);
        s.recv_headers(false, Some(10)).unwrap();
        let err = s.recv_data(5, true).unwrap_err();
        match err {
            CoreError::Stream(e) => assert_eq!(e.reason, Reason::PROTOCOL_ERROR),
            other => panic!("expected stream error, got {:?}", other),
        }
    }

    #[test]
    fn content_length_matching_closes_cleanly() {
        let mut s = Stream::new(StreamId::new(1), false, 65_535, 65_535);
        s.recv_headers(false, Some(10)).unwrap();
        s.recv_data(10, true).unwrap();
        assert!(s.is_closed());
    }

    #[test]
    fn zero_length_data_with_end_stream_is_permitted() {
        let mut s = Stream::new(StreamId::new(1), false, 65_535, 65_535);
        s.recv_headers(false, None).unwrap();
        s.recv_data(0, true).unwrap();
        assert!(s.is_closed());
    }

    #[test]
    fn headers_after_end_stream_is_stream_closed_error() {
        let mut s = Stream::new(StreamId::new(1), false, 65_535, 65_535);
        s.recv_headers(true, None).unwrap();
        let err = s.recv_headers(true, None).unwrap_err();
        match err {
            CoreError::Stream(e) => assert_eq!(e.reason, Reason::STREAM_CLOSED),
            other => panic!("expected stream error, got {:?}", other),
        }
    }

    #[test]
    fn data_consumes_inbound_window() {
        let mut s = Stream::new(StreamId::new(1), false, 100, 100);
        s.recv_headers(false, None).unwrap();
        s.recv_data(40, false).unwrap();
        assert_eq!(s.inbound_window.value(), 60);
    }
}

//! Stream identifiers (RFC 7540 §5.1.1).

use std::fmt;

/// A 31-bit HTTP/2 stream identifier. `0` is the root/connection stream.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct StreamId(u32);

pub const MAX_STREAM_ID: u32 = (1 << 31) - 1;

impl StreamId {
    pub const ZERO: StreamId = StreamId(0);

    pub fn new(id: u32) -> StreamId {
        debug_assert!(id <= MAX_STREAM_ID, "stream id exceeds 31 bits");
        StreamId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// `true` for the root stream, i.e. connection-scoped frames.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Odd IDs are client-initiated.
    pub fn is_client_initiated(&self) -> bool {
        !self.is_zero() && self.0 % 2 == 1
    }

    /// Even, non-zero IDs are server-initiated.
    pub fn is_server_initiated(&self) -> bool {
        !self.is_zero() && self.0 % 2 == 0
    }
}

impl From<u32> for StreamId {
    fn from(id: u32) -> StreamId {
        StreamId::new(id)
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({})", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parity_classifies_initiator() {
        assert!(StreamId::new(1).is_client_initiated());
        assert!(!StreamId::new(1).is_server_initiated());
        assert!(StreamId::new(2).is_server_initiated());
        assert!(!StreamId::new(2).is_client_initiated());
        assert!(StreamId::ZERO.is_zero());
        assert!(!StreamId::ZERO.is_client_initiated());
        assert!(!StreamId::ZERO.is_server_initiated());
    }

    #[test]
    fn ordering_matches_numeric_value() {
        assert!(StreamId::new(1) < StreamId::new(3));
        assert!(StreamId::new(2) < StreamId::new(4));
    }
}

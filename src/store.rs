//! The stream map.
//!
//! Backed by two sorted `Vec<Stream>` buffers — one per initiator parity —
//! rather than a slab plus a `HashMap<StreamId, usize>`. New stream IDs
//! within an initiator class are always strictly greater than every
//! existing ID in that class, so each buffer is append-only at the tail
//! and lookups are a binary search over a contiguous, cache-friendly run.

use crate::stream::Stream;
use crate::stream_id::StreamId;

#[derive(Default, Debug)]
pub struct Store {
    /// Odd stream IDs, ascending.
    client_streams: Vec<Stream>,
    /// Even, non-zero stream IDs, ascending.
    server_streams: Vec<Stream>,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    fn buffer(&self, id: StreamId) -> &Vec<Stream> {
        if id.is_client_initiated() {
            &self.client_streams
        } else {
            &self.server_streams
        }
    }

    fn buffer_mut(&mut self, id: StreamId) -> &mut Vec<Stream> {
        if id.is_client_initiated() {
            &mut self.client_streams
        } else {
            &mut self.server_streams
        }
    }

    fn index_of(buf: &[Stream], id: StreamId) -> Option<usize> {
        buf.binary_search_by_key(&id.as_u32(), |s| s.id.as_u32()).ok()
    }

    pub fn lookup(&self, id: StreamId) -> Option<&Stream> {
        let buf = self.buffer(id);
        Self::index_of(buf, id).map(|i| &buf[i])
    }

    pub fn lookup_mut(&mut self, id: StreamId) -> Option<&mut Stream> {
        let buf = self.buffer_mut(id);
        match Self::index_of(buf, id) {
            Some(i) => Some(&mut buf[i]),
            None => None,
        }
    }

    /// Inserts a new stream. The ID must be strictly greater than every
    /// existing ID in its initiator class; violating this is a programmer
    /// error, not a protocol error, so it is a debug assertion rather than
    /// a `Result`.
    pub fn insert(&mut self, stream: Stream) {
        let id = stream.id;
        let buf = self.buffer_mut(id);
        debug_assert!(
            buf.last().map_or(true, |s| s.id.as_u32() < id.as_u32()),
            "stream map insert violated per-class monotonicity: {:?}",
            id
        );
        buf.push(stream);
    }

    pub fn remove(&mut self, id: StreamId) -> Option<Stream> {
        let buf = self.buffer_mut(id);
        Self::index_of(buf, id).map(|i| buf.remove(i))
    }

    /// Applies `f` to the stream if present. Returns `false` if absent —
    /// absence is not an error, the caller decides.
    pub fn modify<F>(&mut self, id: StreamId, f: F) -> bool
    where
        F: FnOnce(&mut Stream),
    {
        match self.lookup_mut(id) {
            Some(stream) => {
                f(stream);
                true
            }
            None => false,
        }
    }

    /// Looks up `id`, inserting via `create` first if absent, then applies
    /// `f`. `create` must produce a `Stream` whose ID still satisfies
    /// tail-monotonicity.
    pub fn modify_or_create<C, F>(&mut self, id: StreamId, create: C, f: F)
    where
        C: FnOnce() -> Stream,
        F: FnOnce(&mut Stream),
    {
        if self.lookup(id).is_none() {
            self.insert(create());
        }
        let stream = self.lookup_mut(id).expect("just inserted");
        f(stream);
    }

    /// Applies `f`, then removes the stream from the map if it ended up
    /// `closed`: a stream is destroyed on entering `closed`.
    pub fn modify_and_close_if_requested<F>(&mut self, id: StreamId, f: F)
    where
        F: FnOnce(&mut Stream),
    {
        let should_remove = match self.lookup_mut(id) {
            Some(stream) => {
                f(stream);
                stream.is_closed()
            }
            None => return,
        };

        if should_remove {
            self.remove(id);
        }
    }

    /// Stable linear iteration order: client streams then server streams,
    /// each strictly increasing by ID.
    pub fn iterate(&self) -> impl Iterator<Item = &Stream> {
        self.client_streams.iter().chain(self.server_streams.iter())
    }

    pub fn iterate_mut(&mut self) -> impl Iterator<Item = &mut Stream> {
        self.client_streams
            .iter_mut()
            .chain(self.server_streams.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.client_streams.len() + self.server_streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

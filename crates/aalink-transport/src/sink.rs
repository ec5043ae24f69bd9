//! Received-data sink.

use bytes::{Bytes, BytesMut};

const INITIAL_CAPACITY: usize = 16 * 1024;

/// Ordered buffer between physical reads and queued receive requests.
///
/// Physical chunks of any size are committed at the tail; requests consume
/// exact byte counts from the head. Bytes are never dropped: whatever a
/// chunk carries beyond the front request stays available for the next one.
#[derive(Debug, Default)]
pub struct DataSink {
    buf: BytesMut,
}

impl DataSink {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Bytes currently available for consumption.
    pub fn available(&self) -> usize {
        self.buf.len()
    }

    /// Commit one physical chunk at the tail.
    pub fn commit(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Consume exactly `n` bytes from the head.
    ///
    /// Callers must check [`available`](Self::available) first; `n` must not
    /// exceed it.
    pub fn consume(&mut self, n: usize) -> Bytes {
        debug_assert!(n <= self.buf.len());
        self.buf.split_to(n).freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_then_consume_in_order() {
        let mut sink = DataSink::new();
        sink.commit(b"abc");
        sink.commit(b"defg");
        assert_eq!(sink.available(), 7);

        assert_eq!(sink.consume(2).as_ref(), b"ab");
        assert_eq!(sink.consume(4).as_ref(), b"cdef");
        assert_eq!(sink.available(), 1);
        assert_eq!(sink.consume(1).as_ref(), b"g");
    }

    #[test]
    fn surplus_survives_consumption() {
        let mut sink = DataSink::new();
        sink.commit(&[0xAA; 100]);
        let head = sink.consume(10);
        assert_eq!(head.len(), 10);
        assert_eq!(sink.available(), 90);
    }

    #[test]
    fn zero_consume_yields_empty() {
        let mut sink = DataSink::new();
        sink.commit(b"x");
        assert!(sink.consume(0).is_empty());
        assert_eq!(sink.available(), 1);
    }
}

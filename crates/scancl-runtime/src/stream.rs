use scancl_common::stream_id::StreamId;

/// Trait for creating streams, used by the stream pool to generate streams as needed.
pub trait StreamFactory {
    /// The type of stream produced by this factory.
    type Stream;
    /// Creates the stream at the given pool index.
    fn create(&mut self, index: usize) -> Self::Stream;
}

/// Represents a pool of streams, managing a collection of streams created lazily by a factory.
///
/// Any number of [stream ids](StreamId) share the pool: ids are mapped onto the available slots,
/// so two ids may end up ordered on the same stream but one id is never split across streams.
#[derive(Debug)]
pub struct StreamPool<F: StreamFactory> {
    streams: Vec<Option<F::Stream>>,
    factory: F,
}

impl<F: StreamFactory> StreamPool<F> {
    /// Creates a new stream pool with the given factory and capacity.
    pub fn new(factory: F, max_streams: u8) -> Self {
        let max_streams = max_streams.max(1) as usize;

        Self {
            streams: (0..max_streams).map(|_| None).collect(),
            factory,
        }
    }

    /// Retrieves a mutable reference to the stream for a given stream ID, creating it if needed.
    pub fn get_mut(&mut self, stream_id: &StreamId) -> &mut F::Stream {
        let index = self.stream_index(stream_id);
        let factory = &mut self.factory;

        self.streams[index].get_or_insert_with(|| factory.create(index))
    }

    /// Number of stream slots.
    pub fn max_streams(&self) -> usize {
        self.streams.len()
    }

    /// Calculates the index for a given stream ID.
    pub fn stream_index(&self, id: &StreamId) -> usize {
        stream_index(id, self.streams.len())
    }
}

/// Maps a stream ID to an index within the pool's capacity using modulo arithmetic.
pub fn stream_index(stream_id: &StreamId, max_streams: usize) -> usize {
    (stream_id.value % max_streams as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(usize);

    impl StreamFactory for Counter {
        type Stream = usize;

        fn create(&mut self, index: usize) -> usize {
            self.0 += 1;
            index * 10
        }
    }

    #[test]
    fn streams_are_created_lazily_once() {
        let mut pool = StreamPool::new(Counter(0), 4);

        assert_eq!(*pool.get_mut(&StreamId::explicit(6)), 20);
        assert_eq!(*pool.get_mut(&StreamId::explicit(2)), 20);
        assert_eq!(*pool.get_mut(&StreamId::explicit(3)), 30);
        assert_eq!(pool.factory.0, 2);
    }

    #[test]
    fn zero_streams_means_one() {
        let pool = StreamPool::new(Counter(0), 0);

        assert_eq!(pool.max_streams(), 1);
        assert_eq!(pool.stream_index(&StreamId::explicit(17)), 0);
    }
}

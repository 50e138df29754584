/// Identifier of an ordered execution stream.
///
/// By default a stream is derived from the current thread id, so that work submitted from one
/// thread is ordered while work from different threads may run concurrently.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct StreamId {
    /// The value representing the stream.
    pub value: u64,
}

impl StreamId {
    /// Get the stream of the current thread.
    pub fn current() -> Self {
        Self {
            value: Self::from_current_thread(),
        }
    }

    /// Creates an explicit stream id, independent of the calling thread.
    pub const fn explicit(value: u64) -> Self {
        Self { value }
    }

    fn from_current_thread() -> u64 {
        use core::hash::Hash;

        std::thread_local! {
            static ID: std::cell::OnceCell::<u64> = const { std::cell::OnceCell::new() };
        };

        // Getting the current thread is expensive, so we cache the value into a thread local
        // variable, which is very fast.
        ID.with(|cell| {
            *cell.get_or_init(|| {
                let mut hasher = std::hash::DefaultHasher::default();
                let id = std::thread::current().id();
                id.hash(&mut hasher);
                std::hash::Hasher::finish(&hasher)
            })
        })
    }
}

impl core::fmt::Display for StreamId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("StreamId({:?})", self.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_stream_is_stable_on_one_thread() {
        assert_eq!(StreamId::current(), StreamId::current());
    }

    #[test]
    fn threads_get_distinct_streams() {
        let main = StreamId::current();
        let other = std::thread::spawn(StreamId::current).join().unwrap();

        assert_ne!(main, other);
    }
}

use serde::{Deserialize, Serialize};

/// Caching intent attached to a global memory load.
///
/// Only the volatile variants change the meaning of a load: they are never served from a stale
/// cached copy and never merged with, or reordered across, other loads of the same location.
/// Every other variant is a performance hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CacheModifier {
    /// Plain load.
    #[default]
    Default,
    /// Cache at every level of the hierarchy.
    CacheAllLevels,
    /// Bypass the innermost cache, keep the data in the shared outer cache.
    CacheGlobalOnly,
    /// Data is read once, avoid polluting the caches.
    CacheStreaming,
    /// Volatile load of global memory.
    CacheAsVolatile,
    /// Load through the read-only data path.
    ReadOnlyCache,
    /// Volatile load of memory in any address space.
    VolatileAnySpace,
}

/// Level of cache hints a target supports, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadCapability {
    /// Plain and volatile loads only.
    Plain,
    /// Temporal prefetch hints.
    Prefetch,
    /// Temporal and non-temporal prefetch hints.
    Streaming,
}

cfg_if::cfg_if! {
    if #[cfg(any(prefetch_x86, prefetch_arm))] {
        /// The hint level of the build target.
        pub const LOAD_CAPABILITY: LoadCapability = LoadCapability::Streaming;
    } else {
        /// The hint level of the build target.
        pub const LOAD_CAPABILITY: LoadCapability = LoadCapability::Plain;
    }
}

impl CacheModifier {
    /// All cache modifiers.
    pub const ALL: [CacheModifier; 7] = [
        CacheModifier::Default,
        CacheModifier::CacheAllLevels,
        CacheModifier::CacheGlobalOnly,
        CacheModifier::CacheStreaming,
        CacheModifier::CacheAsVolatile,
        CacheModifier::ReadOnlyCache,
        CacheModifier::VolatileAnySpace,
    ];

    /// Whether the modifier carries the volatile contract.
    pub const fn is_volatile(self) -> bool {
        matches!(
            self,
            CacheModifier::CacheAsVolatile | CacheModifier::VolatileAnySpace
        )
    }

    /// The hint level needed to honor the modifier.
    pub const fn required_capability(self) -> LoadCapability {
        match self {
            CacheModifier::Default
            | CacheModifier::CacheAsVolatile
            | CacheModifier::VolatileAnySpace => LoadCapability::Plain,
            CacheModifier::CacheAllLevels | CacheModifier::CacheGlobalOnly => {
                LoadCapability::Prefetch
            }
            CacheModifier::CacheStreaming | CacheModifier::ReadOnlyCache => {
                LoadCapability::Streaming
            }
        }
    }

    /// The nearest weaker modifier that is still correct in place of this one.
    ///
    /// Volatile modifiers and [CacheModifier::Default] have no weaker form and return themselves.
    pub const fn weaker(self) -> Self {
        match self {
            CacheModifier::ReadOnlyCache => CacheModifier::CacheAllLevels,
            CacheModifier::CacheStreaming => CacheModifier::CacheGlobalOnly,
            CacheModifier::CacheGlobalOnly => CacheModifier::CacheAllLevels,
            CacheModifier::CacheAllLevels => CacheModifier::Default,
            other => other,
        }
    }

    /// Degrades the modifier until the given capability can honor it.
    pub const fn degrade(self, capability: LoadCapability) -> Self {
        let mut modifier = self;
        while modifier.required_capability() as u8 > capability as u8 {
            modifier = modifier.weaker();
        }
        modifier
    }

    /// The modifier actually applied on the build target.
    pub const fn resolve(self) -> Self {
        self.degrade(LOAD_CAPABILITY)
    }
}

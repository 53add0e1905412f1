pub use crate::block_cache::{Admission, BlockCache};
pub use crate::builder::{Cache, CacheBuilder, CachePolicy};
pub use crate::config::{BlockCacheConfig, CacheConfig, ConfigError, PatternConfig, SpaceConfig};
pub use crate::ds::{EvictionList, KeyIndexMap, ShardSelector, SlotIndex, SlotPool};
pub use crate::error::{BlockCacheError, CacheError, InvariantError, SpaceError};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::{ArcMetricsSnapshot, LruMetricsSnapshot};
pub use crate::pattern::{
    IoPattern, IoRequest, IoState, IoStateMachine, IoTagged, NeverSequential, SequentialDetector,
    SequentialIdentifier, SharedIoStateMachine,
};
pub use crate::policy::{ArcCache, CacheEntry, Insertion, LruCache, QueueKind};
pub use crate::space::{BufferHandle, BufferPool, SpaceManager};
pub use crate::traits::{CoreCache, ReadOnlyCache};

pub mod eviction_list;
pub mod key_index;
pub mod shard;
pub mod slot_pool;

pub use eviction_list::{EvictionList, EvictionListIter};
pub use key_index::KeyIndexMap;
pub use shard::ShardSelector;
pub use slot_pool::{SlotIndex, SlotPool};

//! # Metrics Trait Hierarchy
//!
//! Recording and snapshotting are split into small traits so the cache
//! engines only ever write counters and callers only ever read snapshots.
//!
//! ```text
//!                 ┌─────────────────────────────┐
//!                 │     CoreMetricsRecorder     │
//!                 │  get_hit/get_miss/insert    │
//!                 │  evict/clear                │
//!                 └──────────────┬──────────────┘
//!                                │
//!                ┌───────────────┴───────────────┐
//!                ▼                               ▼
//!        ┌──────────────┐                ┌──────────────┐
//!        │ LruRecorder  │                │ ArcRecorder  │
//!        │ pop_lru      │                │ ghost hits   │
//!        └──────────────┘                │ p moves      │
//!                                        │ bypasses     │
//!                                        └──────────────┘
//!
//!   Consumption:
//!   ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │
//!   └──────────────────────────────┘
//! ```
//!
//! No exporter is provided; snapshots are plain `Copy` structs that callers
//! forward to whatever monitoring they run.

/// Common counters for any cache policy.
pub trait CoreMetricsRecorder {
    fn record_get_hit(&mut self);
    fn record_get_miss(&mut self);
    fn record_insert_call(&mut self);
    fn record_insert_new(&mut self);
    fn record_insert_update(&mut self);
    fn record_evict_call(&mut self);
    fn record_evicted_entry(&mut self);
    fn record_clear(&mut self);
}

/// Metrics for LRU behavior (recency order).
pub trait LruMetricsRecorder: CoreMetricsRecorder {
    fn record_pop_lru_call(&mut self);
    fn record_pop_lru_found(&mut self);
}

/// Metrics for ARC behavior (adaptive replacement).
pub trait ArcMetricsRecorder: CoreMetricsRecorder {
    fn record_t1_to_t2_promotion(&mut self);
    fn record_b1_ghost_hit(&mut self);
    fn record_b2_ghost_hit(&mut self);
    fn record_p_increase(&mut self);
    fn record_p_decrease(&mut self);
    fn record_t1_eviction(&mut self);
    fn record_t2_eviction(&mut self);
    fn record_bypass(&mut self);
}

/// Produce a point-in-time copy of a cache's counters and gauges.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

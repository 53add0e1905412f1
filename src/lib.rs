//! blockcache: block cache primitives for storage nodes.
//!
//! - [`space`]: TLSF space manager and the buffer pool carved from it.
//! - [`ds`]: slot pool, array-indexed eviction lists, sharded key index.
//! - [`policy`]: ARC and LRU replacement over those lists.
//! - [`pattern`]: batch and streaming sequential/random classification.
//! - [`block_cache`]: ARC over pool buffers with sequential bypass.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod block_cache;
pub mod builder;
pub mod config;
pub mod ds;
pub mod error;
pub mod pattern;
pub mod policy;
pub mod space;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod traits;

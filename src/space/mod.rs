//! Address-space management.
//!
//! - [`SizeClasses`]: two-level size-class mapping.
//! - [`TlsfSpace`]: single-owner TLSF allocator over a growable range.
//! - [`SpaceManager`]: thread-safe wrapper used by the rest of the crate.
//! - [`BufferPool`]: byte region carved by a `SpaceManager`.

pub mod buffer_pool;
pub mod manager;
pub mod size_class;
pub mod tlsf;

pub use buffer_pool::{BufferHandle, BufferPool};
pub use manager::SpaceManager;
pub use size_class::SizeClasses;
pub use tlsf::{SpaceSnapshot, TlsfSpace};

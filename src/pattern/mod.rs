//! Sequential/random I/O pattern detection.
//!
//! Two classifiers share the vocabulary in this module:
//!
//! - [`SequentialIdentifier`](batch::SequentialIdentifier) tags a batch of
//!   requests in one scan, using a look-ahead window to decide whether a run
//!   of contiguous requests is a sequential stream.
//! - [`IoStateMachine`](stream::IoStateMachine) sees one access at a time and
//!   keeps a two-state verdict with hysteresis; callers gate read-ahead and
//!   cache admission on its *current state*, not on per-request tags.
//!
//! ```text
//!              contiguous x sequential_condition
//!   ┌───────────┐ ──────────────────────────────► ┌───────────────┐
//!   │ IoRandom  │                                 │ IoSequential  │
//!   └───────────┘ ◄────────────────────────────── └───────────────┘
//!              non-contiguous x (random_condition + 1)
//! ```
//!
//! Neither classifier reports errors: any `(offset, length)` pair is a valid
//! observation.

pub mod batch;
pub mod stream;

pub use batch::{IoRequest, IoTagged, SequentialIdentifier};
pub use stream::{IoStateMachine, SharedIoStateMachine};

/// Per-request verdict of the batch classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IoPattern {
    Sequential,
    Random,
    /// Not decided yet; the next batch may settle it.
    #[default]
    Unknown,
}

/// Stream-level verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IoState {
    #[default]
    IoRandom,
    IoSequential,
}

impl IoState {
    #[inline]
    pub fn is_sequential(self) -> bool {
        self == IoState::IoSequential
    }
}

/// Source of the "is this access part of a sequential stream" decision used
/// for admission bypass.
pub trait SequentialDetector {
    /// Observes one access and reports whether the stream is sequential.
    fn is_sequential(&mut self, offset: u64, length: u32) -> bool;
}

/// Never reports sequential; admission is never bypassed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSequential;

impl SequentialDetector for NeverSequential {
    #[inline]
    fn is_sequential(&mut self, _offset: u64, _length: u32) -> bool {
        false
    }
}

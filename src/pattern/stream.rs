//! Streaming sequential/random state machine.
//!
//! An access is *contiguous* when it starts where the previous access ended.
//! The machine only changes state after repeated evidence:
//!
//! - In `IoRandom`, a contiguous access bumps `sequential_count`; once it
//!   reaches `sequential_condition` the random count is cleared and the
//!   state becomes `IoSequential`. A non-contiguous access bumps
//!   `random_count` and clears `sequential_count`.
//! - In `IoSequential`, a contiguous access bumps `sequential_count` and,
//!   once it reaches `sequential_condition`, clears `random_count`. A
//!   non-contiguous access clears `sequential_count` and bumps
//!   `random_count`; exceeding `random_condition` returns to `IoRandom`.
//!
//! [`IoStateMachine`] is single-owner. [`SharedIoStateMachine`] wraps the whole
//! transition in one lock so the contiguity check and the counter updates
//! are atomic together.

use parking_lot::Mutex;

use crate::config::PatternConfig;
use crate::pattern::{IoState, SequentialDetector};

#[derive(Debug, Clone)]
pub struct IoStateMachine {
    state: IoState,
    sequential_condition: u32,
    random_condition: u32,
    sequential_count: u32,
    random_count: u32,
    last_end: u64,
}

impl IoStateMachine {
    pub fn new(sequential_condition: u32, random_condition: u32) -> Self {
        tracing::debug!(
            sequential_condition,
            random_condition,
            "io state machine created"
        );
        Self {
            state: IoState::IoRandom,
            sequential_condition,
            random_condition,
            sequential_count: 0,
            random_count: 0,
            last_end: 0,
        }
    }

    pub fn from_config(config: &PatternConfig) -> Self {
        Self::new(config.sequential_condition, config.random_condition)
    }

    /// Observes one access and returns the resulting state.
    pub fn process(&mut self, offset: u64, length: u32) -> IoState {
        let contiguous = offset == self.last_end;
        let before = self.state;

        self.state = match self.state {
            IoState::IoRandom => {
                if contiguous {
                    self.sequential_count = self.sequential_count.saturating_add(1);
                    if self.sequential_count >= self.sequential_condition {
                        self.random_count = 0;
                        IoState::IoSequential
                    } else {
                        IoState::IoRandom
                    }
                } else {
                    self.random_count = self.random_count.saturating_add(1);
                    self.sequential_count = 0;
                    IoState::IoRandom
                }
            },
            IoState::IoSequential => {
                if contiguous {
                    self.sequential_count = self.sequential_count.saturating_add(1);
                    if self.sequential_count >= self.sequential_condition {
                        self.random_count = 0;
                    }
                    IoState::IoSequential
                } else {
                    self.sequential_count = 0;
                    self.random_count = self.random_count.saturating_add(1);
                    if self.random_count > self.random_condition {
                        IoState::IoRandom
                    } else {
                        IoState::IoSequential
                    }
                }
            },
        };
        self.last_end = offset.saturating_add(u64::from(length));

        if self.state != before && tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(from = ?before, to = ?self.state, offset, "io state changed");
        }
        self.state
    }

    pub fn state(&self) -> IoState {
        self.state
    }

    pub fn sequential_count(&self) -> u32 {
        self.sequential_count
    }

    pub fn random_count(&self) -> u32 {
        self.random_count
    }

    /// Replaces both thresholds; counters and state are kept.
    pub fn update_thresholds(&mut self, sequential_condition: u32, random_condition: u32) {
        self.sequential_condition = sequential_condition;
        self.random_condition = random_condition;
        tracing::info!(
            sequential_condition,
            random_condition,
            "io state machine thresholds updated"
        );
    }

    /// Back to `IoRandom` with zeroed counters and no history.
    pub fn reset(&mut self) {
        self.state = IoState::IoRandom;
        self.sequential_count = 0;
        self.random_count = 0;
        self.last_end = 0;
    }
}

impl Default for IoStateMachine {
    fn default() -> Self {
        Self::from_config(&PatternConfig::default())
    }
}

impl SequentialDetector for IoStateMachine {
    #[inline]
    fn is_sequential(&mut self, offset: u64, length: u32) -> bool {
        self.process(offset, length).is_sequential()
    }
}

/// [`IoStateMachine`] shared between threads.
#[derive(Debug, Default)]
pub struct SharedIoStateMachine {
    inner: Mutex<IoStateMachine>,
}

impl SharedIoStateMachine {
    pub fn new(sequential_condition: u32, random_condition: u32) -> Self {
        Self {
            inner: Mutex::new(IoStateMachine::new(sequential_condition, random_condition)),
        }
    }

    pub fn process(&self, offset: u64, length: u32) -> IoState {
        self.inner.lock().process(offset, length)
    }

    pub fn state(&self) -> IoState {
        self.inner.lock().state()
    }

    pub fn update_thresholds(&self, sequential_condition: u32, random_condition: u32) {
        self.inner
            .lock()
            .update_thresholds(sequential_condition, random_condition);
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }
}

impl SequentialDetector for &SharedIoStateMachine {
    #[inline]
    fn is_sequential(&mut self, offset: u64, length: u32) -> bool {
        self.process(offset, length).is_sequential()
    }
}

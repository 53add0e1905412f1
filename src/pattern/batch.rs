//! Batch sequential/random classification.
//!
//! [`SequentialIdentifier::classify`] walks a batch once. A request that
//! starts exactly at the running offset continues the stream and is tagged
//! sequential immediately. Otherwise the identifier looks ahead: consecutive
//! requests that abut each other form a run, and the run is tagged
//! sequential once it reaches `sequential_limiting` contiguous pairs or the
//! end of the batch; a run broken earlier is tagged random. A trailing
//! request that starts no run stays [`IoPattern::Unknown`].
//!
//! ```text
//!   limit = 4, running offset = 0
//!
//!   offset   4K  5K  6K  | 8K  9K  10K 11K | 13K
//!   run      ─────────── x ─────────────── x
//!   verdict  R   R   R     R   R   R   R     ?
//! ```
//!
//! The running offset survives between calls, so a stream split across
//! batches is still recognised.

use crate::pattern::{IoPattern, IoState};

/// A request the batch classifier can tag.
pub trait IoTagged {
    fn offset(&self) -> u64;
    fn length(&self) -> u32;
    fn pattern(&self) -> IoPattern;
    fn set_pattern(&mut self, pattern: IoPattern);

    #[inline]
    fn end(&self) -> u64 {
        self.offset() + u64::from(self.length())
    }
}

/// Plain `(offset, length)` request carrying its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoRequest {
    pub offset: u64,
    pub length: u32,
    pub pattern: IoPattern,
}

impl IoRequest {
    pub fn new(offset: u64, length: u32) -> Self {
        Self {
            offset,
            length,
            pattern: IoPattern::Unknown,
        }
    }
}

impl IoTagged for IoRequest {
    #[inline]
    fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    fn length(&self) -> u32 {
        self.length
    }

    #[inline]
    fn pattern(&self) -> IoPattern {
        self.pattern
    }

    #[inline]
    fn set_pattern(&mut self, pattern: IoPattern) {
        self.pattern = pattern;
    }
}

/// Batch classifier with a running offset that persists across calls.
#[derive(Debug, Clone)]
pub struct SequentialIdentifier {
    sequential_limiting: usize,
    last_offset: u64,
    state: IoState,
}

impl SequentialIdentifier {
    /// `sequential_limiting` is clamped to at least 1.
    pub fn new(sequential_limiting: usize) -> Self {
        Self {
            sequential_limiting: sequential_limiting.max(1),
            last_offset: 0,
            state: IoState::IoRandom,
        }
    }

    pub fn sequential_limiting(&self) -> usize {
        self.sequential_limiting
    }

    /// End of the last request recognised as sequential.
    pub fn last_offset(&self) -> u64 {
        self.last_offset
    }

    /// Verdict of the most recent decision.
    pub fn state(&self) -> IoState {
        self.state
    }

    /// Tags every decidable request of `requests`.
    pub fn classify<R: IoTagged>(&mut self, requests: &mut [R]) {
        let len = requests.len();
        // Length of the pending look-ahead run, in contiguous pairs.
        let mut run = 0usize;
        let mut i = 0;

        while i < len {
            if requests[i].offset() == self.last_offset {
                tag(&mut requests[i - run..=i], IoPattern::Sequential);
                run = 0;
                self.last_offset = requests[i].end();
                self.state = IoState::IoSequential;
                i += 1;
                continue;
            }
            if i + 1 >= len {
                break;
            }

            if requests[i].end() == requests[i + 1].offset() {
                run += 1;
                if run >= self.sequential_limiting || i + 1 == len - 1 {
                    tag(&mut requests[i + 1 - run..=i + 1], IoPattern::Sequential);
                    self.last_offset = requests[i + 1].end();
                    self.state = IoState::IoSequential;
                    if tracing::enabled!(tracing::Level::DEBUG) {
                        tracing::debug!(
                            start = i + 1 - run,
                            end = i + 1,
                            last_offset = self.last_offset,
                            "batch run classified sequential"
                        );
                    }
                    run = 0;
                    i += 1;
                }
            } else {
                tag(&mut requests[i - run..=i], IoPattern::Random);
                self.state = IoState::IoRandom;
                if tracing::enabled!(tracing::Level::DEBUG) {
                    tracing::debug!(
                        start = i - run,
                        end = i,
                        "batch run classified random"
                    );
                }
                run = 0;
            }
            i += 1;
        }
    }

    /// Forgets the running offset.
    pub fn reset(&mut self) {
        self.last_offset = 0;
        self.state = IoState::IoRandom;
    }
}

fn tag<R: IoTagged>(requests: &mut [R], pattern: IoPattern) {
    for request in requests {
        request.set_pattern(pattern);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: u32 = 1024;

    fn requests(offsets: &[u64]) -> Vec<IoRequest> {
        offsets.iter().map(|&o| IoRequest::new(o, BLOCK)).collect()
    }

    fn patterns(requests: &[IoRequest]) -> Vec<IoPattern> {
        requests.iter().map(|r| r.pattern).collect()
    }

    #[test]
    fn look_ahead_run_reaching_limit_is_sequential() {
        let mut id = SequentialIdentifier::new(4);
        let mut batch = requests(&[4096, 5120, 6144, 7168, 8192]);
        id.classify(&mut batch);
        assert!(batch.iter().all(|r| r.pattern == IoPattern::Sequential));
        assert_eq!(id.last_offset(), 9216);
        assert_eq!(id.state(), IoState::IoSequential);

        let mut next = requests(&[9216]);
        id.classify(&mut next);
        assert_eq!(next[0].pattern, IoPattern::Sequential);
    }

    #[test]
    fn short_runs_are_random_and_tail_unknown() {
        let mut id = SequentialIdentifier::new(4);
        let mut batch = requests(&[4096, 5120, 6144, 8192, 9216, 10240, 11264, 13312]);
        id.classify(&mut batch);
        let got = patterns(&batch);
        assert!(got[..7].iter().all(|p| *p == IoPattern::Random));
        assert_eq!(got[7], IoPattern::Unknown);
        assert_eq!(id.state(), IoState::IoRandom);
    }

    #[test]
    fn single_request_without_history_stays_unknown() {
        let mut id = SequentialIdentifier::new(2);
        let mut batch = requests(&[1 << 20]);
        id.classify(&mut batch);
        assert_eq!(batch[0].pattern, IoPattern::Unknown);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut id = SequentialIdentifier::new(2);
        let mut batch: Vec<IoRequest> = Vec::new();
        id.classify(&mut batch);
        assert_eq!(id.last_offset(), 0);
    }

    #[test]
    fn run_reaching_batch_end_uses_its_own_length() {
        let mut id = SequentialIdentifier::new(8);
        let mut batch = vec![IoRequest::new(100, 10), IoRequest::new(110, 30)];
        id.classify(&mut batch);
        assert!(batch.iter().all(|r| r.pattern == IoPattern::Sequential));
        assert_eq!(id.last_offset(), 140);
    }

    #[test]
    fn reset_forgets_running_offset() {
        let mut id = SequentialIdentifier::new(1);
        let mut batch = requests(&[0, 1024]);
        id.classify(&mut batch);
        assert_eq!(id.last_offset(), 2048);
        id.reset();
        assert_eq!(id.last_offset(), 0);
        assert_eq!(id.state(), IoState::IoRandom);
    }
}

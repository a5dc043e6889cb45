//! Downstream side of the link.
//!
//! The reader loop hands every valid frame to a [`FrameSink`]. The sink has
//! no way to push back, so [`FrameCollector`] keeps a bounded queue and
//! drops the oldest frame when a consumer falls behind.

use crate::link::Frame;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::warn;

/// Default number of frames held before the oldest is dropped.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Receiver of validated frames.
pub trait FrameSink: Send + Sync {
    fn accept(&self, frame: Frame);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectorSummary {
    pub accepted: u64,
    pub dropped: u64,
    pub queued: usize,
}

#[derive(Debug, Default)]
struct CollectorState {
    queue: VecDeque<Frame>,
    accepted: u64,
    dropped: u64,
}

#[derive(Debug)]
pub struct FrameCollector {
    capacity: usize,
    state: Mutex<CollectorState>,
}

impl Default for FrameCollector {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl FrameCollector {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(CollectorState {
                queue: VecDeque::with_capacity(capacity),
                ..Default::default()
            }),
        }
    }

    /// Take every queued frame, oldest first.
    pub fn drain(&self) -> Vec<Frame> {
        self.state.lock().queue.drain(..).collect()
    }

    pub fn summary(&self) -> CollectorSummary {
        let state = self.state.lock();
        CollectorSummary {
            accepted: state.accepted,
            dropped: state.dropped,
            queued: state.queue.len(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl FrameSink for FrameCollector {
    fn accept(&self, frame: Frame) {
        let mut state = self.state.lock();
        state.accepted += 1;
        state.queue.push_back(frame);

        if state.queue.len() > self.capacity {
            if let Some(oldest) = state.queue.pop_front() {
                state.dropped += 1;
                // Log once per full queue's worth of drops.
                if (state.dropped - 1) % self.capacity as u64 == 0 {
                    warn!(
                        dropped = state.dropped,
                        code = %oldest.code_hex(),
                        "Frame collector is full, dropping oldest frames"
                    );
                }
            }
        }
    }
}

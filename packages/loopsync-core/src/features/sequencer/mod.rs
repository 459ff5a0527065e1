//! Iteration-ordered segment sequencer
//!
//! Runtime counterpart of [`SequentialSegment`](crate::features::sequential_segments::SequentialSegment):
//! segment `k` of iteration `i` completes before segment `k` of iteration
//! `i + 1` starts, whichever replica runs each iteration. A plain mutex would
//! only give exclusion, not the order.
//!
//! Each segment keeps a ticket (the next iteration allowed in) behind a
//! `parking_lot::Mutex` and a `Condvar` to wake waiters.

use crate::errors::{LoopSyncError, Result};
use crate::shared::models::SegmentId;
use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Slot {
    next: Mutex<u64>,
    turn: Condvar,
}

#[derive(Debug)]
pub struct SegmentSequencer {
    slots: Vec<Slot>,
}

impl SegmentSequencer {
    pub fn new(segment_count: usize) -> Self {
        Self {
            slots: (0..segment_count).map(|_| Slot::default()).collect(),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, segment: SegmentId) -> Result<&Slot> {
        self.slots.get(segment.index()).ok_or_else(|| {
            LoopSyncError::precondition(format!(
                "{} is not one of the {} sequenced segments",
                segment,
                self.slots.len()
            ))
        })
    }

    /// Block until every iteration before `iteration` has released `segment`
    pub fn wait(&self, segment: SegmentId, iteration: u64) -> Result<()> {
        let slot = self.slot(segment)?;
        let mut next = slot.next.lock();
        if *next > iteration {
            return Err(LoopSyncError::precondition(format!(
                "iteration {} already passed {}",
                iteration, segment
            )));
        }
        while *next != iteration {
            slot.turn.wait(&mut next);
        }
        Ok(())
    }

    /// Release `segment` for the iteration after `iteration`
    pub fn signal(&self, segment: SegmentId, iteration: u64) -> Result<()> {
        let slot = self.slot(segment)?;
        let mut next = slot.next.lock();
        if *next != iteration {
            return Err(LoopSyncError::precondition(format!(
                "iteration {} released {} out of turn (expected {})",
                iteration, segment, *next
            )));
        }
        *next += 1;
        slot.turn.notify_all();
        Ok(())
    }

    /// `wait` and return a guard that signals on drop
    pub fn enter(&self, segment: SegmentId, iteration: u64) -> Result<SegmentGuard<'_>> {
        self.wait(segment, iteration)?;
        Ok(SegmentGuard {
            sequencer: self,
            segment,
            iteration,
        })
    }

    /// Next iteration allowed into `segment`
    pub fn next_iteration(&self, segment: SegmentId) -> Option<u64> {
        self.slots.get(segment.index()).map(|slot| *slot.next.lock())
    }
}

/// Held while one iteration runs a segment
#[must_use = "dropping the guard releases the segment immediately"]
#[derive(Debug)]
pub struct SegmentGuard<'a> {
    sequencer: &'a SegmentSequencer,
    segment: SegmentId,
    iteration: u64,
}

impl SegmentGuard<'_> {
    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }
}

impl Drop for SegmentGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.sequencer.signal(self.segment, self.iteration) {
            tracing::warn!(error = %e, "segment release failed");
        }
    }
}

// Copyright 2026 the Gyre Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The composition slot ring.
//!
//! Composition requests are written by the render thread and read by the
//! display driver, with no rendezvous between them: [`SlotRing`] keeps
//! `N ≥ 2` request slots in flight so the render thread never stalls
//! waiting for the driver to consume the previous submission.
//!
//! Frame `f` writes slot `f mod N`. A slot becomes reusable once the
//! driver confirms consumption through its [`RetireHandle`] (a single
//! atomic counter, the one piece of state intentionally shared without a
//! lock). If the driver falls `N` submissions behind, the ring refuses the
//! slot and the frame is dropped, consistent with the rest of the
//! pipeline's drop-don't-retry policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use gyre_core::warp::CompositionRequest;

/// Default number of in-flight composition slots.
pub const DEFAULT_SLOT_DEPTH: usize = 3;

/// Driver-side handle confirming consumption of submissions, in order.
#[derive(Clone, Debug)]
pub struct RetireHandle {
    confirmed: Arc<AtomicU64>,
}

impl RetireHandle {
    /// Marks the oldest outstanding submission as consumed, freeing its
    /// slot for reuse.
    pub fn retire(&self) {
        self.confirmed.fetch_add(1, Ordering::Release);
    }
}

/// Ring of composition request slots written by the render thread.
#[derive(Debug)]
pub struct SlotRing {
    slots: Vec<CompositionRequest>,
    submitted: u64,
    confirmed: Arc<AtomicU64>,
}

impl SlotRing {
    /// Creates a ring with `depth` slots; depths below 2 are promoted to 2.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(2);
        Self {
            slots: vec![CompositionRequest::init(90.0); depth],
            submitted: 0,
            confirmed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the handle the display driver uses to confirm consumption.
    #[must_use]
    pub fn retire_handle(&self) -> RetireHandle {
        RetireHandle {
            confirmed: Arc::clone(&self.confirmed),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Submissions not yet confirmed by the driver.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.submitted - self.confirmed.load(Ordering::Acquire)
    }

    /// Stores `request` in the next slot and returns a reference to it for
    /// submission, or `None` when every slot is still awaiting driver
    /// confirmation.
    pub fn begin(&mut self, request: CompositionRequest) -> Option<&CompositionRequest> {
        if self.in_flight() >= self.slots.len() as u64 {
            return None;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "slot index is submitted mod depth, far below usize::MAX"
        )]
        let index = (self.submitted % self.slots.len() as u64) as usize;
        self.slots[index] = request;
        self.submitted += 1;
        Some(&self.slots[index])
    }

    /// The most recently written request, if any frame has been submitted.
    #[must_use]
    pub fn last(&self) -> Option<&CompositionRequest> {
        if self.submitted == 0 {
            return None;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "slot index is submitted mod depth, far below usize::MAX"
        )]
        let index = ((self.submitted - 1) % self.slots.len() as u64) as usize;
        Some(&self.slots[index])
    }
}

#[cfg(test)]
mod tests {
    use gyre_core::warp::TextureId;

    use super::*;

    fn request_with_texture(id: u32) -> CompositionRequest {
        let mut request = CompositionRequest::init(90.0);
        request.eyes[0].texture = TextureId(id);
        request
    }

    #[test]
    fn slots_rotate_modulo_depth() {
        let mut ring = SlotRing::new(2);
        let handle = ring.retire_handle();

        assert!(ring.begin(request_with_texture(1)).is_some());
        handle.retire();
        assert!(ring.begin(request_with_texture(2)).is_some());
        handle.retire();
        assert!(ring.begin(request_with_texture(3)).is_some());

        // Third submission reused slot 0.
        assert_eq!(ring.last().unwrap().eyes[0].texture, TextureId(3));
        assert_eq!(ring.in_flight(), 1);
    }

    #[test]
    fn full_ring_refuses_rather_than_overwrites() {
        let mut ring = SlotRing::new(2);
        assert!(ring.begin(request_with_texture(1)).is_some());
        assert!(ring.begin(request_with_texture(2)).is_some());
        // No confirmations yet: both slots are in flight.
        assert!(ring.begin(request_with_texture(3)).is_none());
        assert_eq!(ring.in_flight(), 2);

        // One confirmation frees exactly one slot.
        ring.retire_handle().retire();
        assert!(ring.begin(request_with_texture(3)).is_some());
    }

    #[test]
    fn depth_below_two_is_promoted() {
        let ring = SlotRing::new(0);
        assert_eq!(ring.depth(), 2);
    }

    #[test]
    fn last_is_none_before_first_submission() {
        let ring = SlotRing::new(3);
        assert!(ring.last().is_none());
    }

    #[test]
    fn retire_from_another_thread() {
        let mut ring = SlotRing::new(2);
        let handle = ring.retire_handle();
        assert!(ring.begin(request_with_texture(1)).is_some());
        assert!(ring.begin(request_with_texture(2)).is_some());

        let driver = std::thread::spawn(move || {
            handle.retire();
            handle.retire();
        });
        driver.join().unwrap();
        assert_eq!(ring.in_flight(), 0);
    }
}

//! Custody hand-off tracking
//!
//! After a bundle is handed to the next hop with custody transfer requested,
//! it stays out of the candidate set for a short window while the
//! acknowledgement is pending. The entry is cleared when the window elapses
//! or the acknowledgement arrives, whichever comes first.

use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

use ferry_core::{PeerIdentity, SimTime};

use crate::bundle::BundleId;

/// How long a handed-off bundle stays pending
pub const CUSTODY_PENDING_WINDOW: Duration = Duration::from_secs(5);

/// Bundles whose custody hand-off awaits acknowledgement
#[derive(Debug, Clone, Default)]
pub struct CustodyTracker<I: PeerIdentity> {
    /// Bundle -> when the pending entry expires
    pending: HashMap<BundleId<I>, SimTime>,
}

impl<I: PeerIdentity> CustodyTracker<I> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Mark a bundle pending; returns the expiry instant
    pub fn mark_pending(&mut self, bundle_id: &BundleId<I>, now: SimTime) -> SimTime {
        let expires_at = now + CUSTODY_PENDING_WINDOW;
        self.pending.insert(bundle_id.clone(), expires_at);
        trace!(bundle_id = %bundle_id, expires_at = %expires_at, "custody pending");
        expires_at
    }

    pub fn is_pending(&self, bundle_id: &BundleId<I>) -> bool {
        self.pending.contains_key(bundle_id)
    }

    /// Clear on acknowledgement; returns whether an entry existed
    pub fn clear(&mut self, bundle_id: &BundleId<I>) -> bool {
        self.pending.remove(bundle_id).is_some()
    }

    /// Clear the entry only if its window has elapsed
    ///
    /// Used by the expiry timer: a bundle re-marked after the timer was armed
    /// carries a later expiry and must stay pending.
    pub fn clear_if_expired(&mut self, bundle_id: &BundleId<I>, now: SimTime) -> bool {
        match self.pending.get(bundle_id) {
            Some(expires_at) if *expires_at <= now => {
                self.pending.remove(bundle_id);
                true
            }
            _ => false,
        }
    }

    /// Number of pending hand-offs
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::SimulationIdentity;

    fn bundle_id(seq: u32) -> BundleId<SimulationIdentity> {
        BundleId::new(SimulationIdentity('A'), SimTime::ZERO, seq)
    }

    #[test]
    fn test_mark_and_clear() {
        let mut tracker = CustodyTracker::new();
        let expires = tracker.mark_pending(&bundle_id(1), SimTime::from_secs(10));
        assert_eq!(expires, SimTime::from_secs(15));
        assert!(tracker.is_pending(&bundle_id(1)));

        assert!(tracker.clear(&bundle_id(1)));
        assert!(!tracker.is_pending(&bundle_id(1)));
        assert!(!tracker.clear(&bundle_id(1)));
    }

    #[test]
    fn test_pending_for_exactly_the_window() {
        let mut tracker = CustodyTracker::new();
        tracker.mark_pending(&bundle_id(1), SimTime::from_secs(10));

        assert!(!tracker.clear_if_expired(&bundle_id(1), SimTime::from_millis(14_999)));
        assert!(tracker.is_pending(&bundle_id(1)));
        assert!(tracker.clear_if_expired(&bundle_id(1), SimTime::from_secs(15)));
        assert!(!tracker.is_pending(&bundle_id(1)));
    }

    #[test]
    fn test_stale_expiry_keeps_remarked_entry() {
        let mut tracker = CustodyTracker::new();
        tracker.mark_pending(&bundle_id(1), SimTime::from_secs(10));
        tracker.mark_pending(&bundle_id(1), SimTime::from_secs(13));

        // Timer armed by the first mark fires at 15
        assert!(!tracker.clear_if_expired(&bundle_id(1), SimTime::from_secs(15)));
        assert!(tracker.is_pending(&bundle_id(1)));
        assert_eq!(tracker.pending_count(), 1);
    }
}

//! Forward log
//!
//! Remembers which bundles were already offered over which link so the same
//! pair is not offered again until the entry expires. Expiry is only
//! evaluated by explicit housekeeping ([`ForwardLog::remove_expired`]).

use std::collections::HashMap;
use std::time::Duration;

use ferry_core::{PeerIdentity, SimTime};

use crate::bundle::BundleId;
use crate::link::LinkAddress;

/// Record of (bundle, link) offers
#[derive(Debug, Clone)]
pub struct ForwardLog<I: PeerIdentity> {
    /// (bundle, link) -> when it was logged
    entries: HashMap<(BundleId<I>, LinkAddress), SimTime>,
    /// How long an entry suppresses re-offering
    expiry: Duration,
}

impl<I: PeerIdentity> ForwardLog<I> {
    pub fn new(expiry: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            expiry,
        }
    }

    /// Whether a live entry exists for the pair
    pub fn has_entry(&self, bundle_id: &BundleId<I>, link: LinkAddress) -> bool {
        self.entries.contains_key(&(bundle_id.clone(), link))
    }

    /// Log an offer; re-logging an existing pair refreshes its timestamp
    pub fn add_entry(&mut self, bundle_id: &BundleId<I>, link: LinkAddress, now: SimTime) {
        self.entries.insert((bundle_id.clone(), link), now);
    }

    /// Forget a single offer, e.g. one that never reached the link
    pub fn remove_entry(&mut self, bundle_id: &BundleId<I>, link: LinkAddress) -> bool {
        self.entries.remove(&(bundle_id.clone(), link)).is_some()
    }

    /// Drop entries older than the expiry window
    pub fn remove_expired(&mut self, now: SimTime) -> usize {
        let before = self.entries.len();
        let expiry = self.expiry;
        self.entries.retain(|_, logged_at| *logged_at + expiry > now);
        before - self.entries.len()
    }

    /// Drop every entry for a bundle (delivered or deleted)
    pub fn remove_entries_for(&mut self, bundle_id: &BundleId<I>) {
        self.entries.retain(|(id, _), _| id != bundle_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
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
    fn test_entry_blocks_until_expiry() {
        let mut log = ForwardLog::new(Duration::from_secs(30));
        let link = LinkAddress(1);
        log.add_entry(&bundle_id(1), link, SimTime::from_secs(10));

        assert!(log.has_entry(&bundle_id(1), link));
        assert!(!log.has_entry(&bundle_id(1), LinkAddress(2)));
        assert!(!log.has_entry(&bundle_id(2), link));

        assert_eq!(log.remove_expired(SimTime::from_secs(39)), 0);
        assert!(log.has_entry(&bundle_id(1), link));

        assert_eq!(log.remove_expired(SimTime::from_secs(40)), 1);
        assert!(!log.has_entry(&bundle_id(1), link));
    }

    #[test]
    fn test_no_duplicate_pairs() {
        let mut log = ForwardLog::new(Duration::from_secs(30));
        log.add_entry(&bundle_id(1), LinkAddress(1), SimTime::ZERO);
        log.add_entry(&bundle_id(1), LinkAddress(1), SimTime::from_secs(20));
        assert_eq!(log.len(), 1);

        // Refreshed, so still alive past the first window
        log.remove_expired(SimTime::from_secs(35));
        assert!(log.has_entry(&bundle_id(1), LinkAddress(1)));
    }

    #[test]
    fn test_remove_entries_for_bundle() {
        let mut log = ForwardLog::new(Duration::from_secs(30));
        log.add_entry(&bundle_id(1), LinkAddress(1), SimTime::ZERO);
        log.add_entry(&bundle_id(1), LinkAddress(2), SimTime::ZERO);
        log.add_entry(&bundle_id(2), LinkAddress(1), SimTime::ZERO);

        assert!(log.remove_entry(&bundle_id(1), LinkAddress(2)));
        assert!(!log.remove_entry(&bundle_id(1), LinkAddress(2)));

        log.remove_entries_for(&bundle_id(1));
        assert_eq!(log.len(), 1);
        assert!(log.has_entry(&bundle_id(2), LinkAddress(1)));
    }
}

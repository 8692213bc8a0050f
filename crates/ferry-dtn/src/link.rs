//! Links and their contact lifecycle
//!
//! A link moves through `Discovered → Connected → Paused → {Connected, Closed}`.
//! Links are owned by the convergence layer's [`LinkRegistry`]; the router
//! only reads them and drives state changes and the retransmission counter.

use std::collections::{BTreeMap, VecDeque};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::trace;

use ferry_core::{PeerIdentity, SimTime};

use crate::bundle::BundleId;

/// Address of a link at the convergence layer
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display("{_0:012x}")]
pub struct LinkAddress(pub u64);

/// Contact lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum LinkState {
    /// Reported by neighbor discovery, not yet used
    Discovered,
    /// Open for transmissions
    Connected,
    /// Backing off after a failed transmission
    Paused,
    /// Torn down; needs rediscovery
    Closed,
}

impl LinkState {
    /// Whether `self → to` is a legal lifecycle step
    pub fn can_transition_to(self, to: LinkState) -> bool {
        use LinkState::*;
        matches!(
            (self, to),
            (Discovered, Connected)
                | (Connected, Paused)
                | (Paused, Connected)
                | (Discovered | Connected | Paused, Closed)
        )
    }
}

/// Transmission queue of a link
#[derive(Debug, Clone)]
pub struct Contact<I: PeerIdentity> {
    /// Bundles offered or in flight on this link
    queued: VecDeque<BundleId<I>>,
    /// Consecutive failed transmissions
    pub retransmissions: u32,
}

impl<I: PeerIdentity> Default for Contact<I> {
    fn default() -> Self {
        Self {
            queued: VecDeque::new(),
            retransmissions: 0,
        }
    }
}

impl<I: PeerIdentity> Contact<I> {
    pub fn enqueue(&mut self, id: BundleId<I>) {
        if !self.queued.contains(&id) {
            self.queued.push_back(id);
        }
    }

    /// Remove a bundle from the queue; returns whether it was queued
    pub fn dequeue(&mut self, id: &BundleId<I>) -> bool {
        match self.queued.iter().position(|q| q == id) {
            Some(index) => {
                self.queued.remove(index);
                true
            }
            None => false,
        }
    }

    /// Empty the queue, returning what was in it
    pub fn drain(&mut self) -> Vec<BundleId<I>> {
        self.queued.drain(..).collect()
    }

    pub fn is_queued(&self, id: &BundleId<I>) -> bool {
        self.queued.contains(id)
    }

    pub fn queued(&self) -> impl Iterator<Item = &BundleId<I>> {
        self.queued.iter()
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}

/// A link to a neighbor
#[derive(Debug, Clone)]
pub struct Link<I: PeerIdentity> {
    pub remote_eid: I,
    pub address: LinkAddress,
    state: LinkState,
    pub contact: Contact<I>,
    pub last_heard_from: Option<SimTime>,
}

impl<I: PeerIdentity> Link<I> {
    /// A freshly discovered link
    pub fn new(remote_eid: I, address: LinkAddress) -> Self {
        Self {
            remote_eid,
            address,
            state: LinkState::Discovered,
            contact: Contact::default(),
            last_heard_from: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn is_closed(&self) -> bool {
        self.state == LinkState::Closed
    }

    /// Move to `to` if the lifecycle allows it
    ///
    /// Returns false and leaves the state untouched otherwise.
    pub fn transition(&mut self, to: LinkState) -> bool {
        if !self.state.can_transition_to(to) {
            trace!(link = %self.address, from = %self.state, to = %to, "ignored link transition");
            return false;
        }
        trace!(link = %self.address, from = %self.state, to = %to, "link transition");
        self.state = to;
        true
    }

    pub fn heard_from(&mut self, now: SimTime) {
        self.last_heard_from = Some(now);
    }
}

/// Links known to a convergence layer, in ascending address order
#[derive(Debug, Clone)]
pub struct LinkRegistry<I: PeerIdentity> {
    links: BTreeMap<LinkAddress, Link<I>>,
}

impl<I: PeerIdentity> Default for LinkRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: PeerIdentity> LinkRegistry<I> {
    pub fn new() -> Self {
        Self {
            links: BTreeMap::new(),
        }
    }

    /// Register a link, replacing any previous link at the same address
    pub fn insert(&mut self, link: Link<I>) -> Option<Link<I>> {
        self.links.insert(link.address, link)
    }

    pub fn remove(&mut self, address: LinkAddress) -> Option<Link<I>> {
        self.links.remove(&address)
    }

    pub fn find(&self, address: LinkAddress) -> Option<&Link<I>> {
        self.links.get(&address)
    }

    pub fn find_mut(&mut self, address: LinkAddress) -> Option<&mut Link<I>> {
        self.links.get_mut(&address)
    }

    /// First live link to a given neighbor
    pub fn find_by_eid(&self, eid: &I) -> Option<&Link<I>> {
        self.links
            .values()
            .find(|l| &l.remote_eid == eid && !l.is_closed())
    }

    pub fn find_by_eid_mut(&mut self, eid: &I) -> Option<&mut Link<I>> {
        self.links
            .values_mut()
            .find(|l| &l.remote_eid == eid && !l.is_closed())
    }

    /// Links currently open for transmissions
    pub fn connected(&self) -> impl Iterator<Item = &Link<I>> {
        self.links.values().filter(|l| l.is_connected())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link<I>> {
        self.links.values()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
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
    fn test_lifecycle_transitions() {
        let mut link = Link::new(SimulationIdentity('B'), LinkAddress(1));
        assert_eq!(link.state(), LinkState::Discovered);

        assert!(!link.transition(LinkState::Paused));
        assert!(link.transition(LinkState::Connected));
        assert!(link.transition(LinkState::Paused));
        assert!(!link.transition(LinkState::Paused));
        assert!(link.transition(LinkState::Connected));
        assert!(link.transition(LinkState::Closed));

        // Closed is terminal
        assert!(!link.transition(LinkState::Connected));
        assert!(!link.transition(LinkState::Closed));
        assert!(link.is_closed());
    }

    #[test]
    fn test_contact_queue() {
        let mut contact = Contact::default();
        contact.enqueue(bundle_id(1));
        contact.enqueue(bundle_id(2));
        contact.enqueue(bundle_id(1));
        assert_eq!(contact.len(), 2);

        assert!(contact.dequeue(&bundle_id(1)));
        assert!(!contact.dequeue(&bundle_id(1)));
        assert!(contact.is_queued(&bundle_id(2)));

        assert_eq!(contact.drain(), vec![bundle_id(2)]);
        assert!(contact.is_empty());
    }

    #[test]
    fn test_registry_orders_by_address() {
        let mut registry = LinkRegistry::new();
        for (addr, c) in [(3, 'D'), (1, 'B'), (2, 'C')] {
            let mut link = Link::new(SimulationIdentity(c), LinkAddress(addr));
            link.transition(LinkState::Connected);
            registry.insert(link);
        }
        registry
            .find_mut(LinkAddress(2))
            .unwrap()
            .transition(LinkState::Paused);

        let connected: Vec<char> = registry.connected().map(|l| l.remote_eid.0).collect();
        assert_eq!(connected, vec!['B', 'D']);
        assert_eq!(
            registry.find_by_eid(&SimulationIdentity('C')).unwrap().address,
            LinkAddress(2)
        );
    }

    #[test]
    fn test_link_address_display() {
        assert_eq!(LinkAddress(0xab).to_string(), "0000000000ab");
    }
}

//! Recording convergence layer for testing
//!
//! Provides an in-memory [`ConvergenceLayer`] that records every call the
//! router makes instead of transmitting anything. Tests play the part of the
//! link by calling the router's `on_*` callbacks themselves.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ferry_dtn::{MockConvergenceLayer, ProphetConfig, ProphetRouter};
//! use ferry_core::{SimTime, SimulationIdentity};
//!
//! let mut router = ProphetRouter::new(
//!     SimulationIdentity('A'),
//!     ProphetConfig::default(),
//!     MockConvergenceLayer::new(),
//! );
//! let link = router.transport_mut().add_link(SimulationIdentity('B'));
//! router.on_link_discovered(link, SimTime::ZERO);
//! router.handle_timeout(SimTime::ZERO);
//! ```

use ferry_core::PeerIdentity;

use crate::bundle::{Bundle, BundleId};
use crate::link::{Link, LinkAddress, LinkRegistry, LinkState};
use crate::transport::ConvergenceLayer;

/// A convergence layer that only records what it was asked to do
#[derive(Debug, Clone)]
pub struct MockConvergenceLayer<I: PeerIdentity> {
    links: LinkRegistry<I>,
    next_address: u64,
    sent: Vec<(LinkAddress, BundleId<I>)>,
    cancelled: Vec<(LinkAddress, BundleId<I>)>,
    closed: Vec<LinkAddress>,
    announcing: bool,
}

impl<I: PeerIdentity> Default for MockConvergenceLayer<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: PeerIdentity> MockConvergenceLayer<I> {
    pub fn new() -> Self {
        Self {
            links: LinkRegistry::new(),
            next_address: 1,
            sent: Vec::new(),
            cancelled: Vec::new(),
            closed: Vec::new(),
            announcing: false,
        }
    }

    /// Register a new link to `remote` in the `Discovered` state
    ///
    /// Addresses are handed out in increasing order, so links added first
    /// come first in the registry.
    pub fn add_link(&mut self, remote: I) -> LinkAddress {
        let address = LinkAddress(self.next_address);
        self.next_address += 1;
        self.links.insert(Link::new(remote, address));
        address
    }

    /// Transmissions started so far, oldest first
    pub fn sent(&self) -> &[(LinkAddress, BundleId<I>)] {
        &self.sent
    }

    pub fn last_sent(&self) -> Option<&(LinkAddress, BundleId<I>)> {
        self.sent.last()
    }

    pub fn cancelled(&self) -> &[(LinkAddress, BundleId<I>)] {
        &self.cancelled
    }

    /// Links the router asked to close
    pub fn closed(&self) -> &[LinkAddress] {
        &self.closed
    }

    pub fn is_announcing(&self) -> bool {
        self.announcing
    }
}

impl<I: PeerIdentity> ConvergenceLayer<I> for MockConvergenceLayer<I> {
    fn links(&self) -> &LinkRegistry<I> {
        &self.links
    }

    fn links_mut(&mut self) -> &mut LinkRegistry<I> {
        &mut self.links
    }

    fn close_link(&mut self, address: LinkAddress) {
        self.closed.push(address);
        if let Some(link) = self.links.find_mut(address) {
            link.transition(LinkState::Closed);
        }
    }

    fn send_bundle(&mut self, address: LinkAddress, bundle: &Bundle<I>) {
        self.sent.push((address, bundle.id.clone()));
    }

    fn cancel_transmission(&mut self, address: LinkAddress, bundle_id: &BundleId<I>) {
        self.cancelled.push((address, bundle_id.clone()));
    }

    fn set_announcing(&mut self, active: bool) {
        self.announcing = active;
    }
}

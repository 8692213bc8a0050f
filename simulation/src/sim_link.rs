//! In-memory convergence layer
//!
//! [`SimLink`] owns a node's link registry and turns every router request
//! into a [`LinkCommand`] the world drains after each interaction with the
//! node. Transmission outcomes travel back through the router's callbacks.

use std::collections::VecDeque;

use ferry_core::PeerIdentity;
use ferry_dtn::{Bundle, BundleId, ConvergenceLayer, Link, LinkAddress, LinkRegistry, LinkState};

/// A request from the router to the world
#[derive(Debug, Clone)]
pub enum LinkCommand<I: PeerIdentity> {
    /// Carry a copy of the bundle to the other end of the link
    Send {
        address: LinkAddress,
        bundle: Bundle<I>,
    },
    /// Abort the transmission of a bundle
    Cancel {
        address: LinkAddress,
        id: BundleId<I>,
    },
    /// The router gave up on the link
    Close { address: LinkAddress },
}

/// Convergence layer backed by the simulated world
#[derive(Debug, Clone)]
pub struct SimLink<I: PeerIdentity> {
    links: LinkRegistry<I>,
    next_address: u64,
    commands: VecDeque<LinkCommand<I>>,
    announcing: bool,
}

impl<I: PeerIdentity> Default for SimLink<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: PeerIdentity> SimLink<I> {
    pub fn new() -> Self {
        Self {
            links: LinkRegistry::new(),
            next_address: 1,
            commands: VecDeque::new(),
            announcing: false,
        }
    }

    /// Register a fresh link to `remote`
    ///
    /// Every contact gets a new address, so a transmission can never be
    /// confused with one from an earlier contact with the same peer.
    pub fn add_link(&mut self, remote: I) -> LinkAddress {
        let address = LinkAddress(self.next_address);
        self.next_address += 1;
        self.links.insert(Link::new(remote, address));
        address
    }

    /// Mark a link closed without asking the world to tear the contact down
    pub fn drop_link(&mut self, address: LinkAddress) {
        if let Some(link) = self.links.find_mut(address) {
            link.transition(LinkState::Closed);
        }
    }

    /// Take every command issued since the last call
    pub fn take_commands(&mut self) -> Vec<LinkCommand<I>> {
        self.commands.drain(..).collect()
    }

    pub fn is_announcing(&self) -> bool {
        self.announcing
    }
}

impl<I: PeerIdentity> ConvergenceLayer<I> for SimLink<I> {
    fn links(&self) -> &LinkRegistry<I> {
        &self.links
    }

    fn links_mut(&mut self) -> &mut LinkRegistry<I> {
        &mut self.links
    }

    fn close_link(&mut self, address: LinkAddress) {
        self.drop_link(address);
        self.commands.push_back(LinkCommand::Close { address });
    }

    fn send_bundle(&mut self, address: LinkAddress, bundle: &Bundle<I>) {
        // Provenance is local bookkeeping and does not travel
        let mut copy = bundle.clone();
        copy.received_from.clear();
        self.commands.push_back(LinkCommand::Send {
            address,
            bundle: copy,
        });
    }

    fn cancel_transmission(&mut self, address: LinkAddress, bundle_id: &BundleId<I>) {
        self.commands.push_back(LinkCommand::Cancel {
            address,
            id: bundle_id.clone(),
        });
    }

    fn set_announcing(&mut self, active: bool) {
        self.announcing = active;
    }
}

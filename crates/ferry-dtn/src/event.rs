//! Observable router outcomes

use ferry_core::PeerIdentity;

use crate::bundle::{Bundle, BundleId};
use crate::link::LinkAddress;

/// Something the router did or noticed, for observers and statistics
#[derive(Debug, Clone)]
pub enum RouterEvent<I: PeerIdentity> {
    /// A transmission completed
    BundleSent {
        id: BundleId<I>,
        link: LinkAddress,
        final_delivery: bool,
    },
    /// A bundle is known to have reached its destination
    BundleDelivered { id: BundleId<I> },
    /// This node is the destination of a received bundle
    DeliveredLocally { bundle: Bundle<I> },
    /// A bundle's lifetime elapsed while stored
    Expired { id: BundleId<I> },
    /// A bundle was dropped to make room for another
    Evicted { id: BundleId<I> },
    /// No room for a bundle even after eviction
    BufferOverflow {
        id: BundleId<I>,
        size: usize,
        free: usize,
    },
    /// A copy of a resident bundle arrived again
    RedundantRelay { id: BundleId<I>, from: Option<I> },
    /// A link backs off after a failed transmission
    LinkPaused {
        link: LinkAddress,
        retransmissions: u32,
    },
    /// A link was torn down
    LinkClosed { link: LinkAddress, remote: I },
}

/// Why a bundle left the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteReason {
    Expired,
    Evicted,
    Delivered,
}

/// Result of handing a bundle to the router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Admitted to the store for forwarding
    Stored,
    /// This node is the destination
    DeliveredLocally,
    /// A copy is already resident; provenance merged
    Redundant,
    /// The bundle is already known to be delivered
    AlreadyDelivered,
}

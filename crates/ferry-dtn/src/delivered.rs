//! Known-delivered bundle ids
//!
//! Once a bundle is known to have reached its destination, any copy still
//! held here is dead weight. Ids are remembered until the bundle would have
//! expired anyway.

use std::collections::HashMap;
use std::time::Duration;

use ferry_core::{PeerIdentity, SimTime};

use crate::bundle::BundleId;

/// Retention for ids learned from an acknowledgement alone, where the
/// bundle's own lifetime is unknown
pub const ACK_ONLY_RETENTION: Duration = Duration::from_secs(43_000);

/// How a delivery became known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryNotice<I: PeerIdentity> {
    /// A bundle this node holds (or held) with a known lifetime
    Known { id: BundleId<I>, expires_at: SimTime },
    /// An acknowledgement for a bundle with no local record
    AckOnly(BundleId<I>),
}

impl<I: PeerIdentity> DeliveryNotice<I> {
    pub fn id(&self) -> &BundleId<I> {
        match self {
            DeliveryNotice::Known { id, .. } => id,
            DeliveryNotice::AckOnly(id) => id,
        }
    }

    /// When the id may be forgotten
    pub fn retain_until(&self, now: SimTime) -> SimTime {
        match self {
            DeliveryNotice::Known { expires_at, .. } => *expires_at,
            DeliveryNotice::AckOnly(_) => now + ACK_ONLY_RETENTION,
        }
    }
}

/// Set of delivered bundle ids with expiry
#[derive(Debug, Clone, Default)]
pub struct KnownDelivered<I: PeerIdentity> {
    entries: HashMap<BundleId<I>, SimTime>,
}

impl<I: PeerIdentity> KnownDelivered<I> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Remember a delivered id until `expires_at`
    pub fn insert(&mut self, bundle_id: BundleId<I>, expires_at: SimTime) {
        let entry = self.entries.entry(bundle_id).or_insert(expires_at);
        if *entry < expires_at {
            *entry = expires_at;
        }
    }

    /// Remember the id carried by a delivery notice
    pub fn record(&mut self, notice: &DeliveryNotice<I>, now: SimTime) {
        self.insert(notice.id().clone(), notice.retain_until(now));
    }

    pub fn contains(&self, bundle_id: &BundleId<I>) -> bool {
        self.entries.contains_key(bundle_id)
    }

    pub fn remove_expired(&mut self, now: SimTime) {
        self.entries.retain(|_, expires_at| *expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

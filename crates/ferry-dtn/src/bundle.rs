//! DTN bundle - the unit of data routed hop by hop
//!
//! A bundle carries its payload together with the metadata the router needs:
//! destination, current custodian, lifetime, and the provenance of every
//! copy this node received.

use std::hash::{Hash, Hasher};
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use ferry_core::{PeerIdentity, SimTime};

/// Globally unique identifier for a bundle
///
/// Formed from the source endpoint and the creation timestamp; the sequence
/// number separates bundles created by one source at the same instant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(bound = "I: PeerIdentity")]
pub struct BundleId<I: PeerIdentity> {
    /// Endpoint that created the bundle
    pub source: I,
    /// Creation timestamp
    pub creation_timestamp: SimTime,
    /// Sequence number for bundles created at the same instant
    pub sequence: u32,
}

impl<I: PeerIdentity> BundleId<I> {
    /// Create a new bundle ID
    pub fn new(source: I, creation_timestamp: SimTime, sequence: u32) -> Self {
        Self {
            source,
            creation_timestamp,
            sequence,
        }
    }
}

impl<I: PeerIdentity> std::fmt::Display for BundleId<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}#{}",
            self.source.short_id(),
            self.creation_timestamp.since_start().as_millis(),
            self.sequence
        )
    }
}

/// Retention constraints keeping a bundle in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retention {
    /// The bundle still has to be forwarded
    pub forwarding_pending: bool,
    /// This node accepted custody of the bundle
    pub custody_accepted: bool,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            forwarding_pending: true,
            custody_accepted: false,
        }
    }
}

/// A DTN bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "I: PeerIdentity")]
pub struct Bundle<I: PeerIdentity> {
    /// Bundle identifier
    pub id: BundleId<I>,
    /// Final destination
    pub destination: I,
    /// Current custodian (who's responsible for delivery)
    pub custodian: Option<I>,
    /// Application payload
    pub payload: Bytes,
    /// Lifetime measured from the creation timestamp
    pub lifetime: Duration,
    /// Endpoints this node received a copy from
    pub received_from: Vec<I>,
    /// Retention constraints
    pub retention: Retention,
    /// Whether custody transfer is requested on the next hop
    pub custody_requested: bool,
}

impl<I: PeerIdentity> Bundle<I> {
    /// Create a bundle with the default retention (forwarding pending)
    pub fn new(
        id: BundleId<I>,
        destination: I,
        payload: impl Into<Bytes>,
        lifetime: Duration,
    ) -> Self {
        Self {
            id,
            destination,
            custodian: None,
            payload: payload.into(),
            lifetime,
            received_from: Vec::new(),
            retention: Retention::default(),
            custody_requested: false,
        }
    }

    /// Get the source of this bundle
    pub fn source(&self) -> &I {
        &self.id.source
    }

    /// Size in bytes, as accounted by the store
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Instant after which the bundle is expired
    pub fn expires_at(&self) -> SimTime {
        self.id.creation_timestamp + self.lifetime
    }

    /// Check if the bundle's lifetime has elapsed
    pub fn is_expired(&self, now: SimTime) -> bool {
        now >= self.expires_at()
    }

    /// Record that a copy arrived from `eid`
    pub fn add_received_from(&mut self, eid: I) {
        if !self.received_from.contains(&eid) {
            self.received_from.push(eid);
        }
    }

    /// Whether a copy was already received from `eid`
    pub fn was_received_from(&self, eid: &I) -> bool {
        self.received_from.contains(eid)
    }

    /// Merge the provenance of a duplicate copy into this one
    pub fn merge_received_from(&mut self, other: &Bundle<I>) {
        for eid in &other.received_from {
            self.add_received_from(eid.clone());
        }
    }
}

impl<I: PeerIdentity> PartialEq for Bundle<I> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<I: PeerIdentity> Eq for Bundle<I> {}

impl<I: PeerIdentity> Hash for Bundle<I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

//! Predictability beacons
//!
//! Nodes periodically announce their delivery predictabilities. Receiving a
//! beacon counts as an encounter with its sender (direct update) and feeds
//! the sender's reported values into the table (transitive update).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use ferry_core::{PeerIdentity, SimTime};

use crate::error::HelloError;
use crate::predictability::PredictabilityTable;

/// A predictability beacon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: PeerIdentity")]
pub struct HelloMessage<I: PeerIdentity> {
    /// Who sent the beacon
    pub sender: I,
    /// (destination, probability) pairs
    pub predictabilities: Vec<(I, f64)>,
}

impl<I: PeerIdentity> HelloMessage<I> {
    /// Encode for the announce channel
    pub fn to_bytes(&self) -> Result<Vec<u8>, HelloError> {
        postcard::to_allocvec(self).map_err(|e| HelloError::Encode(e.to_string()))
    }

    /// Decode a beacon received from the announce channel
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HelloError> {
        postcard::from_bytes(bytes).map_err(|e| HelloError::Decode(e.to_string()))
    }

    /// Reported probability for a destination
    pub fn probability_for(&self, destination: &I) -> Option<f64> {
        self.predictabilities
            .iter()
            .find(|(d, _)| d == destination)
            .map(|(_, p)| *p)
    }
}

/// Composes local beacons and applies received ones
#[derive(Debug, Clone)]
pub struct HelloProcessor<I: PeerIdentity> {
    local_id: I,
    /// Sender -> when its last beacon arrived
    last_seen: HashMap<I, SimTime>,
    received: u64,
}

impl<I: PeerIdentity> HelloProcessor<I> {
    pub fn new(local_id: I) -> Self {
        Self {
            local_id,
            last_seen: HashMap::new(),
            received: 0,
        }
    }

    /// Build the beacon addressed to `receiver`
    ///
    /// Each destination is announced once with the highest predictability
    /// across all neighbor rows. Entries for ourselves and for the receiver
    /// are left out.
    pub fn compose(&self, table: &PredictabilityTable<I>, receiver: &I) -> HelloMessage<I> {
        let mut best: HashMap<&I, f64> = HashMap::new();
        for (_, destination, p) in table.iter() {
            if destination == &self.local_id || destination == receiver || p <= 0.0 {
                continue;
            }
            let slot = best.entry(destination).or_insert(p);
            if p > *slot {
                *slot = p;
            }
        }

        HelloMessage {
            sender: self.local_id.clone(),
            predictabilities: best.into_iter().map(|(d, p)| (d.clone(), p)).collect(),
        }
    }

    /// Apply a received beacon to the table
    ///
    /// Returns false for our own beacon echoed back.
    pub fn process(
        &mut self,
        table: &mut PredictabilityTable<I>,
        hello: &HelloMessage<I>,
        now: SimTime,
    ) -> bool {
        if hello.sender == self.local_id {
            trace!("ignoring own beacon");
            return false;
        }

        let p = table.update_direct(&hello.sender, now);
        table.update_transitive(&hello.sender, &hello.predictabilities, now);

        self.last_seen.insert(hello.sender.clone(), now);
        self.received += 1;

        debug!(
            sender = %hello.sender,
            direct = p,
            reported = hello.predictabilities.len(),
            "processed hello"
        );
        true
    }

    /// When a beacon from `sender` last arrived
    pub fn last_seen(&self, sender: &I) -> Option<SimTime> {
        self.last_seen.get(sender).copied()
    }

    /// Number of beacons applied so far
    pub fn received_count(&self) -> u64 {
        self.received
    }
}

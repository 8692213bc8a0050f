//! PRoPHET delivery predictability table
//!
//! PRoPHET uses encounter history to estimate how likely each neighbor is to
//! eventually deliver a bundle to a destination.
//!
//! Key concepts:
//! - **Direct update**: hearing from a neighbor raises our predictability for it
//! - **Transitivity**: a neighbor's reported predictabilities raise ours for
//!   the destinations it can reach
//! - **Aging**: predictabilities decay with elapsed time between encounters
//!
//! The table is two-level: neighbor -> (destination -> probability). The row
//! for neighbor `n` holds `P(n, n)` (our predictability for `n` itself) and
//! `P(n, d)` for every third party `d` learned through `n`. Every stored value
//! stays in `[0, 1]`: each update is a convex combination of the old value and 1.

use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

use ferry_core::{PeerIdentity, SimTime};

/// Initial predictability (P_init)
pub const P_INIT: f64 = 0.5;

/// Aging constant (gamma), applied once per elapsed aging interval
pub const GAMMA: f64 = 0.98;

/// Transitivity scaling factor (beta)
pub const BETA: f64 = 0.25;

/// Period of the aging timer armed for every live link
pub const AGING_INTERVAL: Duration = Duration::from_secs(10);

/// Predictabilities learned through one neighbor
#[derive(Debug, Clone)]
struct NeighborEntry<I: PeerIdentity> {
    /// Destination -> probability
    probabilities: HashMap<I, f64>,
    /// Last time the row was written or aged
    last_decay: SimTime,
}

impl<I: PeerIdentity> NeighborEntry<I> {
    fn new(now: SimTime) -> Self {
        Self {
            probabilities: HashMap::new(),
            last_decay: now,
        }
    }
}

/// Delivery predictability table owned by one router instance
#[derive(Debug, Clone)]
pub struct PredictabilityTable<I: PeerIdentity> {
    /// Our node's identity
    local_id: I,
    /// Neighbor -> learned predictabilities
    entries: HashMap<I, NeighborEntry<I>>,
}

impl<I: PeerIdentity> PredictabilityTable<I> {
    /// Create an empty table for a node
    pub fn new(local_id: I) -> Self {
        Self {
            local_id,
            entries: HashMap::new(),
        }
    }

    /// Get the local node's identity
    pub fn local_id(&self) -> &I {
        &self.local_id
    }

    /// Predictability of delivering to `destination` through `neighbor`
    ///
    /// Returns 0.0 if either is unknown.
    pub fn probability(&self, neighbor: &I, destination: &I) -> f64 {
        self.entries
            .get(neighbor)
            .and_then(|e| e.probabilities.get(destination))
            .copied()
            .unwrap_or(0.0)
    }

    /// Our direct predictability for `neighbor`
    pub fn direct_probability(&self, neighbor: &I) -> f64 {
        self.probability(neighbor, neighbor)
    }

    /// Record that we just heard directly from `neighbor`
    ///
    /// `P_new = P_old + (1 - P_old) * P_init`, where an unknown neighbor
    /// starts from `P_old = P_init`. Returns the new value.
    pub fn update_direct(&mut self, neighbor: &I, now: SimTime) -> f64 {
        if neighbor == &self.local_id {
            return 0.0;
        }

        let entry = self
            .entries
            .entry(neighbor.clone())
            .or_insert_with(|| NeighborEntry::new(now));
        let p_old = entry.probabilities.get(neighbor).copied().unwrap_or(P_INIT);
        let p_new = p_old + (1.0 - p_old) * P_INIT;
        entry.probabilities.insert(neighbor.clone(), p_new);
        entry.last_decay = now;

        trace!(neighbor = %neighbor, p_old, p_new, "direct predictability update");
        p_new
    }

    /// Apply a neighbor's reported predictabilities transitively
    ///
    /// For each reported `(d, P(n, d))` with `d` not ourselves:
    ///   `P(n, d) = P_old + (1 - P_old) * P(a, n) * P(n, d) * beta`
    ///
    /// Reported values outside `[0, 1]` are clamped.
    pub fn update_transitive(&mut self, neighbor: &I, reported: &[(I, f64)], now: SimTime) {
        let p_for_neighbor = self.direct_probability(neighbor);
        let entry = self
            .entries
            .entry(neighbor.clone())
            .or_insert_with(|| NeighborEntry::new(now));

        for (third_party, p_reported) in reported {
            if third_party == &self.local_id {
                continue;
            }
            let p_reported = if p_reported.is_finite() {
                p_reported.clamp(0.0, 1.0)
            } else {
                0.0
            };

            let p_old = entry.probabilities.get(third_party).copied().unwrap_or(0.0);
            let p_new = p_old + (1.0 - p_old) * p_for_neighbor * p_reported * BETA;
            entry.probabilities.insert(third_party.clone(), p_new);
            entry.last_decay = now;

            trace!(
                neighbor = %neighbor,
                destination = %third_party,
                p_old,
                p_new,
                "transitive predictability update"
            );
        }
    }

    /// Decay every stored probability by `gamma^k`
    ///
    /// `k` is the time elapsed since the row's last decay, expressed in
    /// (fractional) aging intervals, so a timer firing late or early still
    /// decays by the right amount.
    pub fn age(&mut self, now: SimTime) {
        let interval = AGING_INTERVAL.as_secs_f64();
        for entry in self.entries.values_mut() {
            let k = now.saturating_since(entry.last_decay).as_secs_f64() / interval;
            let factor = GAMMA.powf(k);
            for p in entry.probabilities.values_mut() {
                *p *= factor;
            }
            entry.last_decay = now;
        }
    }

    /// Pick the neighbor with the strictly highest non-zero predictability
    /// for `destination`
    ///
    /// Ties keep the first neighbor encountered. Returns `None` if every
    /// candidate has probability 0.
    pub fn best_candidate<'a>(
        &self,
        neighbors: impl IntoIterator<Item = &'a I>,
        destination: &I,
    ) -> Option<I> {
        let mut best: Option<&I> = None;
        let mut max = 0.0;

        for neighbor in neighbors {
            let p = self.probability(neighbor, destination);
            if p > max {
                max = p;
                best = Some(neighbor);
            }
        }

        best.cloned()
    }

    /// Iterate over every `(neighbor, destination, probability)` triple
    pub fn iter(&self) -> impl Iterator<Item = (&I, &I, f64)> {
        self.entries.iter().flat_map(|(neighbor, entry)| {
            entry
                .probabilities
                .iter()
                .map(move |(dest, p)| (neighbor, dest, *p))
        })
    }

    /// Get the number of neighbors with a row in the table
    pub fn known_neighbors(&self) -> usize {
        self.entries.len()
    }

    /// Clear all predictability data
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

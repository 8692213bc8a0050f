//! Contact plans
//!
//! A [`ContactPlan`] lists the windows during which two nodes can talk. The
//! world turns every window into a link-up event at `start` and a
//! link-down event at `end`.

use std::collections::BTreeSet;
use std::time::Duration;

use ferry_core::{SimTime, SimulationIdentity};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// One scheduled contact between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactWindow {
    pub start: SimTime,
    pub end: SimTime,
    pub a: SimulationIdentity,
    pub b: SimulationIdentity,
}

impl ContactWindow {
    fn pair(&self) -> (SimulationIdentity, SimulationIdentity) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }

    /// Whether two windows of the same pair touch or overlap
    fn collides_with(&self, other: &ContactWindow) -> bool {
        self.pair() == other.pair() && self.start <= other.end && other.start <= self.end
    }
}

/// Validated set of contact windows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPlan {
    windows: Vec<ContactWindow>,
}

impl ContactPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a window, rejecting empty, self and colliding contacts
    pub fn add(
        &mut self,
        start: SimTime,
        end: SimTime,
        a: SimulationIdentity,
        b: SimulationIdentity,
    ) -> Result<(), SimError> {
        if a == b {
            return Err(SimError::SelfContact(a));
        }
        if end <= start {
            return Err(SimError::EmptyWindow { a, b, start, end });
        }
        let window = ContactWindow { start, end, a, b };
        if self.windows.iter().any(|w| w.collides_with(&window)) {
            return Err(SimError::OverlappingWindows { a, b });
        }
        self.windows.push(window);
        Ok(())
    }

    /// Builder form of [`add`](Self::add) taking whole seconds
    pub fn with_window(mut self, start: u64, end: u64, a: char, b: char) -> Result<Self, SimError> {
        self.add(
            SimTime::from_secs(start),
            SimTime::from_secs(end),
            SimulationIdentity(a),
            SimulationIdentity(b),
        )?;
        Ok(self)
    }

    pub fn windows(&self) -> &[ContactWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Every node named by some window
    pub fn nodes(&self) -> BTreeSet<SimulationIdentity> {
        self.windows.iter().flat_map(|w| [w.a, w.b]).collect()
    }

    /// Random contacts between ring neighbors up to `horizon`
    ///
    /// Each neighbor pair meets repeatedly for 5..=20 s with 10..60 s gaps.
    pub fn random_ring<R: Rng>(
        nodes: &[SimulationIdentity],
        horizon: SimTime,
        rng: &mut R,
    ) -> Result<Self, SimError> {
        let mut plan = Self::new();
        if nodes.len() < 2 {
            return Ok(plan);
        }

        // Two nodes form a single pair, not a ring of two
        let pairs = if nodes.len() == 2 { 1 } else { nodes.len() };
        for i in 0..pairs {
            let (a, b) = (nodes[i], nodes[(i + 1) % nodes.len()]);
            let mut t = SimTime::from_secs(rng.random_range(0..20));
            while t < horizon {
                let end = t + Duration::from_secs(rng.random_range(5..=20));
                plan.add(t, end, a, b)?;
                t = end + Duration::from_secs(rng.random_range(10..60));
            }
        }
        Ok(plan)
    }
}

//! A simulated DTN node

use std::time::Duration;

use ferry_core::{SimTime, SimulationIdentity};
use ferry_dtn::{Bundle, BundleId, ProphetConfig, ProphetRouter};
use ferry_logging::NodeContextGuard;
use uuid::Uuid;

use crate::sim_link::SimLink;

/// Router type driven by the world
pub type SimRouter = ProphetRouter<SimulationIdentity, SimLink<SimulationIdentity>>;

/// A router plus the bookkeeping the world needs to drive it
pub struct Node {
    id: SimulationIdentity,
    instance_id: Uuid,
    router: SimRouter,
    next_sequence: u32,
    /// Deadline of the timer event currently queued for this node
    pub(crate) armed: Option<SimTime>,
}

impl Node {
    pub fn new(id: SimulationIdentity, config: ProphetConfig) -> Self {
        Self {
            id,
            instance_id: Uuid::new_v4(),
            router: ProphetRouter::new(id, config, SimLink::new()),
            next_sequence: 0,
            armed: None,
        }
    }

    pub fn id(&self) -> SimulationIdentity {
        self.id
    }

    pub fn router(&self) -> &SimRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut SimRouter {
        &mut self.router
    }

    /// Build a new application bundle originating here
    pub fn create_bundle(
        &mut self,
        destination: SimulationIdentity,
        payload: Vec<u8>,
        lifetime: Duration,
        now: SimTime,
    ) -> Bundle<SimulationIdentity> {
        let id = BundleId::new(self.id, now, self.next_sequence);
        self.next_sequence += 1;
        Bundle::new(id, destination, payload, lifetime)
    }

    /// Scope log output to this node
    pub fn log_context(&self) -> NodeContextGuard {
        NodeContextGuard::with_instance_id(&self.id, self.instance_id)
    }
}

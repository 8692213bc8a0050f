//! Discrete-event world
//!
//! The [`World`] owns every node and a single event queue ordered by time,
//! then by insertion. Contacts, beacons, bundle creation, transmission
//! completions and router timers all flow through that queue, so a run is
//! fully reproducible.
//!
//! After every interaction with a node the world drains the node's link
//! commands and router events and re-arms its timer.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::time::Duration;

use ferry_core::{SimTime, SimulationIdentity};
use ferry_dtn::{Bundle, BundleId, ConvergenceLayer, LinkAddress, ProphetConfig, ReceiveOutcome, RouterEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, info, trace, warn};

use crate::contact::ContactPlan;
use crate::error::SimError;
use crate::node::{Node, SimRouter};
use crate::sim_link::LinkCommand;
use crate::stats::SimStats;

type NodeId = SimulationIdentity;

/// World parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Configuration shared by every router
    pub router: ProphetConfig,
    /// Interval between beacons of an announcing node
    pub beacon_period: Duration,
    /// Transmission time per payload byte
    pub per_byte_delay: Duration,
    /// Events after this instant are not processed by [`World::run`]
    pub horizon: SimTime,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            router: ProphetConfig::default(),
            beacon_period: Duration::from_secs(1),
            per_byte_delay: Duration::from_millis(1),
            horizon: SimTime::from_secs(3600),
        }
    }
}

#[derive(Debug)]
enum WorldEvent {
    ContactUp {
        a: NodeId,
        b: NodeId,
    },
    ContactDown {
        a: NodeId,
        b: NodeId,
    },
    Beacon {
        node: NodeId,
    },
    Originate {
        from: NodeId,
        to: NodeId,
        size: usize,
        lifetime: Duration,
    },
    TransmissionDone {
        node: NodeId,
        link: LinkAddress,
        bundle: BundleId<NodeId>,
    },
    Timer {
        node: NodeId,
    },
}

#[derive(Debug)]
struct Scheduled {
    at: SimTime,
    seq: u64,
    event: WorldEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.at, self.seq) == (other.at, other.seq)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

/// An open contact: each end's node and its link address
#[derive(Debug, Clone, Copy)]
struct ActiveContact {
    ends: [(NodeId, LinkAddress); 2],
}

impl ActiveContact {
    fn has(&self, node: NodeId, link: LinkAddress) -> bool {
        self.ends.contains(&(node, link))
    }

    fn peer_of(&self, node: NodeId) -> (NodeId, LinkAddress) {
        if self.ends[0].0 == node {
            self.ends[1]
        } else {
            self.ends[0]
        }
    }
}

#[derive(Debug)]
struct Transmission {
    bundle: Bundle<NodeId>,
    completes_at: SimTime,
}

fn pair(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Simulated network of PRoPHET routers
pub struct World {
    config: WorldConfig,
    now: SimTime,
    nodes: BTreeMap<NodeId, Node>,
    queue: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
    contacts: BTreeMap<(NodeId, NodeId), ActiveContact>,
    transmissions: HashMap<(NodeId, LinkAddress), Transmission>,
    stats: SimStats,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            now: SimTime::ZERO,
            nodes: BTreeMap::new(),
            queue: BinaryHeap::new(),
            next_seq: 0,
            contacts: BTreeMap::new(),
            transmissions: HashMap::new(),
            stats: SimStats::default(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of contacts currently open
    pub fn open_contacts(&self) -> usize {
        self.contacts.len()
    }

    /// Add a node; it starts beaconing immediately
    pub fn add_node(&mut self, id: NodeId) -> Result<(), SimError> {
        if self.nodes.contains_key(&id) {
            return Err(SimError::DuplicateNode(id));
        }
        self.nodes.insert(id, Node::new(id, self.config.router.clone()));
        self.schedule(self.now, WorldEvent::Beacon { node: id });
        Ok(())
    }

    pub fn add_nodes(&mut self, ids: impl IntoIterator<Item = NodeId>) -> Result<(), SimError> {
        for id in ids {
            self.add_node(id)?;
        }
        Ok(())
    }

    /// Schedule every window of a plan
    ///
    /// Nothing is scheduled if the plan names an unknown node.
    pub fn load_plan(&mut self, plan: &ContactPlan) -> Result<(), SimError> {
        if let Some(unknown) = plan.nodes().into_iter().find(|n| !self.nodes.contains_key(n)) {
            return Err(SimError::UnknownNode(unknown));
        }
        for window in plan.windows() {
            let (a, b) = (window.a, window.b);
            self.schedule(window.start, WorldEvent::ContactUp { a, b });
            self.schedule(window.end, WorldEvent::ContactDown { a, b });
        }
        Ok(())
    }

    /// Have `from` create a bundle for `to` at `at`
    pub fn schedule_bundle(
        &mut self,
        at: SimTime,
        from: NodeId,
        to: NodeId,
        size: usize,
        lifetime: Duration,
    ) -> Result<(), SimError> {
        for id in [from, to] {
            if !self.nodes.contains_key(&id) {
                return Err(SimError::UnknownNode(id));
            }
        }
        self.schedule(
            at,
            WorldEvent::Originate {
                from,
                to,
                size,
                lifetime,
            },
        );
        Ok(())
    }

    /// Run up to the configured horizon
    pub fn run(&mut self) -> &SimStats {
        self.run_until(self.config.horizon);
        &self.stats
    }

    /// Process every event due at or before `until`
    pub fn run_until(&mut self, until: SimTime) {
        while self
            .queue
            .peek()
            .is_some_and(|Reverse(next)| next.at <= until)
        {
            self.step();
        }
        self.now = self.now.max(until);
    }

    /// Process the next event; false once the queue is empty
    pub fn step(&mut self) -> bool {
        let Some(Reverse(next)) = self.queue.pop() else {
            return false;
        };
        self.now = self.now.max(next.at);
        trace!(at = %self.now, event = ?next.event, "event");

        match next.event {
            WorldEvent::ContactUp { a, b } => self.contact_up(a, b),
            WorldEvent::ContactDown { a, b } => self.contact_down(a, b),
            WorldEvent::Beacon { node } => self.beacon(node),
            WorldEvent::Originate {
                from,
                to,
                size,
                lifetime,
            } => self.originate(from, to, size, lifetime),
            WorldEvent::TransmissionDone { node, link, bundle } => {
                self.transmission_done(node, link, bundle)
            }
            WorldEvent::Timer { node } => self.fire_timer(node),
        }
        true
    }

    fn schedule(&mut self, at: SimTime, event: WorldEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Scheduled { at, seq, event }));
    }

    /// Call into a node's router inside its log context
    fn with_router<T>(&mut self, id: NodeId, f: impl FnOnce(&mut SimRouter) -> T) -> Option<T> {
        let node = self.nodes.get_mut(&id)?;
        let _ctx = node.log_context();
        let _span = debug_span!("node", node = %id).entered();
        Some(f(node.router_mut()))
    }

    // ---- event handlers ----

    fn contact_up(&mut self, a: NodeId, b: NodeId) {
        let key = pair(a, b);
        if self.contacts.contains_key(&key) {
            debug!(%a, %b, "already in contact");
            return;
        }
        let Some(link_a) = self.with_router(a, |r| r.transport_mut().add_link(b)) else {
            return;
        };
        let Some(link_b) = self.with_router(b, |r| r.transport_mut().add_link(a)) else {
            return;
        };
        self.contacts.insert(
            key,
            ActiveContact {
                ends: [(a, link_a), (b, link_b)],
            },
        );
        info!(at = %self.now, %a, %b, "contact up");

        let now = self.now;
        for (node, link) in [(a, link_a), (b, link_b)] {
            self.with_router(node, |r| r.on_link_discovered(link, now));
            self.sync(node);
        }
    }

    fn contact_down(&mut self, a: NodeId, b: NodeId) {
        let Some(contact) = self.contacts.remove(&pair(a, b)) else {
            trace!(%a, %b, "contact already closed");
            return;
        };
        info!(at = %self.now, %a, %b, "contact down");
        for (node, link) in contact.ends {
            self.close_side(node, link);
        }
    }

    /// Close one end of a contact, failing its transmission if one is running
    fn close_side(&mut self, node: NodeId, link: LinkAddress) {
        let now = self.now;
        let interrupted = self.transmissions.remove(&(node, link));
        self.with_router(node, |r| {
            if let Some(tx) = interrupted {
                debug!(bundle_id = %tx.bundle.id, link = %link, "transmission interrupted");
                r.on_bundle_send_failed(link, tx.bundle.id, now);
            }
            r.transport_mut().drop_link(link);
            r.on_link_closed(link, now);
        });
        self.sync(node);
    }

    fn beacon(&mut self, node: NodeId) {
        let now = self.now;
        let next = now + self.config.beacon_period;
        if !self.config.beacon_period.is_zero() && next <= self.config.horizon {
            self.schedule(next, WorldEvent::Beacon { node });
        }

        let Some(sender) = self.nodes.get(&node) else {
            return;
        };
        let router = sender.router();
        if !router.transport().is_announcing() {
            return;
        }
        let beacons: Vec<(NodeId, Vec<u8>)> = router
            .transport()
            .links()
            .connected()
            .filter_map(|link| match router.compose_hello(&link.remote_eid).to_bytes() {
                Ok(bytes) => Some((link.remote_eid, bytes)),
                Err(err) => {
                    warn!(%node, %err, "cannot encode beacon");
                    None
                }
            })
            .collect();

        for (receiver, bytes) in beacons {
            self.stats.beacons += 1;
            if let Some(Err(err)) = self.with_router(receiver, |r| r.on_hello_bytes(&bytes, now)) {
                warn!(%receiver, %err, "dropping undecodable beacon");
            }
            self.sync(receiver);
        }
    }

    fn originate(&mut self, from: NodeId, to: NodeId, size: usize, lifetime: Duration) {
        let now = self.now;
        let Some(node) = self.nodes.get_mut(&from) else {
            return;
        };
        let bundle = node.create_bundle(to, vec![0u8; size], lifetime, now);
        let id = bundle.id.clone();

        match self.with_router(from, |r| r.originate(bundle, now)) {
            Some(Ok(outcome)) => {
                self.stats.created += 1;
                debug!(bundle_id = %id, destination = %to, ?outcome, "bundle created");
            }
            Some(Err(err)) => warn!(bundle_id = %id, %err, "bundle rejected at source"),
            None => {}
        }
        self.sync(from);
    }

    fn transmission_done(&mut self, node: NodeId, link: LinkAddress, bundle_id: BundleId<NodeId>) {
        let now = self.now;
        let current = self
            .transmissions
            .get(&(node, link))
            .is_some_and(|tx| tx.bundle.id == bundle_id && tx.completes_at == now);
        if !current {
            trace!(bundle_id = %bundle_id, "stale transmission");
            return;
        }
        let Some(tx) = self.transmissions.remove(&(node, link)) else {
            return;
        };
        let Some((peer, peer_link)) = self
            .contacts
            .values()
            .find(|c| c.has(node, link))
            .map(|c| c.peer_of(node))
        else {
            return;
        };

        let outcome = self.with_router(peer, |r| r.on_bundle_received(tx.bundle, peer_link, now));
        self.sync(peer);

        let final_delivery = matches!(outcome, Some(Ok(ReceiveOutcome::DeliveredLocally)));
        self.with_router(node, |r| {
            r.on_bundle_sent(link, bundle_id.clone(), final_delivery, now);
            match outcome {
                Some(Ok(ReceiveOutcome::Stored)) => r.on_custody_acknowledged(&bundle_id, now),
                Some(Ok(ReceiveOutcome::AlreadyDelivered)) => {
                    r.on_delivery_acknowledged(bundle_id, now)
                }
                Some(Err(err)) => debug!(%err, "next hop rejected bundle"),
                _ => {}
            }
        });
        self.sync(node);
    }

    fn fire_timer(&mut self, node: NodeId) {
        let now = self.now;
        match self.nodes.get_mut(&node) {
            Some(n) if n.armed == Some(now) => n.armed = None,
            _ => return,
        }
        self.with_router(node, |r| r.handle_timeout(now));
        self.sync(node);
    }

    // ---- node plumbing ----

    /// Apply everything a node asked for since the last sync
    fn sync(&mut self, node: NodeId) {
        loop {
            let Some((commands, events)) = self.with_router(node, |r| {
                (r.transport_mut().take_commands(), r.drain_events())
            }) else {
                return;
            };
            if commands.is_empty() && events.is_empty() {
                break;
            }
            for event in events {
                self.record(node, event);
            }
            for command in commands {
                self.execute(node, command);
            }
        }
        self.arm_timer(node);
    }

    fn execute(&mut self, node: NodeId, command: LinkCommand<NodeId>) {
        let now = self.now;
        match command {
            LinkCommand::Send { address, bundle } => {
                let bytes = u32::try_from(bundle.size()).unwrap_or(u32::MAX);
                let completes_at = now + self.config.per_byte_delay.saturating_mul(bytes);
                trace!(bundle_id = %bundle.id, link = %address, until = %completes_at, "transmitting");
                self.schedule(
                    completes_at,
                    WorldEvent::TransmissionDone {
                        node,
                        link: address,
                        bundle: bundle.id.clone(),
                    },
                );
                self.transmissions.insert(
                    (node, address),
                    Transmission {
                        bundle,
                        completes_at,
                    },
                );
            }
            LinkCommand::Cancel { address, id } => {
                if self
                    .transmissions
                    .get(&(node, address))
                    .is_some_and(|tx| tx.bundle.id == id)
                {
                    self.transmissions.remove(&(node, address));
                }
                self.with_router(node, |r| r.on_transmission_cancelled(address, id, now));
            }
            LinkCommand::Close { address } => {
                self.transmissions.remove(&(node, address));
                let key = self
                    .contacts
                    .iter()
                    .find(|(_, c)| c.has(node, address))
                    .map(|(key, _)| *key);
                if let Some(contact) = key.and_then(|key| self.contacts.remove(&key)) {
                    let (peer, peer_link) = contact.peer_of(node);
                    info!(%node, %peer, "link given up, closing contact");
                    self.close_side(peer, peer_link);
                }
            }
        }
    }

    fn record(&mut self, node: NodeId, event: RouterEvent<NodeId>) {
        let stats = &mut self.stats;
        match event {
            RouterEvent::DeliveredLocally { bundle } => {
                let latency = self.now.saturating_since(bundle.id.creation_timestamp);
                stats.delivered += 1;
                stats.total_latency += latency;
                info!(%node, bundle_id = %bundle.id, latency = ?latency, "bundle delivered");
            }
            RouterEvent::BundleSent {
                final_delivery: false,
                ..
            } => stats.relayed += 1,
            RouterEvent::Expired { .. } => stats.expired += 1,
            RouterEvent::Evicted { .. } => stats.evicted += 1,
            RouterEvent::RedundantRelay { .. } => stats.redundant += 1,
            RouterEvent::BufferOverflow { .. } => stats.buffer_overflows += 1,
            RouterEvent::LinkPaused { .. } => stats.links_paused += 1,
            RouterEvent::LinkClosed { .. } => stats.links_closed += 1,
            RouterEvent::BundleSent { .. } | RouterEvent::BundleDelivered { .. } => {}
        }
    }

    /// Queue a timer event for the node's next router deadline
    fn arm_timer(&mut self, node: NodeId) {
        let now = self.now;
        let Some(n) = self.nodes.get_mut(&node) else {
            return;
        };
        let Some(deadline) = n.router().poll_timeout() else {
            return;
        };
        let deadline = deadline.max(now);
        if n.armed.is_some_and(|armed| armed <= deadline) {
            return;
        }
        n.armed = Some(deadline);
        self.schedule(deadline, WorldEvent::Timer { node });
    }
}

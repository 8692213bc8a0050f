//! PRoPHET forwarding engine
//!
//! [`ProphetRouter`] owns every piece of per-node routing state and reacts
//! to events from its convergence layer. It never blocks and never recurses
//! into itself: every follow-up (a new send cycle, aging, unpausing a link,
//! the end of a custody window) is a timer, drained by the driver through
//! [`ProphetRouter::poll_timeout`] and [`ProphetRouter::handle_timeout`].
//!
//! At most one transmission is in flight per node. A send cycle picks the
//! first eligible bundle, then a link for it: the link to the destination if
//! one is connected, otherwise the neighbor with the highest delivery
//! predictability for the destination.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use tracing::{debug, info, instrument, trace, warn};

use ferry_core::{PeerIdentity, SimTime};

use crate::ProphetConfig;
use crate::bundle::{Bundle, BundleId};
use crate::custody::CustodyTracker;
use crate::delivered::{DeliveryNotice, KnownDelivered};
use crate::error::{HelloError, StoreError};
use crate::event::{DeleteReason, ReceiveOutcome, RouterEvent};
use crate::forward_log::ForwardLog;
use crate::hello::{HelloMessage, HelloProcessor};
use crate::link::{Link, LinkAddress, LinkState};
use crate::predictability::{AGING_INTERVAL, PredictabilityTable};
use crate::store::BundleStore;
use crate::timer::{Timer, TimerQueue};
use crate::transport::ConvergenceLayer;

/// Delay before a send cycle that found nothing to send runs again
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// PRoPHET router for one node
pub struct ProphetRouter<I: PeerIdentity, C: ConvergenceLayer<I>> {
    local_id: I,
    config: ProphetConfig,
    transport: C,
    table: PredictabilityTable<I>,
    store: BundleStore<I>,
    forward_log: ForwardLog<I>,
    custody: CustodyTracker<I>,
    delivered: KnownDelivered<I>,
    hello: HelloProcessor<I>,
    timers: TimerQueue<I>,
    /// Links opened by this router and not yet torn down
    active_links: HashSet<LinkAddress>,
    /// The single outstanding transmission
    in_flight: Option<(LinkAddress, BundleId<I>)>,
    events: VecDeque<RouterEvent<I>>,
}

impl<I: PeerIdentity, C: ConvergenceLayer<I>> ProphetRouter<I, C> {
    /// Create a router on top of a convergence layer
    pub fn new(local_id: I, config: ProphetConfig, mut transport: C) -> Self {
        if config.always_announce {
            transport.set_announcing(true);
        }

        Self {
            table: PredictabilityTable::new(local_id.clone()),
            store: BundleStore::new(config.max_bytes),
            forward_log: ForwardLog::new(config.forward_log_expiry),
            custody: CustodyTracker::new(),
            delivered: KnownDelivered::new(),
            hello: HelloProcessor::new(local_id.clone()),
            timers: TimerQueue::new(),
            active_links: HashSet::new(),
            in_flight: None,
            events: VecDeque::new(),
            local_id,
            config,
            transport,
        }
    }

    pub fn local_id(&self) -> &I {
        &self.local_id
    }

    pub fn config(&self) -> &ProphetConfig {
        &self.config
    }

    pub fn table(&self) -> &PredictabilityTable<I> {
        &self.table
    }

    pub fn store(&self) -> &BundleStore<I> {
        &self.store
    }

    pub fn forward_log(&self) -> &ForwardLog<I> {
        &self.forward_log
    }

    pub fn custody(&self) -> &CustodyTracker<I> {
        &self.custody
    }

    pub fn known_delivered(&self) -> &KnownDelivered<I> {
        &self.delivered
    }

    pub fn hello_processor(&self) -> &HelloProcessor<I> {
        &self.hello
    }

    pub fn transport(&self) -> &C {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut C {
        &mut self.transport
    }

    /// Whether a transmission is outstanding
    pub fn is_sending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The outstanding transmission, if any
    pub fn in_flight(&self) -> Option<(LinkAddress, &BundleId<I>)> {
        self.in_flight.as_ref().map(|(addr, id)| (*addr, id))
    }

    /// Next observable event
    pub fn poll_event(&mut self) -> Option<RouterEvent<I>> {
        self.events.pop_front()
    }

    pub fn drain_events(&mut self) -> Vec<RouterEvent<I>> {
        self.events.drain(..).collect()
    }

    /// When [`handle_timeout`](Self::handle_timeout) should next be called
    pub fn poll_timeout(&self) -> Option<SimTime> {
        self.timers.next_deadline()
    }

    /// Fire every timer due at `now`, in deadline order
    ///
    /// Timers scheduled for `now` by the handlers themselves fire in the same
    /// call.
    pub fn handle_timeout(&mut self, now: SimTime) {
        while let Some((_, timer)) = self.timers.pop_due(now) {
            match timer {
                Timer::TryToSend => self.try_to_send(now),
                Timer::Aging { link } => self.age_for(link, now),
                Timer::Unpause { link } => self.unpause_link(link, now),
                Timer::CustodyExpiry { bundle } => {
                    if self.custody.clear_if_expired(&bundle, now) {
                        trace!(bundle_id = %bundle, "custody window elapsed");
                        self.trigger(now);
                    }
                }
            }
        }
    }

    // ---- link lifecycle ----

    /// A link registered with the convergence layer became available
    #[instrument(skip(self), fields(node = %self.local_id))]
    pub fn on_link_discovered(&mut self, address: LinkAddress, now: SimTime) {
        let Some(link) = self.transport.links_mut().find_mut(address) else {
            warn!(link = %address, "discovered link is not registered");
            return;
        };
        if link.state() != LinkState::Discovered {
            debug!(link = %address, state = %link.state(), "link already known");
            return;
        }
        link.heard_from(now);
        let remote = link.remote_eid.clone();

        let p = self.table.update_direct(&remote, now);
        self.transport.open_link(address);
        self.active_links.insert(address);
        self.timers.schedule(now, Timer::Aging { link: address });
        self.trigger(now);

        info!(link = %address, neighbor = %remote, predictability = p, "link connected");
    }

    /// The convergence layer lost a link
    #[instrument(skip(self), fields(node = %self.local_id))]
    pub fn on_link_closed(&mut self, address: LinkAddress, now: SimTime) {
        if !self.active_links.remove(&address) {
            trace!(link = %address, "link already torn down");
            return;
        }
        self.teardown_link(address, now);
    }

    fn teardown_link(&mut self, address: LinkAddress, now: SimTime) {
        self.timers.cancel_link(address);

        let (queued, remote) = match self.transport.links_mut().find_mut(address) {
            Some(link) => {
                link.transition(LinkState::Closed);
                (link.contact.drain(), Some(link.remote_eid.clone()))
            }
            None => (Vec::new(), None),
        };
        for id in &queued {
            self.transport.cancel_transmission(address, id);
        }
        if matches!(&self.in_flight, Some((a, _)) if *a == address) {
            self.in_flight = None;
        }

        if let Some(remote) = remote {
            info!(link = %address, neighbor = %remote, "link closed");
            self.events.push_back(RouterEvent::LinkClosed {
                link: address,
                remote,
            });
        }
        self.trigger(now);
    }

    /// Back off after a failed transmission, or give up on the link
    fn pause_link(&mut self, address: LinkAddress, now: SimTime) {
        let Some(link) = self.transport.links_mut().find_mut(address) else {
            return;
        };
        if !link.is_connected() {
            return;
        }

        let queued = link.contact.drain();
        let retransmissions = link.contact.retransmissions;
        let exhausted = retransmissions >= self.config.max_retries;
        if !exhausted {
            link.contact.retransmissions += 1;
            link.transition(LinkState::Paused);
        }

        for id in &queued {
            self.transport.cancel_transmission(address, id);
        }

        if exhausted {
            warn!(link = %address, retransmissions, "retries exhausted, closing link");
            self.active_links.remove(&address);
            self.teardown_link(address, now);
            self.transport.close_link(address);
            return;
        }

        debug!(link = %address, retransmissions = retransmissions + 1, "link paused");
        self.timers.schedule(
            now + self.config.pause_duration,
            Timer::Unpause { link: address },
        );
        self.events.push_back(RouterEvent::LinkPaused {
            link: address,
            retransmissions: retransmissions + 1,
        });
    }

    fn unpause_link(&mut self, address: LinkAddress, now: SimTime) {
        match self.transport.links_mut().find_mut(address) {
            Some(link) if link.state() == LinkState::Paused => {
                link.transition(LinkState::Connected);
                debug!(link = %address, "link unpaused");
                self.trigger(now);
            }
            _ => trace!(link = %address, "stale unpause"),
        }
    }

    fn age_for(&mut self, address: LinkAddress, now: SimTime) {
        if !self.active_links.contains(&address) {
            return;
        }
        self.table.age(now);
        self.timers
            .schedule(now + AGING_INTERVAL, Timer::Aging { link: address });
    }

    // ---- bundle admission ----

    /// A neighbor handed us a bundle over `from`
    #[instrument(skip(self, bundle), fields(node = %self.local_id, bundle_id = %bundle.id))]
    pub fn on_bundle_received(
        &mut self,
        mut bundle: Bundle<I>,
        from: LinkAddress,
        now: SimTime,
    ) -> Result<ReceiveOutcome, StoreError> {
        let from_eid = self.transport.links_mut().find_mut(from).map(|link| {
            link.heard_from(now);
            link.remote_eid.clone()
        });
        if let Some(eid) = &from_eid {
            bundle.add_received_from(eid.clone());
        }
        self.accept(bundle, from_eid, now)
    }

    /// Accept a bundle created by a local application
    #[instrument(skip(self, bundle), fields(node = %self.local_id, bundle_id = %bundle.id))]
    pub fn originate(
        &mut self,
        bundle: Bundle<I>,
        now: SimTime,
    ) -> Result<ReceiveOutcome, StoreError> {
        self.accept(bundle, None, now)
    }

    fn accept(
        &mut self,
        bundle: Bundle<I>,
        from: Option<I>,
        now: SimTime,
    ) -> Result<ReceiveOutcome, StoreError> {
        if self.delivered.contains(&bundle.id) {
            debug!("bundle already delivered");
            return Ok(ReceiveOutcome::AlreadyDelivered);
        }

        if bundle.destination == self.local_id {
            self.record_delivery(
                &DeliveryNotice::Known {
                    id: bundle.id.clone(),
                    expires_at: bundle.expires_at(),
                },
                now,
            );
            info!("bundle delivered locally");
            self.events
                .push_back(RouterEvent::DeliveredLocally { bundle });
            return Ok(ReceiveOutcome::DeliveredLocally);
        }

        if let Some(resident) = self.store.get_mut(&bundle.id) {
            resident.merge_received_from(&bundle);
            debug!("redundant relay");
            self.events.push_back(RouterEvent::RedundantRelay {
                id: bundle.id,
                from,
            });
            return Ok(ReceiveOutcome::Redundant);
        }

        self.store.check_capacity(&bundle)?;
        let evicted = match self.store.make_room(&bundle) {
            Ok(evicted) => evicted,
            Err(err) => {
                if let StoreError::BufferOverflow { size, free } = err {
                    warn!(size, free, "buffer overflow");
                    self.events.push_back(RouterEvent::BufferOverflow {
                        id: bundle.id.clone(),
                        size,
                        free,
                    });
                }
                return Err(err);
            }
        };
        for old in &evicted {
            self.after_delete(&old.id, DeleteReason::Evicted);
        }

        self.insert(bundle, now);
        Ok(ReceiveOutcome::Stored)
    }

    fn insert(&mut self, mut bundle: Bundle<I>, now: SimTime) {
        bundle.custodian = Some(self.local_id.clone());
        let id = bundle.id.clone();
        let first = self.store.insert(bundle);
        if first && !self.config.always_announce {
            self.transport.set_announcing(true);
        }
        debug!(bundle_id = %id, pending = self.store.len(), "bundle stored");
        self.trigger(now);
    }

    fn delete_bundle(&mut self, id: &BundleId<I>, reason: DeleteReason) {
        if self.store.remove(id).is_some() {
            self.after_delete(id, reason);
        }
    }

    fn after_delete(&mut self, id: &BundleId<I>, reason: DeleteReason) {
        self.forward_log.remove_entries_for(id);
        self.custody.clear(id);

        match reason {
            DeleteReason::Expired => {
                debug!(bundle_id = %id, "bundle expired");
                self.events
                    .push_back(RouterEvent::Expired { id: id.clone() });
            }
            DeleteReason::Evicted => {
                self.events
                    .push_back(RouterEvent::Evicted { id: id.clone() });
            }
            DeleteReason::Delivered => trace!(bundle_id = %id, "dropping delivered copy"),
        }

        if self.store.is_empty() && !self.config.always_announce {
            self.transport.set_announcing(false);
        }
    }

    // ---- transmission outcomes ----

    /// A transmission completed
    #[instrument(skip(self), fields(node = %self.local_id))]
    pub fn on_bundle_sent(
        &mut self,
        address: LinkAddress,
        id: BundleId<I>,
        final_delivery: bool,
        now: SimTime,
    ) {
        self.clear_in_flight(address, &id);
        if let Some(link) = self.transport.links_mut().find_mut(address) {
            link.heard_from(now);
            link.contact.dequeue(&id);
            link.contact.retransmissions = 0;
        }
        self.forward_log.add_entry(&id, address, now);

        debug!(bundle_id = %id, link = %address, final_delivery, "bundle sent");
        self.events.push_back(RouterEvent::BundleSent {
            id: id.clone(),
            link: address,
            final_delivery,
        });

        if final_delivery {
            let notice = self.notice_for(&id);
            self.record_delivery(&notice, now);
            self.events.push_back(RouterEvent::BundleDelivered { id });
        }
        self.trigger(now);
    }

    /// A transmission failed
    #[instrument(skip(self), fields(node = %self.local_id))]
    pub fn on_bundle_send_failed(&mut self, address: LinkAddress, id: BundleId<I>, now: SimTime) {
        self.clear_in_flight(address, &id);
        if let Some(link) = self.transport.links_mut().find_mut(address) {
            link.contact.dequeue(&id);
        }
        // Nothing was handed over, so the link may be offered the bundle again
        self.forward_log.remove_entry(&id, address);
        debug!(bundle_id = %id, link = %address, "send failed");
        self.pause_link(address, now);
        self.trigger(now);
    }

    /// A queued transmission was aborted
    pub fn on_transmission_cancelled(
        &mut self,
        address: LinkAddress,
        id: BundleId<I>,
        now: SimTime,
    ) {
        self.clear_in_flight(address, &id);
        if let Some(link) = self.transport.links_mut().find_mut(address) {
            link.contact.dequeue(&id);
        }
        self.trigger(now);
    }

    fn clear_in_flight(&mut self, address: LinkAddress, id: &BundleId<I>) {
        if matches!(&self.in_flight, Some((a, b)) if *a == address && b == id) {
            self.in_flight = None;
        }
    }

    // ---- acknowledgements ----

    /// The next hop acknowledged custody of a bundle
    pub fn on_custody_acknowledged(&mut self, id: &BundleId<I>, now: SimTime) {
        if self.custody.clear(id) {
            trace!(bundle_id = %id, "custody acknowledged");
            self.trigger(now);
        }
    }

    /// Learned that a bundle reached its destination by some other path
    pub fn on_delivery_acknowledged(&mut self, id: BundleId<I>, now: SimTime) {
        let notice = self.notice_for(&id);
        self.record_delivery(&notice, now);
        self.events.push_back(RouterEvent::BundleDelivered { id });
        self.trigger(now);
    }

    fn notice_for(&self, id: &BundleId<I>) -> DeliveryNotice<I> {
        match self.store.get(id) {
            Some(bundle) => DeliveryNotice::Known {
                id: id.clone(),
                expires_at: bundle.expires_at(),
            },
            None => DeliveryNotice::AckOnly(id.clone()),
        }
    }

    /// Remember a delivery and drop every resident copy known delivered
    fn record_delivery(&mut self, notice: &DeliveryNotice<I>, now: SimTime) {
        self.delivered.record(notice, now);
        let delivered: Vec<BundleId<I>> = self
            .store
            .iter()
            .filter(|b| self.delivered.contains(&b.id))
            .map(|b| b.id.clone())
            .collect();
        for id in &delivered {
            self.delete_bundle(id, DeleteReason::Delivered);
        }
    }

    // ---- beacons ----

    /// Apply a neighbor's beacon
    #[instrument(skip(self, hello), fields(node = %self.local_id, sender = %hello.sender))]
    pub fn on_hello(&mut self, hello: &HelloMessage<I>, now: SimTime) {
        if !self.hello.process(&mut self.table, hello, now) {
            return;
        }
        if let Some(link) = self.transport.links_mut().find_by_eid_mut(&hello.sender) {
            link.heard_from(now);
        }
        self.trigger(now);
    }

    /// Decode and apply a beacon received as bytes
    pub fn on_hello_bytes(&mut self, bytes: &[u8], now: SimTime) -> Result<(), HelloError> {
        let hello = HelloMessage::from_bytes(bytes)?;
        self.on_hello(&hello, now);
        Ok(())
    }

    /// Our beacon for `receiver`
    pub fn compose_hello(&self, receiver: &I) -> HelloMessage<I> {
        self.hello.compose(&self.table, receiver)
    }

    // ---- forwarding ----

    fn trigger(&mut self, now: SimTime) {
        self.timers.schedule_try_to_send(now);
    }

    /// Run one send cycle
    ///
    /// Sends at most one bundle. Calling it with nothing eligible only
    /// schedules a retry.
    #[instrument(skip(self), fields(node = %self.local_id))]
    pub fn try_to_send(&mut self, now: SimTime) {
        self.housekeeping(now);

        if self.in_flight.is_some() || self.store.is_empty() {
            return;
        }

        let candidates = self.candidates();
        let Some((_, first)) = candidates.first() else {
            trace!("no candidates");
            self.timers.schedule_try_to_send(now + RETRY_DELAY);
            return;
        };
        let bundle_id = first.clone();

        match self.select_link(&bundle_id, &candidates) {
            Some(address) => self.dispatch(address, bundle_id, now),
            None => {
                trace!(bundle_id = %bundle_id, "no neighbor with predictability");
                self.timers.schedule_try_to_send(now + RETRY_DELAY);
            }
        }
    }

    fn housekeeping(&mut self, now: SimTime) {
        for id in self.store.expired_ids(now) {
            self.delete_bundle(&id, DeleteReason::Expired);
        }
        self.forward_log.remove_expired(now);
        self.delivered.remove_expired(now);
    }

    /// Eligible (link, bundle) pairs, links in address order outermost
    fn candidates(&self) -> Vec<(LinkAddress, BundleId<I>)> {
        let mut candidates = Vec::new();
        for link in self.transport.links().connected() {
            for bundle in self.store.iter() {
                if !bundle.retention.forwarding_pending
                    || bundle.was_received_from(&link.remote_eid)
                    || self.forward_log.has_entry(&bundle.id, link.address)
                    || self.custody.is_pending(&bundle.id)
                {
                    continue;
                }
                candidates.push((link.address, bundle.id.clone()));
            }
        }
        candidates
    }

    fn select_link(
        &self,
        bundle_id: &BundleId<I>,
        candidates: &[(LinkAddress, BundleId<I>)],
    ) -> Option<LinkAddress> {
        let destination = &self.store.get(bundle_id)?.destination;
        let links = self.transport.links();
        let eligible: Vec<&Link<I>> = candidates
            .iter()
            .filter(|(_, id)| id == bundle_id)
            .filter_map(|(address, _)| links.find(*address))
            .collect();

        if let Some(direct) = eligible.iter().find(|l| &l.remote_eid == destination) {
            trace!(link = %direct.address, "direct delivery");
            return Some(direct.address);
        }

        let best = self
            .table
            .best_candidate(eligible.iter().map(|l| &l.remote_eid), destination)?;
        eligible
            .iter()
            .find(|l| l.remote_eid == best)
            .map(|l| l.address)
    }

    fn dispatch(&mut self, address: LinkAddress, id: BundleId<I>, now: SimTime) {
        let Some(bundle) = self.store.get_mut(&id) else {
            return;
        };
        bundle.custody_requested = true;
        if let Some(link) = self.transport.links_mut().find_mut(address) {
            link.contact.enqueue(id.clone());
        }
        self.transport.send_bundle(address, bundle);

        self.forward_log.add_entry(&id, address, now);
        let expires_at = self.custody.mark_pending(&id, now);
        self.timers
            .schedule(expires_at, Timer::CustodyExpiry { bundle: id.clone() });

        debug!(bundle_id = %id, link = %address, "dispatched bundle");
        self.in_flight = Some((address, id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockConvergenceLayer;
    use ferry_core::SimulationIdentity;

    type Router = ProphetRouter<SimulationIdentity, MockConvergenceLayer<SimulationIdentity>>;

    fn make_id(c: char) -> SimulationIdentity {
        SimulationIdentity::new(c).unwrap()
    }

    fn at(secs: u64) -> SimTime {
        SimTime::from_secs(secs)
    }

    fn make_router(c: char, config: ProphetConfig) -> Router {
        ProphetRouter::new(make_id(c), config, MockConvergenceLayer::new())
    }

    fn make_bundle(dst: char, seq: u32, size: usize) -> Bundle<SimulationIdentity> {
        Bundle::new(
            BundleId::new(make_id('S'), SimTime::ZERO, seq),
            make_id(dst),
            vec![0u8; size],
            Duration::from_secs(1000),
        )
    }

    fn connect(router: &mut Router, remote: char, now: SimTime) -> LinkAddress {
        let address = router.transport_mut().add_link(make_id(remote));
        router.on_link_discovered(address, now);
        router.handle_timeout(now);
        address
    }

    #[test]
    fn test_announce_follows_config() {
        let router = make_router('A', ProphetConfig::default());
        assert!(router.transport().is_announcing());

        let config = ProphetConfig {
            always_announce: false,
            ..ProphetConfig::default()
        };
        let mut router = make_router('A', config);
        assert!(!router.transport().is_announcing());

        router.originate(make_bundle('Z', 1, 10), at(0)).unwrap();
        assert!(router.transport().is_announcing());

        router.on_delivery_acknowledged(make_bundle('Z', 1, 0).id, at(1));
        assert!(router.store().is_empty());
        assert!(!router.transport().is_announcing());
    }

    #[test]
    fn test_discovery_bumps_predictability_and_arms_aging() {
        let mut router = make_router('A', ProphetConfig::default());
        let address = connect(&mut router, 'B', at(0));

        assert!((router.table().direct_probability(&make_id('B')) - 0.75).abs() < 1e-9);
        assert!(router.transport().links().find(address).unwrap().is_connected());
        assert_eq!(router.poll_timeout(), Some(at(10)));
    }

    #[test]
    fn test_rediscovering_a_connected_link_is_ignored() {
        let mut router = make_router('A', ProphetConfig::default());
        let address = connect(&mut router, 'B', at(0));
        router.on_link_discovered(address, at(1));
        assert!((router.table().direct_probability(&make_id('B')) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_empty_candidate_set_retries_after_one_unit() {
        let mut router = make_router('A', ProphetConfig::default());
        router.originate(make_bundle('Z', 1, 10), at(0)).unwrap();
        router.handle_timeout(at(0));

        assert!(router.transport().sent().is_empty());
        assert_eq!(router.poll_timeout(), Some(at(1)));
    }

    #[test]
    fn test_one_transmission_in_flight() {
        let mut router = make_router('A', ProphetConfig::default());
        router.originate(make_bundle('B', 1, 10), at(0)).unwrap();
        router.originate(make_bundle('B', 2, 10), at(0)).unwrap();
        let address = connect(&mut router, 'B', at(0));

        assert_eq!(router.transport().sent().len(), 1);
        assert!(router.is_sending());
        assert_eq!(router.in_flight().map(|(a, _)| a), Some(address));

        router.on_bundle_sent(address, make_bundle('B', 1, 0).id, true, at(1));
        router.handle_timeout(at(1));
        assert_eq!(router.transport().sent().len(), 2);
        assert_eq!(router.transport().sent()[1].1.sequence, 2);
    }

    #[test]
    fn test_duplicate_is_merged_not_stored() {
        let mut router = make_router('A', ProphetConfig::default());
        let b = router.transport_mut().add_link(make_id('B'));
        let c = router.transport_mut().add_link(make_id('C'));
        router.on_link_discovered(b, at(0));
        router.on_link_discovered(c, at(0));

        let outcome = router.on_bundle_received(make_bundle('Z', 1, 10), b, at(0));
        assert_eq!(outcome, Ok(ReceiveOutcome::Stored));
        let outcome = router.on_bundle_received(make_bundle('Z', 1, 10), c, at(0));
        assert_eq!(outcome, Ok(ReceiveOutcome::Redundant));

        assert_eq!(router.store().len(), 1);
        assert_eq!(router.store().used_bytes(), 10);
        let resident = router.store().get(&make_bundle('Z', 1, 0).id).unwrap();
        assert_eq!(resident.received_from, vec![make_id('B'), make_id('C')]);
        assert_eq!(resident.custodian, Some(make_id('A')));
        assert!(router.drain_events().iter().any(|e| matches!(
            e,
            RouterEvent::RedundantRelay { from: Some(from), .. } if *from == make_id('C')
        )));
    }

    #[test]
    fn test_bundle_for_local_node_is_delivered() {
        let mut router = make_router('A', ProphetConfig::default());
        let outcome = router.originate(make_bundle('A', 1, 10), at(0));
        assert_eq!(outcome, Ok(ReceiveOutcome::DeliveredLocally));
        assert!(router.store().is_empty());
        assert!(matches!(
            router.poll_event(),
            Some(RouterEvent::DeliveredLocally { .. })
        ));

        let again = router.originate(make_bundle('A', 1, 10), at(1));
        assert_eq!(again, Ok(ReceiveOutcome::AlreadyDelivered));
    }

    #[test]
    fn test_over_capacity_is_rejected() {
        let config = ProphetConfig {
            max_bytes: 100,
            ..ProphetConfig::default()
        };
        let mut router = make_router('A', config);
        let result = router.originate(make_bundle('Z', 1, 100), at(0));
        assert_eq!(
            result,
            Err(StoreError::OverCapacity {
                size: 100,
                max: 100
            })
        );
        assert!(router.store().is_empty());
    }

    #[test]
    fn test_expired_bundles_are_purged_before_sending() {
        let mut router = make_router('A', ProphetConfig::default());
        let mut bundle = make_bundle('B', 1, 10);
        bundle.lifetime = Duration::from_secs(5);
        router.originate(bundle, at(0)).unwrap();
        router.handle_timeout(at(0));

        connect(&mut router, 'B', at(6));
        assert!(router.transport().sent().is_empty());
        assert!(router.store().is_empty());
        assert!(router
            .drain_events()
            .iter()
            .any(|e| matches!(e, RouterEvent::Expired { .. })));
    }

    #[test]
    fn test_stale_unpause_after_close() {
        let mut router = make_router('A', ProphetConfig::default());
        router.originate(make_bundle('B', 1, 10), at(0)).unwrap();
        let address = connect(&mut router, 'B', at(0));

        router.on_bundle_send_failed(address, make_bundle('B', 1, 0).id, at(1));
        assert_eq!(
            router.transport().links().find(address).unwrap().state(),
            LinkState::Paused
        );

        router.on_link_closed(address, at(2));
        router.handle_timeout(at(20));
        assert!(router.transport().links().find(address).unwrap().is_closed());
    }
}

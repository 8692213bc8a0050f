//! Deferred router actions
//!
//! Every deferred action of the router (aging ticks, unpausing a link,
//! custody window expiry, send retries) is an entry in a [`TimerQueue`]
//! ordered by deadline, then by insertion. The owner drains due timers with
//! [`TimerQueue::pop_due`]; nothing fires on its own.

use std::collections::BTreeMap;

use ferry_core::{PeerIdentity, SimTime};

use crate::bundle::BundleId;
use crate::link::LinkAddress;

/// A deferred router action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer<I: PeerIdentity> {
    /// Run a send cycle
    TryToSend,
    /// Periodic predictability aging, one chain per live link
    Aging { link: LinkAddress },
    /// End of a link's pause
    Unpause { link: LinkAddress },
    /// End of a custody-pending window
    CustodyExpiry { bundle: BundleId<I> },
}

impl<I: PeerIdentity> Timer<I> {
    fn link(&self) -> Option<LinkAddress> {
        match self {
            Timer::Aging { link } | Timer::Unpause { link } => Some(*link),
            _ => None,
        }
    }
}

/// Timers ordered by (deadline, insertion)
#[derive(Debug, Clone)]
pub struct TimerQueue<I: PeerIdentity> {
    entries: BTreeMap<(SimTime, u64), Timer<I>>,
    next_seq: u64,
}

impl<I: PeerIdentity> Default for TimerQueue<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: PeerIdentity> TimerQueue<I> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, deadline: SimTime, timer: Timer<I>) {
        self.entries.insert((deadline, self.next_seq), timer);
        self.next_seq += 1;
    }

    /// Schedule a send cycle unless one is already due by `deadline`
    ///
    /// Returns whether a new timer was added.
    pub fn schedule_try_to_send(&mut self, deadline: SimTime) -> bool {
        let covered = self
            .entries
            .iter()
            .any(|((at, _), timer)| *at <= deadline && matches!(timer, Timer::TryToSend));
        if covered {
            return false;
        }
        self.schedule(deadline, Timer::TryToSend);
        true
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<SimTime> {
        self.entries.keys().next().map(|(at, _)| *at)
    }

    /// Remove and return the earliest timer due at or before `now`
    pub fn pop_due(&mut self, now: SimTime) -> Option<(SimTime, Timer<I>)> {
        let key = *self.entries.keys().next()?;
        if key.0 > now {
            return None;
        }
        self.entries.remove(&key).map(|timer| (key.0, timer))
    }

    /// Drop aging and unpause timers of a torn-down link
    pub fn cancel_link(&mut self, address: LinkAddress) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, timer| timer.link() != Some(address));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::SimulationIdentity;

    type Queue = TimerQueue<SimulationIdentity>;

    #[test]
    fn test_pops_in_deadline_then_insertion_order() {
        let mut queue = Queue::new();
        queue.schedule(SimTime::from_secs(5), Timer::Unpause { link: LinkAddress(1) });
        queue.schedule(SimTime::from_secs(2), Timer::Aging { link: LinkAddress(1) });
        queue.schedule(SimTime::from_secs(2), Timer::Aging { link: LinkAddress(2) });

        assert_eq!(queue.next_deadline(), Some(SimTime::from_secs(2)));
        assert!(queue.pop_due(SimTime::from_secs(1)).is_none());

        let now = SimTime::from_secs(10);
        assert_eq!(queue.pop_due(now).unwrap().1, Timer::Aging { link: LinkAddress(1) });
        assert_eq!(queue.pop_due(now).unwrap().1, Timer::Aging { link: LinkAddress(2) });
        assert_eq!(queue.pop_due(now).unwrap().1, Timer::Unpause { link: LinkAddress(1) });
        assert!(queue.pop_due(now).is_none());
    }

    #[test]
    fn test_try_to_send_is_coalesced() {
        let mut queue = Queue::new();
        assert!(queue.schedule_try_to_send(SimTime::from_secs(1)));
        assert!(!queue.schedule_try_to_send(SimTime::from_secs(1)));
        assert!(!queue.schedule_try_to_send(SimTime::from_secs(2)));
        // An earlier deadline is not covered by the later one
        assert!(queue.schedule_try_to_send(SimTime::ZERO));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_cancel_link() {
        let mut queue = Queue::new();
        queue.schedule(SimTime::from_secs(1), Timer::Aging { link: LinkAddress(1) });
        queue.schedule(SimTime::from_secs(1), Timer::Unpause { link: LinkAddress(1) });
        queue.schedule(SimTime::from_secs(1), Timer::Aging { link: LinkAddress(2) });
        queue.schedule(SimTime::from_secs(1), Timer::TryToSend);

        assert_eq!(queue.cancel_link(LinkAddress(1)), 2);
        assert_eq!(queue.len(), 2);
    }
}

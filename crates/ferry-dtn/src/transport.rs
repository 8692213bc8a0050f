//! Convergence-layer abstraction
//!
//! The [`ConvergenceLayer`] trait is everything the router needs from the
//! layer below it: the registry of links, a way to hand a bundle to a link,
//! a way to cancel a transmission, and control over beaconing. The router
//! never blocks on it; outcomes come back through the router's `on_*`
//! callbacks.
//!
//! ## Implementations
//!
//! - [`MockConvergenceLayer`](crate::mock::MockConvergenceLayer): records
//!   every call for tests
//! - `SimLink` in `ferry-simulation`: carries bundles through the
//!   discrete-event world

use ferry_core::PeerIdentity;

use crate::bundle::{Bundle, BundleId};
use crate::link::{LinkAddress, LinkRegistry, LinkState};

/// Link/contact collaborator of a router
///
/// # Type Parameters
///
/// * `I` - The endpoint identity type (e.g., `SimulationIdentity` or `DtnEndpoint`)
pub trait ConvergenceLayer<I: PeerIdentity> {
    /// Links known to this layer
    fn links(&self) -> &LinkRegistry<I>;

    /// Mutable access to the link registry
    fn links_mut(&mut self) -> &mut LinkRegistry<I>;

    /// Open a discovered link for transmissions
    ///
    /// Default implementation only moves the link to `Connected`.
    fn open_link(&mut self, address: LinkAddress) {
        if let Some(link) = self.links_mut().find_mut(address) {
            link.transition(LinkState::Connected);
        }
    }

    /// Tear a link down
    ///
    /// Default implementation only moves the link to `Closed`.
    fn close_link(&mut self, address: LinkAddress) {
        if let Some(link) = self.links_mut().find_mut(address) {
            link.transition(LinkState::Closed);
        }
    }

    /// Start transmitting a bundle on a link
    ///
    /// The outcome is reported later through `on_bundle_sent`,
    /// `on_bundle_send_failed` or `on_transmission_cancelled`.
    fn send_bundle(&mut self, address: LinkAddress, bundle: &Bundle<I>);

    /// Abort a transmission queued on a link
    fn cancel_transmission(&mut self, address: LinkAddress, bundle_id: &BundleId<I>);

    /// Turn periodic beaconing on or off
    fn set_announcing(&mut self, active: bool);
}

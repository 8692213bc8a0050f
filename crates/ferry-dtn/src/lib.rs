//! # Ferry DTN
//!
//! PRoPHET routing for delay-tolerant networks.
//!
//! Nodes in a DTN exchange bundles only during intermittent contacts. Each
//! time a contact is available, the router decides which bundle goes over
//! which link, using delivery predictabilities learned from encounter
//! history.
//!
//! ## Features
//!
//! - **Delivery predictability**: direct, transitive and aging updates over a
//!   per-neighbor table, with beacons to exchange them.
//!
//! - **Forwarding decisions**: one transmission at a time, direct delivery
//!   when the destination is in contact, best-predictability next hop
//!   otherwise.
//!
//! - **Bounded storage**: a byte ceiling with oldest-first eviction.
//!
//! - **Redundancy control**: a forward log, a custody-pending window and a
//!   known-delivered set keep bundles from being offered twice.
//!
//! - **Link lifecycle**: failed transmissions pause a link, repeated failures
//!   close it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use ferry_core::{SimTime, SimulationIdentity};
//! use ferry_dtn::{Bundle, BundleId, MockConvergenceLayer, ProphetConfig, ProphetRouter};
//!
//! let a = SimulationIdentity('A');
//! let mut router = ProphetRouter::new(a, ProphetConfig::default(), MockConvergenceLayer::new());
//!
//! let bundle = Bundle::new(
//!     BundleId::new(a, SimTime::ZERO, 0),
//!     SimulationIdentity('B'),
//!     b"hello".to_vec(),
//!     Duration::from_secs(600),
//! );
//! router.originate(bundle, SimTime::ZERO)?;
//!
//! let link = router.transport_mut().add_link(SimulationIdentity('B'));
//! router.on_link_discovered(link, SimTime::ZERO);
//! router.handle_timeout(SimTime::ZERO);
//! ```
//!
//! ## Architecture
//!
//! - [`bundle`]: The `Bundle` type and its identifier
//! - [`predictability`]: The delivery predictability table
//! - [`store`]: Capacity-bounded bundle storage
//! - [`forward_log`]: Which bundles were offered on which link
//! - [`custody`]: Custody hand-offs awaiting acknowledgement
//! - [`delivered`]: Bundles known to be delivered
//! - [`link`]: Links, contacts and the link registry
//! - [`transport`]: The convergence-layer trait the router drives
//! - [`timer`]: Deferred router actions
//! - [`hello`]: Predictability beacons
//! - [`engine`]: The forwarding engine tying it together
//! - [`error`]: DTN-specific error types

pub mod bundle;
pub mod custody;
pub mod delivered;
pub mod engine;
pub mod error;
pub mod event;
pub mod forward_log;
pub mod hello;
pub mod link;
pub mod mock;
pub mod predictability;
pub mod store;
pub mod timer;
pub mod transport;

// Re-export main types
pub use bundle::{Bundle, BundleId, Retention};
pub use custody::{CUSTODY_PENDING_WINDOW, CustodyTracker};
pub use delivered::{ACK_ONLY_RETENTION, DeliveryNotice, KnownDelivered};
pub use engine::{ProphetRouter, RETRY_DELAY};
pub use error::{HelloError, StoreError};
pub use event::{DeleteReason, ReceiveOutcome, RouterEvent};
pub use forward_log::ForwardLog;
pub use hello::{HelloMessage, HelloProcessor};
pub use link::{Contact, Link, LinkAddress, LinkRegistry, LinkState};
pub use mock::MockConvergenceLayer;
pub use predictability::{AGING_INTERVAL, BETA, GAMMA, P_INIT, PredictabilityTable};
pub use store::BundleStore;
pub use timer::{Timer, TimerQueue};
pub use transport::ConvergenceLayer;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Router configuration
///
/// The algorithm constants (`P_INIT`, `GAMMA`, `BETA`) are not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProphetConfig {
    /// Beacon continuously, or only while holding bundles
    pub always_announce: bool,
    /// Store capacity in bytes
    pub max_bytes: usize,
    /// Failed transmissions tolerated before a link is closed
    pub max_retries: u32,
    /// How long a link stays paused after a failure
    pub pause_duration: Duration,
    /// How long a forward-log entry suppresses re-offering
    pub forward_log_expiry: Duration,
}

impl Default for ProphetConfig {
    fn default() -> Self {
        Self {
            always_announce: true,
            max_bytes: 10 * 1024 * 1024,
            max_retries: 3,
            pause_duration: Duration::from_secs(10),
            forward_log_expiry: Duration::from_secs(60),
        }
    }
}

impl ProphetConfig {
    /// Create a config for sparse networks with rare, short contacts
    ///
    /// Keeps more data for longer and is slow to give up on a link.
    pub fn sparse_network() -> Self {
        Self {
            always_announce: true,
            max_bytes: 50 * 1024 * 1024,
            max_retries: 5,
            pause_duration: Duration::from_secs(30),
            forward_log_expiry: Duration::from_secs(300),
        }
    }

    /// Create a config for resource-constrained nodes
    ///
    /// Small store, beacons only while holding data.
    pub fn resource_constrained() -> Self {
        Self {
            always_announce: false,
            max_bytes: 1024 * 1024,
            max_retries: 2,
            pause_duration: Duration::from_secs(5),
            forward_log_expiry: Duration::from_secs(30),
        }
    }

    /// Validate configuration invariants
    ///
    /// Returns a list of warnings if the configuration has potential issues.
    /// An empty list means the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.max_bytes == 0 {
            warnings.push(ConfigWarning::ZeroCapacity);
        }

        // A zero pause turns every failure into an immediate retry
        if self.pause_duration.is_zero() {
            warnings.push(ConfigWarning::ZeroPauseDuration);
        }

        if self.forward_log_expiry.is_zero() {
            warnings.push(ConfigWarning::ZeroForwardLogWindow);
        }

        if self.max_retries > 20 {
            warnings.push(ConfigWarning::HighRetryCeiling);
        }

        warnings
    }

    /// Check if the configuration is valid (no warnings)
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Configuration warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The store cannot hold any bundle
    ZeroCapacity,
    /// Paused links reopen immediately
    ZeroPauseDuration,
    /// The forward log never suppresses anything
    ZeroForwardLogWindow,
    /// Retry ceiling is very high (> 20)
    HighRetryCeiling,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::ZeroCapacity => write!(f, "max_bytes is zero"),
            ConfigWarning::ZeroPauseDuration => write!(f, "pause_duration is zero"),
            ConfigWarning::ZeroForwardLogWindow => write!(f, "forward_log_expiry is zero"),
            ConfigWarning::HighRetryCeiling => {
                write!(f, "max_retries is very high (> 20)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProphetConfig::default();
        assert!(config.always_announce);
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.pause_duration, Duration::from_secs(10));
    }

    #[test]
    fn test_resource_constrained_config() {
        let config = ProphetConfig::resource_constrained();
        assert!(!config.always_announce);
        assert!(config.max_bytes < ProphetConfig::default().max_bytes);
    }

    #[test]
    fn test_preset_configs_are_valid() {
        assert!(ProphetConfig::default().is_valid());
        assert!(ProphetConfig::sparse_network().is_valid());
        assert!(ProphetConfig::resource_constrained().is_valid());
    }

    #[test]
    fn test_invalid_config_detected() {
        let config = ProphetConfig {
            max_bytes: 0,
            pause_duration: Duration::ZERO,
            max_retries: 100,
            ..ProphetConfig::default()
        };

        let warnings = config.validate();
        assert_eq!(
            warnings,
            vec![
                ConfigWarning::ZeroCapacity,
                ConfigWarning::ZeroPauseDuration,
                ConfigWarning::HighRetryCeiling,
            ]
        );
        assert!(!config.is_valid());
    }

    #[test]
    fn test_config_serde() {
        let config = ProphetConfig::sparse_network();
        let bytes = postcard::to_allocvec(&config).unwrap();
        let decoded: ProphetConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, config);
    }
}

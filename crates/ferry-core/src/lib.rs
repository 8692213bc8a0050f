//! # Ferry Core
//!
//! Core types shared by the Ferry delay-tolerant routing stack.
//!
//! The routing engine is written against the [`PeerIdentity`] abstraction so the
//! same decision logic runs with simple simulation identities ('A'..'Z') in
//! tests and with `dtn://` endpoint names in a deployment.
//!
//! ## Key Types
//!
//! - [`PeerIdentity`]: Abstraction over endpoint identifiers (EIDs)
//! - [`SimulationIdentity`]: Single-letter identity used by tests and the simulator
//! - [`DtnEndpoint`]: `dtn://node/` style endpoint identifier
//! - [`SimTime`]: Simulated instant; every engine entry point is handed one

pub mod error;
pub mod identity;
pub mod time;

pub use error::*;
pub use identity::*;
pub use time::*;

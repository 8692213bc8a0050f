//! # Ferry Simulation
//!
//! A discrete-event harness that runs PRoPHET routers over scheduled
//! contacts.
//!
//! ## Overview
//!
//! - **Nodes** (A-Z): each wraps a `ProphetRouter` over an in-memory
//!   convergence layer
//! - **Contact plans**: windows during which two nodes can exchange data
//! - **Beacons**: announcing nodes send their predictabilities to every
//!   connected neighbor once per beacon period
//! - **Transmissions** take time proportional to bundle size and fail if the
//!   contact ends first
//!
//! ## Architecture
//!
//! - **Contact** (`contact.rs`): contact windows and random ring plans
//! - **SimLink** (`sim_link.rs`): the convergence layer handed to each router
//! - **Node** (`node.rs`): a router plus its bundle sequence and log context
//! - **World** (`world.rs`): the event queue and all cross-node plumbing
//! - **Scenarios** (`scenarios.rs`): pre-built runs
//!
//! ## Example: relay through a carrier
//!
//! ```rust,ignore
//! use ferry_simulation::{WorldConfig, scenarios};
//!
//! let world = scenarios::relay(WorldConfig::default())?;
//! assert_eq!(world.stats().delivered, 1);
//! ```

pub mod contact;
pub mod error;
pub mod node;
pub mod scenarios;
pub mod sim_link;
pub mod stats;
pub mod world;

pub use contact::{ContactPlan, ContactWindow};
pub use error::SimError;
pub use node::{Node, SimRouter};
pub use scenarios::RingParams;
pub use sim_link::{LinkCommand, SimLink};
pub use stats::SimStats;
pub use world::{World, WorldConfig};

// Re-export core types for integration
pub use ferry_core::{SimTime, SimulationIdentity};

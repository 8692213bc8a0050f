//! Error types for the simulation harness

use ferry_core::{SimTime, SimulationIdentity};
use thiserror::Error;

/// Errors raised while building a simulated world
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("unknown node {0}")]
    UnknownNode(SimulationIdentity),

    #[error("node {0} already exists")]
    DuplicateNode(SimulationIdentity),

    #[error("a world holds at most 26 nodes, asked for {0}")]
    TooManyNodes(usize),

    #[error("node {0} cannot be in contact with itself")]
    SelfContact(SimulationIdentity),

    #[error("contact {a}-{b} must end after it starts ({start} to {end})")]
    EmptyWindow {
        a: SimulationIdentity,
        b: SimulationIdentity,
        start: SimTime,
        end: SimTime,
    },

    #[error("contact windows for {a}-{b} overlap")]
    OverlappingWindows {
        a: SimulationIdentity,
        b: SimulationIdentity,
    },
}

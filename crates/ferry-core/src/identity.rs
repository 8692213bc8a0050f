//! Endpoint identity abstractions
//!
//! This module provides the [`PeerIdentity`] trait that abstracts over
//! different endpoint identifier implementations:
//!
//! - `SimulationIdentity`: Simple char-based identity for testing ('A'..'Z')
//! - `DtnEndpoint`: Named `dtn://` endpoint for real deployments

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::IdentityError;

/// Trait for endpoint identity abstraction
///
/// Identities are opaque, comparable and immutable once created. The same
/// routing logic works with both simulation identities and named endpoints.
pub trait PeerIdentity:
    Clone + Eq + Hash + Send + Sync + Debug + Display + Serialize + DeserializeOwned + 'static
{
    /// Get the identity as bytes
    fn as_bytes(&self) -> Vec<u8>;

    /// Create an identity from bytes
    fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError>;

    /// Get a short display form (for logging)
    fn short_id(&self) -> String {
        format!("{}", self)
    }
}

/// Simple character-based identity for simulation
///
/// Used for testing and the simulator. Maps to characters 'A'..'Z'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimulationIdentity(pub char);

impl SimulationIdentity {
    /// Create a new simulation identity from a capital letter
    pub fn new(c: char) -> Option<Self> {
        if c.is_ascii_uppercase() {
            Some(Self(c))
        } else {
            None
        }
    }

    /// Generate all identities from 'A' to the given letter (inclusive)
    pub fn range_to(end: char) -> Vec<Self> {
        ('A'..=end).filter_map(Self::new).collect()
    }

    /// Get the underlying character
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl Display for SimulationIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PeerIdentity for SimulationIdentity {
    fn as_bytes(&self) -> Vec<u8> {
        vec![self.0 as u8]
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        if bytes.len() != 1 {
            return Err(IdentityError::InvalidLength {
                expected: 1,
                actual: bytes.len(),
            });
        }
        let c = bytes[0] as char;
        Self::new(c).ok_or_else(|| {
            IdentityError::InvalidFormat(format!("Invalid simulation identity: {}", c))
        })
    }

    fn short_id(&self) -> String {
        self.0.to_string()
    }
}

/// A `dtn://` node endpoint
///
/// Only the node name is kept; the demultiplexing suffix of a full endpoint
/// is irrelevant for next-hop routing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DtnEndpoint(String);

impl DtnEndpoint {
    const SCHEME: &'static str = "dtn://";

    /// Parse an endpoint of the form `dtn://node` or `dtn://node/service`
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let rest = s
            .strip_prefix(Self::SCHEME)
            .ok_or_else(|| IdentityError::UnsupportedScheme(s.to_string()))?;
        let node = rest.split('/').next().unwrap_or_default();
        if node.is_empty() {
            return Err(IdentityError::InvalidFormat(format!(
                "missing node name: {}",
                s
            )));
        }
        Ok(Self(node.to_string()))
    }

    /// The node name component
    pub fn node_name(&self) -> &str {
        &self.0
    }
}

impl Display for DtnEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}/", Self::SCHEME, self.0)
    }
}

impl PeerIdentity for DtnEndpoint {
    fn as_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        let name = std::str::from_utf8(bytes)
            .map_err(|e| IdentityError::InvalidFormat(e.to_string()))?;
        if name.is_empty() || name.contains('/') {
            return Err(IdentityError::InvalidFormat(format!(
                "invalid node name: {:?}",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    fn short_id(&self) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_identity_creation() {
        assert!(SimulationIdentity::new('A').is_some());
        assert!(SimulationIdentity::new('Z').is_some());
        assert!(SimulationIdentity::new('a').is_none());
        assert!(SimulationIdentity::new('1').is_none());
    }

    #[test]
    fn test_simulation_identity_range() {
        let ids = SimulationIdentity::range_to('C');
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0].0, 'A');
        assert_eq!(ids[2].0, 'C');
    }

    #[test]
    fn test_simulation_identity_from_bad_bytes() {
        assert!(SimulationIdentity::from_bytes(&[]).is_err());
        assert!(SimulationIdentity::from_bytes(b"a").is_err());
        assert_eq!(
            SimulationIdentity::from_bytes(b"M").unwrap(),
            SimulationIdentity('M')
        );
    }

    #[test]
    fn test_dtn_endpoint_parse() {
        let eid = DtnEndpoint::parse("dtn://rover-7/telemetry").unwrap();
        assert_eq!(eid.node_name(), "rover-7");
        assert_eq!(eid.to_string(), "dtn://rover-7/");
        assert_eq!(eid, DtnEndpoint::parse("dtn://rover-7").unwrap());
    }

    #[test]
    fn test_dtn_endpoint_rejects_other_schemes() {
        assert!(matches!(
            DtnEndpoint::parse("ipn:1.0"),
            Err(IdentityError::UnsupportedScheme(_))
        ));
        assert!(DtnEndpoint::parse("dtn:///").is_err());
    }
}

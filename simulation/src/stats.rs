//! Simulation statistics

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Counters collected from router events over a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimStats {
    /// Bundles accepted by their source
    pub created: u64,
    /// Bundles that reached their destination
    pub delivered: u64,
    /// Transmissions to an intermediate node
    pub relayed: u64,
    pub expired: u64,
    pub evicted: u64,
    /// Copies of an already resident bundle
    pub redundant: u64,
    pub buffer_overflows: u64,
    pub links_paused: u64,
    pub links_closed: u64,
    pub beacons: u64,
    /// Sum of creation-to-delivery times
    pub total_latency: Duration,
}

impl SimStats {
    /// Mean creation-to-delivery time, if anything was delivered
    pub fn average_latency(&self) -> Option<Duration> {
        let delivered = u32::try_from(self.delivered).ok().filter(|d| *d > 0)?;
        Some(self.total_latency / delivered)
    }

    /// Fraction of created bundles that were delivered
    pub fn delivery_ratio(&self) -> f64 {
        if self.created == 0 {
            0.0
        } else {
            self.delivered as f64 / self.created as f64
        }
    }
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "created:          {}", self.created)?;
        writeln!(
            f,
            "delivered:        {} ({:.1}%)",
            self.delivered,
            self.delivery_ratio() * 100.0
        )?;
        writeln!(f, "relayed:          {}", self.relayed)?;
        writeln!(f, "expired:          {}", self.expired)?;
        writeln!(f, "evicted:          {}", self.evicted)?;
        writeln!(f, "redundant relays: {}", self.redundant)?;
        writeln!(f, "buffer overflows: {}", self.buffer_overflows)?;
        writeln!(
            f,
            "links paused:     {} (closed {})",
            self.links_paused, self.links_closed
        )?;
        match self.average_latency() {
            Some(latency) => write!(f, "avg latency:      {:.3}s", latency.as_secs_f64()),
            None => write!(f, "avg latency:      n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_latency() {
        let stats = SimStats {
            delivered: 4,
            total_latency: Duration::from_secs(100),
            ..Default::default()
        };
        assert_eq!(stats.average_latency(), Some(Duration::from_secs(25)));
        assert_eq!(SimStats::default().average_latency(), None);
    }

    #[test]
    fn test_delivery_ratio() {
        let stats = SimStats {
            created: 8,
            delivered: 6,
            ..Default::default()
        };
        assert!((stats.delivery_ratio() - 0.75).abs() < 1e-12);
        assert_eq!(SimStats::default().delivery_ratio(), 0.0);
    }

    #[test]
    fn test_display_mentions_every_counter() {
        let text = SimStats::default().to_string();
        assert!(text.contains("delivered:"));
        assert!(text.contains("avg latency:      n/a"));
    }
}

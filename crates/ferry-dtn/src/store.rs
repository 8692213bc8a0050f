//! Capacity-bounded bundle store
//!
//! Holds the bundles pending delivery in insertion order. Admission only
//! rejects bundles that could never fit; room is made lazily by evicting
//! the oldest residents when a new bundle is inserted.

use std::collections::VecDeque;

use tracing::debug;

use ferry_core::{PeerIdentity, SimTime};

use crate::bundle::{Bundle, BundleId};
use crate::error::StoreError;

/// Bundles pending delivery, oldest first
#[derive(Debug, Clone)]
pub struct BundleStore<I: PeerIdentity> {
    bundles: VecDeque<Bundle<I>>,
    used_bytes: usize,
    max_bytes: usize,
}

impl<I: PeerIdentity> BundleStore<I> {
    /// Create an empty store with a byte ceiling
    pub fn new(max_bytes: usize) -> Self {
        Self {
            bundles: VecDeque::new(),
            used_bytes: 0,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn free_bytes(&self) -> usize {
        self.max_bytes.saturating_sub(self.used_bytes)
    }

    /// Number of pending bundles
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn contains(&self, id: &BundleId<I>) -> bool {
        self.bundles.iter().any(|b| &b.id == id)
    }

    pub fn get(&self, id: &BundleId<I>) -> Option<&Bundle<I>> {
        self.bundles.iter().find(|b| &b.id == id)
    }

    pub fn get_mut(&mut self, id: &BundleId<I>) -> Option<&mut Bundle<I>> {
        self.bundles.iter_mut().find(|b| &b.id == id)
    }

    /// Iterate over bundles in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Bundle<I>> {
        self.bundles.iter()
    }

    /// Capacity pre-check run at admission
    ///
    /// Fails only if the bundle is at least as large as the whole store.
    pub fn check_capacity(&self, bundle: &Bundle<I>) -> Result<(), StoreError> {
        if bundle.size() >= self.max_bytes {
            return Err(StoreError::OverCapacity {
                size: bundle.size(),
                max: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Whether `size` bytes fit without evicting anything
    pub fn fits(&self, size: usize) -> bool {
        size < self.free_bytes()
    }

    /// Evict the oldest bundles until `bundle` fits
    ///
    /// Returns the evicted bundles (oldest first) so the caller can run its
    /// delete bookkeeping for each. Nothing is evicted if the bundle can
    /// never fit.
    pub fn make_room(&mut self, bundle: &Bundle<I>) -> Result<Vec<Bundle<I>>, StoreError> {
        let size = bundle.size();
        let mut evicted = Vec::new();

        if size < self.max_bytes {
            while !self.fits(size) {
                let Some(oldest) = self.bundles.pop_front() else {
                    break;
                };
                self.used_bytes -= oldest.size();
                debug!(bundle_id = %oldest.id, size = oldest.size(), "evicting oldest bundle");
                evicted.push(oldest);
            }
            if self.fits(size) {
                return Ok(evicted);
            }
        }

        // An empty store always fits a bundle below capacity, so nothing was
        // evicted on this path.
        debug_assert!(evicted.is_empty());
        Err(StoreError::BufferOverflow {
            size,
            free: self.free_bytes(),
        })
    }

    /// Append a bundle; returns true if it is the only pending bundle
    pub fn insert(&mut self, bundle: Bundle<I>) -> bool {
        self.used_bytes += bundle.size();
        self.bundles.push_back(bundle);
        self.bundles.len() == 1
    }

    /// Remove a bundle by id
    pub fn remove(&mut self, id: &BundleId<I>) -> Option<Bundle<I>> {
        let index = self.bundles.iter().position(|b| &b.id == id)?;
        let bundle = self.bundles.remove(index)?;
        self.used_bytes -= bundle.size();
        Some(bundle)
    }

    /// Ids of bundles whose lifetime has elapsed
    pub fn expired_ids(&self, now: SimTime) -> Vec<BundleId<I>> {
        self.bundles
            .iter()
            .filter(|b| b.is_expired(now))
            .map(|b| b.id.clone())
            .collect()
    }
}

//! Venue registry
//!
//! Explicit, injectable registry shared by the health monitor and the router.
//! No global state: every test builds its own instance.
//!
//! Concurrency: the venue map is behind one RwLock that is only written on
//! add/remove/activate. Each venue's health record has its own cache-padded
//! RwLock, so heartbeat updates for one venue never contend with reads of
//! another, and readers always copy out a whole (torn-free) record.

use crate::core::{VenueHealth, VenueId, VenueProfile};
use crate::{CoreError, Result};
use crossbeam_utils::CachePadded;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry slot for one venue
#[derive(Debug)]
struct VenueEntry {
    profile: RwLock<Arc<VenueProfile>>,
    health: CachePadded<RwLock<VenueHealth>>,
}

impl VenueEntry {
    fn new(profile: VenueProfile) -> Self {
        let health = VenueHealth::from_baseline(profile.baseline_latency_us);
        Self {
            profile: RwLock::new(Arc::new(profile)),
            health: CachePadded::new(RwLock::new(health)),
        }
    }
}

/// Point-in-time view of one venue
#[derive(Debug, Clone)]
pub struct VenueSnapshot {
    pub profile: Arc<VenueProfile>,
    pub health: VenueHealth,
}

/// Registry of venue profiles and their live health
#[derive(Debug, Default)]
pub struct VenueRegistry {
    /// Ordered by VenueId so iteration order is deterministic
    venues: RwLock<BTreeMap<VenueId, Arc<VenueEntry>>>,
}

impl VenueRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with profiles
    ///
    /// # Errors
    /// Returns `DuplicateVenue` if two profiles share an id.
    pub fn from_profiles(profiles: impl IntoIterator<Item = VenueProfile>) -> Result<Self> {
        let registry = Self::new();
        for profile in profiles {
            registry.add_venue(profile)?;
        }
        Ok(registry)
    }

    /// Register a venue; its health record starts in `Unknown`
    pub fn add_venue(&self, profile: VenueProfile) -> Result<()> {
        let mut venues = self.venues.write();
        if venues.contains_key(&profile.id) {
            return Err(CoreError::DuplicateVenue(profile.id));
        }
        tracing::info!(target: "health", venue = %profile.id, "venue registered");
        venues.insert(profile.id.clone(), Arc::new(VenueEntry::new(profile)));
        Ok(())
    }

    /// Remove a venue together with its health record
    pub fn remove_venue(&self, id: &VenueId) -> Result<Arc<VenueProfile>> {
        let entry = self
            .venues
            .write()
            .remove(id)
            .ok_or_else(|| CoreError::UnknownVenue(id.clone()))?;
        tracing::info!(target: "health", venue = %id, "venue removed");
        let profile = entry.profile.read().clone();
        Ok(profile)
    }

    /// Toggle the static active flag
    pub fn set_active(&self, id: &VenueId, active: bool) -> Result<()> {
        let venues = self.venues.read();
        let entry = venues
            .get(id)
            .ok_or_else(|| CoreError::UnknownVenue(id.clone()))?;
        let mut profile = entry.profile.write();
        if profile.active != active {
            let mut updated = VenueProfile::clone(&profile);
            updated.active = active;
            *profile = Arc::new(updated);
        }
        Ok(())
    }

    pub fn profile(&self, id: &VenueId) -> Option<Arc<VenueProfile>> {
        self.venues.read().get(id).map(|e| e.profile.read().clone())
    }

    /// Copy of the venue's current health record
    pub fn health(&self, id: &VenueId) -> Option<VenueHealth> {
        self.venues.read().get(id).map(|e| *e.health.read())
    }

    /// Snapshot of every venue in ascending id order
    pub fn snapshot(&self) -> Vec<VenueSnapshot> {
        let venues = self.venues.read();
        let mut out = Vec::with_capacity(venues.len());
        for entry in venues.values() {
            out.push(VenueSnapshot {
                profile: entry.profile.read().clone(),
                health: *entry.health.read(),
            });
        }
        out
    }

    /// Venues that are active and connected
    pub fn active_venues(&self) -> Vec<VenueId> {
        self.venues
            .read()
            .iter()
            .filter(|(_, e)| e.profile.read().active && e.health.read().is_connected())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn venue_ids(&self) -> Vec<VenueId> {
        self.venues.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.venues.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.read().is_empty()
    }

    /// Mutate one venue's health under its record lock
    ///
    /// Returns None if the venue is not registered.
    pub(crate) fn with_health_mut<R>(
        &self,
        id: &VenueId,
        f: impl FnOnce(&VenueProfile, &mut VenueHealth) -> R,
    ) -> Option<R> {
        let venues = self.venues.read();
        let entry = venues.get(id)?;
        let profile = entry.profile.read().clone();
        let mut health = entry.health.write();
        Some(f(&profile, &mut health))
    }

    /// Mutate every venue's health in ascending id order
    pub(crate) fn for_each_health_mut(
        &self,
        mut f: impl FnMut(&VenueId, &VenueProfile, &mut VenueHealth),
    ) {
        let venues = self.venues.read();
        for (id, entry) in venues.iter() {
            let profile = entry.profile.read().clone();
            let mut health = entry.health.write();
            f(id, &profile, &mut health);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConnectionState;
    use crate::test_utils::venue_profile;

    #[test]
    fn test_add_and_lookup() {
        let registry = VenueRegistry::new();
        registry.add_venue(venue_profile("BINANCE", 500.0)).unwrap();

        assert_eq!(registry.len(), 1);
        let id = VenueId::from("BINANCE");
        assert_eq!(registry.profile(&id).unwrap().baseline_latency_us, 500.0);
        assert_eq!(registry.health(&id).unwrap().state, ConnectionState::Unknown);
    }

    #[test]
    fn test_duplicate_rejected() {
        let registry = VenueRegistry::new();
        registry.add_venue(venue_profile("A", 500.0)).unwrap();
        let err = registry.add_venue(venue_profile("A", 900.0)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateVenue(_)));
    }

    #[test]
    fn test_remove_drops_health() {
        let registry =
            VenueRegistry::from_profiles([venue_profile("A", 500.0), venue_profile("B", 500.0)])
                .unwrap();
        let id = VenueId::from("A");
        registry.remove_venue(&id).unwrap();

        assert!(registry.health(&id).is_none());
        assert_eq!(registry.len(), 1);
        assert!(matches!(
            registry.remove_venue(&id),
            Err(CoreError::UnknownVenue(_))
        ));
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let registry = VenueRegistry::from_profiles([
            venue_profile("KRAKEN", 1200.0),
            venue_profile("BINANCE", 500.0),
            venue_profile("COINBASE", 800.0),
        ])
        .unwrap();

        let ids: Vec<_> = registry
            .snapshot()
            .into_iter()
            .map(|s| s.profile.id.to_string())
            .collect();
        assert_eq!(ids, vec!["BINANCE", "COINBASE", "KRAKEN"]);
    }

    #[test]
    fn test_active_venues_requires_connection() {
        let registry =
            VenueRegistry::from_profiles([venue_profile("A", 500.0), venue_profile("B", 500.0)])
                .unwrap();
        assert!(registry.active_venues().is_empty());

        let a = VenueId::from("A");
        registry.with_health_mut(&a, |_, h| h.state = ConnectionState::Connected);
        assert_eq!(registry.active_venues(), vec![a.clone()]);

        registry.set_active(&a, false).unwrap();
        assert!(registry.active_venues().is_empty());
        assert!(!registry.profile(&a).unwrap().active);
    }

    #[test]
    fn test_independent_instances() {
        let first = VenueRegistry::from_profiles([venue_profile("A", 500.0)]).unwrap();
        let second = VenueRegistry::new();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}

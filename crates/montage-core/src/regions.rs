//! NUID to region assignment.
//!
//! Every remote participant is pinned to one region on first contact and
//! keeps it for the life of the process. The table lives behind the
//! router's assignment lock; its mutating methods take `&mut self`, so
//! they can only be reached through the write guard.

use std::collections::BTreeMap;

use montage_types::{Nuid, Region, RegionLetters};
use tracing::{debug, info};

/// The NUID assignment table plus pinned device serial numbers.
#[derive(Debug, Clone)]
pub struct RegionAssignments {
    letters: RegionLetters,
    by_nuid: BTreeMap<Nuid, Option<Region>>,
    by_morph: BTreeMap<String, Region>,
}

impl RegionAssignments {
    /// An empty table over the given letter pool.
    pub const fn new(letters: RegionLetters) -> Self {
        Self {
            letters,
            by_nuid: BTreeMap::new(),
            by_morph: BTreeMap::new(),
        }
    }

    /// The region pinned to `nuid`, assigning the first free one if needed.
    ///
    /// Returns `None` once the pool is exhausted. That outcome is recorded
    /// too, so the participant stays without a region.
    pub fn region_for_nuid(&mut self, nuid: &Nuid) -> Option<Region> {
        if let Some(&assigned) = self.by_nuid.get(nuid) {
            return assigned;
        }
        let region = self.available_region();
        match region {
            Some(region) => info!(%nuid, %region, "Assigned region"),
            None => info!(%nuid, "No regions available"),
        }
        self.by_nuid.insert(nuid.clone(), region);
        region
    }

    /// The current assignment for `nuid`, without assigning.
    pub fn assigned(&self, nuid: &Nuid) -> Option<Region> {
        self.by_nuid.get(nuid).copied().flatten()
    }

    /// The first letter, in pool order, not yet assigned to any NUID.
    pub fn available_region(&self) -> Option<Region> {
        self.letters
            .iter()
            .find(|region| !self.by_nuid.values().any(|v| *v == Some(*region)))
    }

    /// Pin a physical device serial number to a region.
    pub fn set_region_for_morph(&mut self, serial: impl Into<String>, region: Region) {
        let serial = serial.into();
        debug!(serial = %serial, %region, "Pinned device to region");
        self.by_morph.insert(serial, region);
    }

    /// The region pinned to a device serial number.
    pub fn region_for_morph(&self, serial: &str) -> Option<Region> {
        self.by_morph.get(serial).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_in_pool_order_and_sticks() {
        let mut table = RegionAssignments::new(RegionLetters::default());
        let a = Nuid::new("a");
        let b = Nuid::new("b");
        assert_eq!(table.region_for_nuid(&a), Some(Region::new('A')));
        assert_eq!(table.region_for_nuid(&b), Some(Region::new('B')));
        assert_eq!(table.region_for_nuid(&a), Some(Region::new('A')));
        assert_eq!(table.available_region(), Some(Region::new('C')));
    }

    #[test]
    fn exhaustion_yields_no_region() {
        let mut table =
            RegionAssignments::new(RegionLetters::parse("XY").unwrap_or_default());
        table.region_for_nuid(&Nuid::new("1"));
        table.region_for_nuid(&Nuid::new("2"));
        let late = Nuid::new("3");
        assert_eq!(table.region_for_nuid(&late), None);
        assert_eq!(table.region_for_nuid(&late), None);
        assert_eq!(table.assigned(&late), None);
    }

    #[test]
    fn morph_serials_are_separate() {
        let mut table = RegionAssignments::new(RegionLetters::default());
        table.set_region_for_morph("SN123", Region::new('C'));
        assert_eq!(table.region_for_morph("SN123"), Some(Region::new('C')));
        assert_eq!(table.region_for_nuid(&Nuid::new("x")), Some(Region::new('A')));
    }
}

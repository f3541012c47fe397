//! Date-keyed availability sets and the diff between them.
//!
//! The same [`AvailabilitySet`] type backs the server snapshot and the
//! working selection. Dates are unique; ids ride along so deletes can be
//! addressed without another lookup.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::types::{AvailabilityId, AvailabilityRecord};

/// Ordered set of availability records keyed by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilitySet {
    records: BTreeMap<NaiveDate, Option<AvailabilityId>>,
}

impl AvailabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapse records to one per date. The first record seen for a date wins.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = AvailabilityRecord>,
    {
        let mut set = Self::new();
        for record in records {
            set.records.entry(record.date).or_insert(record.id);
        }
        set
    }

    /// Build a selection from bare dates, taking ids from `reference`
    /// where it already holds the date.
    pub fn from_dates<I>(dates: I, reference: &AvailabilitySet) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let records = dates
            .into_iter()
            .map(|date| (date, reference.id_of(date)))
            .collect();
        Self { records }
    }

    /// Same dates, ids re-resolved against `reference`.
    pub fn rebase(&self, reference: &AvailabilitySet) -> Self {
        Self::from_dates(self.dates(), reference)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.records.contains_key(&date)
    }

    pub fn id_of(&self, date: NaiveDate) -> Option<AvailabilityId> {
        self.records.get(&date).copied().flatten()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.records.keys().copied()
    }

    pub fn records(&self) -> impl Iterator<Item = AvailabilityRecord> + '_ {
        self.records
            .iter()
            .map(|(&date, &id)| AvailabilityRecord { id, date })
    }

    pub fn to_vec(&self) -> Vec<AvailabilityRecord> {
        self.records().collect()
    }

    /// Whether both sets hold exactly the same dates, ids ignored.
    pub fn same_dates(&self, other: &AvailabilitySet) -> bool {
        self.records.keys().eq(other.records.keys())
    }
}

impl FromIterator<AvailabilityRecord> for AvailabilitySet {
    fn from_iter<I: IntoIterator<Item = AvailabilityRecord>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}

/// Minimal set of writes turning the snapshot into the working selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityDiff {
    /// Dates selected locally but absent on the server, ascending.
    pub to_add: Vec<NaiveDate>,
    /// Server records no longer selected, ascending.
    pub to_remove: Vec<AvailabilityRecord>,
}

impl AvailabilityDiff {
    pub fn between(snapshot: &AvailabilitySet, working: &AvailabilitySet) -> Self {
        let to_add = working
            .dates()
            .filter(|date| !snapshot.contains(*date))
            .collect();
        let to_remove = snapshot
            .records()
            .filter(|record| !working.contains(record.date))
            .collect();
        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Ids to delete. Snapshot records without an id never reached the
    /// server, so there is nothing to delete for them.
    pub fn ids_to_remove(&self) -> impl Iterator<Item = AvailabilityId> + '_ {
        self.to_remove.iter().filter_map(|record| record.id)
    }
}

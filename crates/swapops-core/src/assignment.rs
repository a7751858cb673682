//! Assignment set computation
//!
//! Decides which staff may be added to a station and how the current staff
//! of a station is presented. All functions are pure: inputs are never
//! mutated and the normalizer's relative order is preserved.

use crate::error::BackendError;
use crate::normalize::normalize_staff;
use crate::record::RecordSet;
use crate::types::{CanonicalStaff, StaffId, StationId};
use std::collections::HashSet;

/// Ids to remove from a candidate pool regardless of other rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    ids: HashSet<String>,
}

impl ExclusionSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the staff currently listed at a station
    #[must_use]
    pub fn from_staff(staff: &[CanonicalStaff]) -> Self {
        staff.iter().map(|s| s.staff_id.as_str()).collect()
    }

    /// Add an id; blank ids are ignored
    pub fn insert(&mut self, id: impl AsRef<str>) {
        let trimmed = id.as_ref().trim();
        if !trimmed.is_empty() {
            self.ids.insert(trimmed.to_string());
        }
    }

    /// Add every id of `other`
    pub fn merge(&mut self, other: &ExclusionSet) {
        self.ids.extend(other.ids.iter().cloned());
    }

    /// Whether `id` is excluded
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &StaffId) -> bool {
        self.ids.contains(id.as_str())
    }

    /// Number of excluded ids
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is excluded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Why a staff member can or cannot be added to a station
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Free to be added
    Available,
    /// Already assigned to the station being edited
    AssignedHere,
    /// Assigned to a different station
    AssignedElsewhere(StationId),
    /// Listed in the caller-supplied exclusion set
    Excluded,
}

impl Availability {
    /// Whether the staff member may be offered as a candidate
    #[inline]
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Classify one staff member relative to `station`
///
/// Reasons are checked in order: assigned here, assigned elsewhere,
/// excluded. Without a station any assignment counts as elsewhere.
#[must_use]
pub fn availability(
    staff: &CanonicalStaff,
    station: Option<&StationId>,
    exclusions: &ExclusionSet,
) -> Availability {
    match (&staff.current_station_id, station) {
        (Some(current), Some(target)) if current == target => Availability::AssignedHere,
        (Some(current), _) => Availability::AssignedElsewhere(current.clone()),
        (None, _) if exclusions.contains(&staff.staff_id) => Availability::Excluded,
        (None, _) => Availability::Available,
    }
}

/// Lowercased search needle, or `None` when the query is too short to filter
#[must_use]
pub fn search_needle(query: Option<&str>, min_chars: usize) -> Option<String> {
    let trimmed = query?.trim();
    if trimmed.is_empty() || trimmed.chars().count() < min_chars {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Staff that may be added to `station`
///
/// Removes staff assigned here or anywhere else (or, with no station chosen,
/// anyone with an assignment), then staff in `exclusions`. A staff id never
/// appears twice; the first occurrence is kept.
#[must_use]
pub fn compute_candidates(
    staff: &[CanonicalStaff],
    station: Option<&StationId>,
    exclusions: &ExclusionSet,
) -> Vec<CanonicalStaff> {
    let mut seen: HashSet<&StaffId> = HashSet::new();
    staff
        .iter()
        .filter(|s| availability(s, station, exclusions).is_available())
        .filter(|s| seen.insert(&s.staff_id))
        .cloned()
        .collect()
}

/// Apply the case-insensitive substring filter to an already-filtered list
#[must_use]
pub fn filter_by_search(staff: Vec<CanonicalStaff>, needle: Option<&str>) -> Vec<CanonicalStaff> {
    match needle {
        Some(needle) => staff
            .into_iter()
            .filter(|s| s.matches_search(needle))
            .collect(),
        None => staff,
    }
}

/// Candidates with the optional search applied after exclusion filtering
#[must_use]
pub fn search_candidates(
    staff: &[CanonicalStaff],
    station: Option<&StationId>,
    exclusions: &ExclusionSet,
    query: Option<&str>,
) -> Vec<CanonicalStaff> {
    let needle = search_needle(query, 1);
    filter_by_search(compute_candidates(staff, station, exclusions), needle.as_deref())
}

/// Current staff from the direct per-station listing
///
/// A failed or empty listing yields an empty set; the failure is logged and
/// never propagated into candidate computation.
#[must_use]
pub fn current_staff(listing: Result<RecordSet, BackendError>) -> Vec<CanonicalStaff> {
    match listing {
        Ok(records) => normalize_staff(&records),
        Err(err) => {
            tracing::warn!("Station staff listing unavailable, treating as empty: {}", err);
            Vec::new()
        }
    }
}

/// "Current staff at station" view with both exclusion reasons kept apart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationRoster {
    /// Staff at this station, direct listing first
    pub assigned_here: Vec<CanonicalStaff>,
    /// Staff held by other stations, with the holding station
    pub assigned_elsewhere: Vec<(CanonicalStaff, StationId)>,
}

impl StationRoster {
    /// Ids that must not be offered as candidates for this station
    #[must_use]
    pub fn exclusions(&self) -> ExclusionSet {
        self.assigned_here
            .iter()
            .chain(self.assigned_elsewhere.iter().map(|(s, _)| s))
            .map(|s| s.staff_id.as_str())
            .collect()
    }
}

/// Build the roster of `station` from global staff and its direct listing
#[must_use]
pub fn station_roster(
    all: &[CanonicalStaff],
    station: &StationId,
    direct: &[CanonicalStaff],
) -> StationRoster {
    let mut roster = StationRoster::default();
    let mut here: HashSet<&StaffId> = HashSet::new();

    for staff in direct {
        if here.insert(&staff.staff_id) {
            roster.assigned_here.push(staff.clone());
        }
    }

    for staff in all {
        if here.contains(&staff.staff_id) {
            continue;
        }
        match availability(staff, Some(station), &ExclusionSet::new()) {
            Availability::AssignedHere => {
                here.insert(&staff.staff_id);
                roster.assigned_here.push(staff.clone());
            }
            Availability::AssignedElsewhere(other) => {
                roster.assigned_elsewhere.push((staff.clone(), other));
            }
            Availability::Available | Availability::Excluded => {}
        }
    }
    roster
}

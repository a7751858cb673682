//! Staff normalization
//!
//! Maps heterogeneous "list all staff" records into [`CanonicalStaff`]:
//! 1. Select the primary assignment among the record's assignment sub-records
//! 2. Resolve the canonical id from the record, its embedded staff, its
//!    embedded account, then the primary assignment
//! 3. Fill display and station fields from the [`STAFF_FIELD_RULES`] table
//!
//! Records without a resolvable id are dropped from the canonical output;
//! [`normalize_staff_report`] keeps them aside for read-only display.
//!
//! [`STAFF_FIELD_RULES`]: crate::schema::STAFF_FIELD_RULES

use crate::identity::resolve_first;
use crate::record::{Record, RecordSet};
use crate::schema::{direct_staff_id, resolve_field, StaffField, ASSIGNMENT_LIST_KEYS};
use crate::types::{CanonicalStaff, StaffId, StationId};
use serde::Serialize;
use std::collections::HashSet;

/// Staff record whose canonical id could not be resolved
///
/// Shown read-only; never eligible for assignment mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedStaff {
    /// Position in the source list
    pub index: usize,
    pub account_id: Option<String>,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
}

/// Normalization output including dropped records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub staff: Vec<CanonicalStaff>,
    pub unresolved: Vec<UnresolvedStaff>,
    /// Records dropped because an earlier record had the same staff id
    pub duplicates: usize,
}

/// Assignment sub-records of a staff record, from every known list key
#[must_use]
pub fn assignment_records<'a>(record: &Record<'a>) -> Vec<Record<'a>> {
    ASSIGNMENT_LIST_KEYS
        .iter()
        .flat_map(|key| record.objects(key))
        .collect()
}

/// Primary assignment: first sub-record with a staff id, else the first one
#[must_use]
pub fn primary_assignment<'a>(assignments: &[Record<'a>]) -> Option<Record<'a>> {
    assignments
        .iter()
        .find(|a| direct_staff_id(a).is_some())
        .or_else(|| assignments.first())
        .copied()
}

/// Normalize one raw staff record; `None` when no canonical id is reachable
#[must_use]
pub fn normalize_record(record: &Record<'_>) -> Option<CanonicalStaff> {
    let assignments = assignment_records(record);
    let primary = primary_assignment(&assignments);

    let staff_id = resolve_first(
        [
            Some(*record),
            record.object("staff"),
            record.object("account"),
            primary,
        ]
        .into_iter()
        .flatten(),
    )?;

    if assignments.len() > 1 {
        let stations: HashSet<_> = assignments
            .iter()
            .filter_map(|a| a.text("stationId"))
            .collect();
        if stations.len() > 1 {
            tracing::debug!(
                "Staff {} carries assignments at {} stations; using the first",
                staff_id,
                stations.len()
            );
        }
    }

    Some(fill_fields(staff_id, record, primary.as_ref()))
}

fn fill_fields(
    staff_id: StaffId,
    record: &Record<'_>,
    primary: Option<&Record<'_>>,
) -> CanonicalStaff {
    let field = |f: StaffField| resolve_field(f, record, primary);
    CanonicalStaff {
        staff_id,
        account_id: field(StaffField::AccountId),
        name: field(StaffField::Name).unwrap_or_default(),
        username: field(StaffField::Username).unwrap_or_default(),
        phone: field(StaffField::Phone).unwrap_or_default(),
        email: field(StaffField::Email).unwrap_or_default(),
        current_station_id: field(StaffField::CurrentStationId).and_then(StationId::new),
        station_staff_id: field(StaffField::StationStaffId),
    }
}

fn unresolved(index: usize, record: &Record<'_>) -> UnresolvedStaff {
    let assignments = assignment_records(record);
    let primary = primary_assignment(&assignments);
    let field = |f: StaffField| resolve_field(f, record, primary.as_ref());
    UnresolvedStaff {
        index,
        account_id: field(StaffField::AccountId),
        name: field(StaffField::Name).unwrap_or_default(),
        username: field(StaffField::Username).unwrap_or_default(),
        email: field(StaffField::Email).unwrap_or_default(),
        phone: field(StaffField::Phone).unwrap_or_default(),
    }
}

/// Normalize a staff list, keeping unresolved records aside
///
/// Output order follows input order. When two records resolve to the same
/// staff id, the first one wins.
#[must_use]
pub fn normalize_staff_report(records: &RecordSet) -> NormalizationReport {
    let mut report = NormalizationReport::default();
    let mut seen: HashSet<StaffId> = HashSet::new();

    for (index, record) in records.records().enumerate() {
        match normalize_record(&record) {
            Some(staff) if seen.insert(staff.staff_id.clone()) => report.staff.push(staff),
            Some(staff) => {
                tracing::debug!("Dropping duplicate staff record for {}", staff.staff_id);
                report.duplicates += 1;
            }
            None => {
                tracing::debug!("No staff id reachable from record #{}", index);
                report.unresolved.push(unresolved(index, &record));
            }
        }
    }

    if !report.unresolved.is_empty() {
        tracing::debug!(
            "Normalized {} staff, {} unresolved",
            report.staff.len(),
            report.unresolved.len()
        );
    }
    report
}

/// Normalize a staff list into canonical, mutation-eligible records
#[must_use]
pub fn normalize_staff(records: &RecordSet) -> Vec<CanonicalStaff> {
    normalize_staff_report(records).staff
}

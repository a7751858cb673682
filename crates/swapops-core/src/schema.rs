//! Staff schema mapping
//!
//! Staff records differ by endpoint and API version. Instead of guessing at
//! call sites, every canonical field has an ordered list of candidate paths
//! evaluated in fixed priority order; the first non-empty value wins.
//!
//! The tables are plain data so they can be audited and tested entry by
//! entry. They are deliberately fixed to the staff/station/slot/battery
//! shapes this console consumes.

use crate::record::Record;

/// Keys that directly carry a canonical staff id
pub const STAFF_ID_KEYS: &[&str] = &["staffId", "staff_id", "staffID"];

/// Keys holding the embedded array of assignment sub-records
pub const ASSIGNMENT_LIST_KEYS: &[&str] =
    &["assignments", "stationStaffs", "staffStations", "station_staffs"];

/// Keys holding a single "primary assignment" shortcut object
pub const PRIMARY_ASSIGNMENT_KEYS: &[&str] = &["primaryAssignment", "stationStaff"];

/// Edge followed by the identity resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Every object element of the array under this key
    Each(&'static str),
    /// Object under this key
    Embedded(&'static str),
    /// Object reached through a chain of embedded objects
    Path(&'static [&'static str]),
}

/// Resolver traversal order; enqueued in this order at every node
pub const TRAVERSAL: &[Relation] = &[
    Relation::Each("assignments"),
    Relation::Each("stationStaffs"),
    Relation::Each("staffStations"),
    Relation::Each("station_staffs"),
    Relation::Embedded("staff"),
    Relation::Embedded("account"),
    Relation::Embedded("staffRef"),
    Relation::Embedded("accountRef"),
    Relation::Path(&["staff", "account"]),
    Relation::Embedded("primaryAssignment"),
    Relation::Embedded("stationStaff"),
];

impl Relation {
    /// Records this relation reaches from `record`, in order
    #[must_use]
    pub fn targets<'a>(&self, record: &Record<'a>) -> Vec<Record<'a>> {
        match self {
            Self::Each(key) => record.objects(key),
            Self::Embedded(key) => record.object(key).into_iter().collect(),
            Self::Path(segments) => record.object_at(segments).into_iter().collect(),
        }
    }
}

/// Canonical staff fields resolved through alias tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaffField {
    AccountId,
    Name,
    Username,
    Email,
    Phone,
    CurrentStationId,
    StationStaffId,
}

/// Starting point of a field path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    /// The raw staff record itself
    Record,
    /// The selected primary assignment sub-record
    PrimaryAssignment,
}

/// One candidate location for a canonical field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath {
    pub root: PathRoot,
    pub segments: &'static [&'static str],
}

const fn at(segments: &'static [&'static str]) -> FieldPath {
    FieldPath {
        root: PathRoot::Record,
        segments,
    }
}

const fn primary(segments: &'static [&'static str]) -> FieldPath {
    FieldPath {
        root: PathRoot::PrimaryAssignment,
        segments,
    }
}

/// Ordered candidate paths for one canonical field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: StaffField,
    pub paths: &'static [FieldPath],
}

/// Staff mapping: record key, embedded staff, embedded account, alternates
pub const STAFF_FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: StaffField::AccountId,
        paths: &[
            at(&["accountId"]),
            at(&["staff", "accountId"]),
            at(&["account", "accountId"]),
            at(&["account", "id"]),
            at(&["staff", "account", "id"]),
            primary(&["accountId"]),
        ],
    },
    FieldRule {
        field: StaffField::Name,
        paths: &[
            at(&["name"]),
            at(&["staff", "name"]),
            at(&["account", "name"]),
            at(&["fullName"]),
            at(&["staff", "fullName"]),
            at(&["account", "fullName"]),
            at(&["displayName"]),
        ],
    },
    FieldRule {
        field: StaffField::Username,
        paths: &[
            at(&["username"]),
            at(&["staff", "username"]),
            at(&["account", "username"]),
            at(&["userName"]),
            at(&["account", "userName"]),
        ],
    },
    FieldRule {
        field: StaffField::Email,
        paths: &[
            at(&["email"]),
            at(&["staff", "email"]),
            at(&["account", "email"]),
            at(&["mail"]),
        ],
    },
    FieldRule {
        field: StaffField::Phone,
        paths: &[
            at(&["phone"]),
            at(&["staff", "phone"]),
            at(&["account", "phone"]),
            at(&["phoneNumber"]),
            at(&["account", "phoneNumber"]),
            at(&["mobile"]),
        ],
    },
    FieldRule {
        field: StaffField::CurrentStationId,
        paths: &[
            primary(&["stationId"]),
            primary(&["station", "stationId"]),
            primary(&["station", "id"]),
            at(&["staff", "stationId"]),
            at(&["account", "stationId"]),
            at(&["currentStationId"]),
            at(&["stationId"]),
        ],
    },
    FieldRule {
        field: StaffField::StationStaffId,
        paths: &[
            primary(&["stationStaffId"]),
            primary(&["id"]),
            at(&["stationStaffId"]),
        ],
    },
];

/// Rule for a field
#[must_use]
pub fn rule(field: StaffField) -> Option<&'static FieldRule> {
    STAFF_FIELD_RULES.iter().find(|r| r.field == field)
}

/// Directly carried staff id, without traversal
#[must_use]
pub fn direct_staff_id(record: &Record<'_>) -> Option<String> {
    STAFF_ID_KEYS.iter().find_map(|key| record.text(key))
}

/// Evaluate a field rule against a record and its primary assignment
#[must_use]
pub fn resolve_field(
    field: StaffField,
    record: &Record<'_>,
    primary_assignment: Option<&Record<'_>>,
) -> Option<String> {
    rule(field)?.paths.iter().find_map(|path| match path.root {
        PathRoot::Record => record.text_at(path.segments),
        PathRoot::PrimaryAssignment => primary_assignment?.text_at(path.segments),
    })
}

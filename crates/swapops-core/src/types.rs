//! Core types for SwapOps
//!
//! Defines the canonical shapes the reconciliation core works with:
//! - String-normalised identifiers (staff, station, battery)
//! - Canonical staff records
//! - Station summaries with their assignment stubs
//! - Station detail, slots and battery references
//!
//! Collaborator payloads are loosely typed; every id field here accepts a
//! JSON string or number and is trimmed on the way in.

use crate::record::number_to_text;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Id as it may appear on the wire
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => number_to_text(&n),
        }
    }
}

/// Identifier types constructible from trimmed, non-empty text
pub trait TextId: Sized {
    /// Build from raw text; `None` when blank
    fn from_text(raw: &str) -> Option<Self>;
}

/// Deserialize an optional id, mapping null and blank values to `None`
pub(crate) fn lenient_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TextId,
{
    let raw = Option::<RawId>::deserialize(deserializer)?;
    Ok(raw.and_then(|r| T::from_text(&r.into_text())))
}

/// Deserialize text that may arrive as a number; null becomes empty
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawId>::deserialize(deserializer)?;
    Ok(raw.map(RawId::into_text).unwrap_or_default())
}

/// Finite number from a JSON number or numeric string
fn number_of(value: &serde_json::Value) -> Option<f64> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Integer from a JSON integer, integral float or numeric string
fn integer_of(value: &serde_json::Value) -> Option<i32> {
    let exact = value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<i64>().ok()));
    if let Some(i) = exact {
        return i32::try_from(i).ok();
    }

    let f = number_of(value)?;
    if f.fract() != 0.0 || f < f64::from(i32::MIN) || f > f64::from(i32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let i = f as i32;
    Some(i)
}

/// Deserialize an optional integer; anything unusable becomes `None`
fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(integer_of))
}

/// Deserialize an optional number; anything unusable becomes `None`
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(number_of))
}

macro_rules! text_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from raw text; `None` when blank after trimming
            #[inline]
            #[must_use]
            pub fn new(raw: impl AsRef<str>) -> Option<Self> {
                let trimmed = raw.as_ref().trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Self(trimmed.to_string()))
                }
            }

            /// Borrow the id text
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TextId for $name {
            fn from_text(raw: &str) -> Option<Self> {
                Self::new(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = RawId::deserialize(deserializer)?.into_text();
                Self::new(raw).ok_or_else(|| de::Error::custom(concat!("empty ", $label)))
            }
        }
    };
}

text_id!(
    /// Canonical staff identifier, the only id accepted by assignment mutations
    StaffId,
    "staff id"
);
text_id!(
    /// Station identifier
    StationId,
    "station id"
);
text_id!(
    /// Battery identifier
    BatteryId,
    "battery id"
);

/// Staff record after normalization
///
/// Display fields are empty strings when no alias produced a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalStaff {
    pub staff_id: StaffId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_station_id: Option<StationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_staff_id: Option<String>,
}

impl CanonicalStaff {
    /// Create with only the id set
    #[must_use]
    pub fn new(staff_id: StaffId) -> Self {
        Self {
            staff_id,
            account_id: None,
            name: String::new(),
            username: String::new(),
            phone: String::new(),
            email: String::new(),
            current_station_id: None,
            station_staff_id: None,
        }
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// With current station
    #[inline]
    #[must_use]
    pub fn with_station(mut self, station: StationId) -> Self {
        self.current_station_id = Some(station);
        self
    }

    /// Whether the staff member holds any station assignment
    #[inline]
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.current_station_id.is_some()
    }

    /// Case-insensitive substring match over name, username, email and phone
    ///
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn matches_search(&self, needle: &str) -> bool {
        [&self.name, &self.username, &self.email, &self.phone]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }

    /// Re-wrap as a raw collaborator record
    #[must_use]
    pub fn to_raw(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("staffId".into(), self.staff_id.as_str().into());
        if let Some(account) = &self.account_id {
            map.insert("accountId".into(), account.as_str().into());
        }
        map.insert("name".into(), self.name.as_str().into());
        map.insert("username".into(), self.username.as_str().into());
        map.insert("phone".into(), self.phone.as_str().into());
        map.insert("email".into(), self.email.as_str().into());
        if let Some(station) = &self.current_station_id {
            map.insert("currentStationId".into(), station.as_str().into());
        }
        if let Some(link) = &self.station_staff_id {
            map.insert("stationStaffId".into(), link.as_str().into());
        }
        serde_json::Value::Object(map)
    }
}

/// Station operating status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StationStatus {
    Active,
    Inactive,
    Maintenance,
    /// Anything the backend sends that is not recognised
    #[default]
    Unknown,
}

impl StationStatus {
    /// Parse case-insensitively; unrecognised values map to `Unknown`
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" | "online" | "enabled" => Self::Active,
            "inactive" | "offline" | "disabled" => Self::Inactive,
            "maintenance" => Self::Maintenance,
            _ => Self::Unknown,
        }
    }

    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Maintenance => "MAINTENANCE",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Status a toggle switch moves to
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Inactive,
            _ => Self::Active,
        }
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Unknown, Self::parse))
    }
}

/// Minimal assignment entry embedded in a station summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentStub {
    #[serde(default, deserialize_with = "lenient_id")]
    pub staff_id: Option<StaffId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub station_id: Option<StationId>,
}

impl AssignmentStub {
    /// Create stub
    #[must_use]
    pub fn new(staff_id: StaffId, station_id: StationId) -> Self {
        Self {
            staff_id: Some(staff_id),
            station_id: Some(station_id),
        }
    }
}

/// Entry of the station list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSummary {
    #[serde(alias = "id")]
    pub station_id: StationId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default)]
    pub status: StationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, alias = "stationStaffs", alias = "staffs")]
    pub assignments: Vec<AssignmentStub>,
}

impl StationSummary {
    /// Create summary without assignments
    #[must_use]
    pub fn new(station_id: StationId, name: impl Into<String>) -> Self {
        Self {
            station_id,
            name: name.into(),
            status: StationStatus::Unknown,
            address: None,
            assignments: Vec::new(),
        }
    }

    /// Number of distinct staff assigned to this station
    ///
    /// Stubs naming another station are ignored; stubs without a station
    /// are taken to belong to this one.
    #[must_use]
    pub fn staff_count(&self) -> usize {
        let mut seen: Vec<&StaffId> = Vec::new();
        for stub in &self.assignments {
            let here = stub
                .station_id
                .as_ref()
                .map_or(true, |s| *s == self.station_id);
            if let (true, Some(staff)) = (here, stub.staff_id.as_ref()) {
                if !seen.contains(&staff) {
                    seen.push(staff);
                }
            }
        }
        seen.len()
    }
}

/// Battery held by a slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryRef {
    #[serde(alias = "id")]
    pub battery_id: BatteryId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub capacity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub quality: Option<f64>,
}

impl BatteryRef {
    /// Create battery reference with only the id set
    #[must_use]
    pub fn new(battery_id: BatteryId) -> Self {
        Self {
            battery_id,
            name: String::new(),
            status: String::new(),
            capacity: None,
            quality: None,
        }
    }
}

/// Physical slot of a station
///
/// Coordinates are 1-based; values outside the grid window are kept as-is
/// and simply never projected. A coordinate that is missing or not an
/// integer decodes to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(default, alias = "id", deserialize_with = "lenient_text")]
    pub slot_id: String,
    #[serde(default, alias = "x", deserialize_with = "lenient_integer")]
    pub coordinate_x: Option<i32>,
    #[serde(default, alias = "y", deserialize_with = "lenient_integer")]
    pub coordinate_y: Option<i32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: String,
    #[serde(default)]
    pub battery: Option<BatteryRef>,
}

impl Slot {
    /// Create slot at coordinates
    #[must_use]
    pub fn new(slot_id: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            slot_id: slot_id.into(),
            coordinate_x: Some(x),
            coordinate_y: Some(y),
            status: String::new(),
            battery: None,
        }
    }

    /// With battery
    #[inline]
    #[must_use]
    pub fn with_battery(mut self, battery: BatteryRef) -> Self {
        self.battery = Some(battery);
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// A slot is occupied exactly when it holds a battery
    #[inline]
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.battery.is_some()
    }
}

/// Station detail view payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDetail {
    #[serde(alias = "id")]
    pub station_id: StationId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default)]
    pub status: StationStatus,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl StationDetail {
    /// Create empty detail
    #[must_use]
    pub fn new(station_id: StationId) -> Self {
        Self {
            station_id,
            name: String::new(),
            status: StationStatus::Unknown,
            slots: Vec::new(),
        }
    }

    /// Empty every slot holding `battery`; returns whether one was found
    pub fn detach_battery(&mut self, battery: &BatteryId) -> bool {
        let mut found = false;
        for slot in &mut self.slots {
            if slot.battery.as_ref().is_some_and(|b| b.battery_id == *battery) {
                slot.battery = None;
                slot.status = crate::grid::EMPTY_STATUS.to_string();
                found = true;
            }
        }
        found
    }
}

/// Battery exchange history entry; only counted, never reconciled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, alias = "id", deserialize_with = "lenient_text")]
    pub entry_id: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn station(id: &str) -> StationId {
        StationId::new(id).unwrap()
    }

    fn staff(id: &str) -> StaffId {
        StaffId::new(id).unwrap()
    }

    #[test]
    fn ids_are_trimmed_and_reject_blank() {
        assert_eq!(StaffId::new("  S1 ").unwrap().as_str(), "S1");
        assert!(StaffId::new("   ").is_none());
        assert!(StationId::new("").is_none());
    }

    #[test]
    fn ids_deserialize_from_numbers() {
        let id: StationId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(id.as_str(), "42");

        let blank: Result<StaffId, _> = serde_json::from_value(json!(" "));
        assert!(blank.is_err());
    }

    #[test]
    fn station_status_is_string_tolerant() {
        let s: StationStatus = serde_json::from_value(json!("active")).unwrap();
        assert_eq!(s, StationStatus::Active);
        let s: StationStatus = serde_json::from_value(json!("Offline")).unwrap();
        assert_eq!(s, StationStatus::Inactive);
        let s: StationStatus = serde_json::from_value(json!("weird")).unwrap();
        assert_eq!(s, StationStatus::Unknown);
        let s: StationStatus = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(s, StationStatus::Unknown);

        assert_eq!(StationStatus::Active.toggled(), StationStatus::Inactive);
        assert_eq!(StationStatus::Maintenance.toggled(), StationStatus::Active);
        assert_eq!(serde_json::to_value(StationStatus::Inactive).unwrap(), json!("INACTIVE"));
    }

    #[test]
    fn summary_counts_distinct_staff_at_own_station() {
        let summary: StationSummary = serde_json::from_value(json!({
            "id": "ST1",
            "name": "North",
            "stationStaffs": [
                {"staffId": "S1", "stationId": "ST1"},
                {"staffId": "S1", "stationId": "ST1"},
                {"staffId": 2},
                {"staffId": "S3", "stationId": "ST2"},
                {"staffId": "", "stationId": "ST1"}
            ]
        }))
        .unwrap();

        assert_eq!(summary.station_id, station("ST1"));
        assert_eq!(summary.staff_count(), 2);
    }

    #[test]
    fn slot_accepts_numeric_ids_and_null_battery() {
        let slot: Slot = serde_json::from_value(json!({
            "id": 7,
            "coordinateX": 2,
            "coordinateY": 3,
            "status": "Charging",
            "battery": null
        }))
        .unwrap();
        assert_eq!(slot.slot_id, "7");
        assert!(!slot.is_occupied());

        let slot: Slot = serde_json::from_value(json!({
            "slotId": "A",
            "coordinateX": 1,
            "coordinateY": 1,
            "battery": {"id": 99, "name": "B-99", "capacity": 80.5}
        }))
        .unwrap();
        assert!(slot.is_occupied());
        assert_eq!(slot.battery.unwrap().battery_id.as_str(), "99");
    }

    #[test]
    fn malformed_coordinates_decode_to_none() {
        let detail: StationDetail = serde_json::from_value(json!({
            "stationId": "ST1",
            "slots": [
                {"slotId": "a", "coordinateX": 1, "coordinateY": 1, "battery": {"batteryId": "B1"}},
                {"slotId": "b", "coordinateX": null, "coordinateY": 2, "battery": {"batteryId": "B2"}},
                {"slotId": "c", "coordinateY": 3, "battery": {"batteryId": "B3"}},
                {"slotId": "d", "coordinateX": "2", "coordinateY": 4.0},
                {"slotId": "e", "coordinateX": "two", "coordinateY": 1.5},
                {"slotId": "f", "coordinateX": 9_999_999_999_i64, "coordinateY": [1]}
            ]
        }))
        .unwrap();

        let coords: Vec<_> = detail
            .slots
            .iter()
            .map(|s| (s.coordinate_x, s.coordinate_y))
            .collect();
        assert_eq!(
            coords,
            vec![
                (Some(1), Some(1)),
                (None, Some(2)),
                (None, Some(3)),
                (Some(2), Some(4)),
                (None, None),
                (None, None),
            ]
        );
        assert_eq!(detail.slots.iter().filter(|s| s.is_occupied()).count(), 3);
    }

    #[test]
    fn battery_metrics_are_tolerant() {
        let battery: BatteryRef = serde_json::from_value(json!({
            "batteryId": "B1",
            "capacity": "72.5",
            "quality": "n/a"
        }))
        .unwrap();
        assert_eq!(battery.capacity, Some(72.5));
        assert_eq!(battery.quality, None);

        let battery: BatteryRef =
            serde_json::from_value(json!({"batteryId": "B2", "capacity": null, "quality": 90}))
                .unwrap();
        assert_eq!(battery.capacity, None);
        assert_eq!(battery.quality, Some(90.0));
    }

    #[test]
    fn detach_battery_empties_holding_slot() {
        let battery = BatteryRef::new(BatteryId::new("B1").unwrap());
        let mut detail = StationDetail::new(station("ST1"));
        detail.slots.push(Slot::new("1", 1, 1).with_battery(battery).with_status("Full"));
        detail.slots.push(Slot::new("2", 2, 1));

        assert!(detail.detach_battery(&BatteryId::new("B1").unwrap()));
        assert!(!detail.slots[0].is_occupied());
        assert_eq!(detail.slots[0].status, "Empty");
        assert!(!detail.detach_battery(&BatteryId::new("B1").unwrap()));
    }

    #[test]
    fn canonical_staff_search_and_raw() {
        let mut member = CanonicalStaff::new(staff("S1")).with_name("Alice Chan");
        member.email = "alice@example.com".into();
        assert!(member.matches_search("chan"));
        assert!(member.matches_search("example"));
        assert!(!member.matches_search("bob"));

        let raw = member.to_raw();
        assert_eq!(raw["staffId"], json!("S1"));
        assert!(raw.get("currentStationId").is_none());
    }

    #[test]
    fn history_entry_keeps_unknown_fields() {
        let entry: HistoryEntry =
            serde_json::from_value(json!({"id": 5, "batteryIn": "B1"})).unwrap();
        assert_eq!(entry.entry_id, "5");
        assert_eq!(entry.fields["batteryIn"], json!("B1"));
    }
}

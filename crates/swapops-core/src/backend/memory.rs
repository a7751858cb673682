//! In-memory station backend
//!
//! Serves a [`BackendSnapshot`] loaded from JSON and applies mutations to it
//! so that subsequent reads stay consistent. Used by the console binary for
//! offline inspection and by tests.

use super::StationBackend;
use crate::error::BackendError;
use crate::normalize::normalize_staff;
use crate::record::RecordSet;
use crate::schema::{ASSIGNMENT_LIST_KEYS, PRIMARY_ASSIGNMENT_KEYS};
use crate::types::{
    AssignmentStub, BatteryId, CanonicalStaff, HistoryEntry, StaffId, StationDetail, StationId,
    StationStatus, StationSummary,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Backend state as a JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSnapshot {
    /// Raw staff records, any supported shape
    pub staff: Vec<Value>,
    pub stations: Vec<StationSummary>,
    pub details: Vec<StationDetail>,
    /// Exchange history keyed by station id
    pub history: BTreeMap<String, Vec<HistoryEntry>>,
}

impl BackendSnapshot {
    /// Parse from JSON text
    ///
    /// # Errors
    /// `BackendError::Decode` when the document does not match the schema
    pub fn from_json_str(text: &str) -> Result<Self, BackendError> {
        serde_json::from_str(text).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Normalize a single raw staff value
fn canonical(raw: &Value) -> Option<CanonicalStaff> {
    let set = RecordSet::from_json(raw).ok()?;
    normalize_staff(&set).into_iter().next()
}

/// Strip every station reference from a raw staff record
fn clear_station_refs(map: &mut serde_json::Map<String, Value>) {
    for key in ASSIGNMENT_LIST_KEYS.iter().chain(PRIMARY_ASSIGNMENT_KEYS) {
        map.remove(*key);
    }
    map.remove("currentStationId");
    map.remove("stationId");
    for nested in ["staff", "account"] {
        if let Some(Value::Object(inner)) = map.get_mut(nested) {
            inner.remove("stationId");
        }
    }
}

/// In-memory implementation of [`StationBackend`]
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: RwLock<BackendSnapshot>,
}

impl InMemoryBackend {
    /// Create backend serving `snapshot`
    #[inline]
    #[must_use]
    pub fn new(snapshot: BackendSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> BackendSnapshot {
        self.state.read().clone()
    }

    fn staff_index(
        state: &BackendSnapshot,
        staff: &StaffId,
    ) -> Result<(usize, CanonicalStaff), BackendError> {
        state
            .staff
            .iter()
            .enumerate()
            .find_map(|(idx, raw)| {
                canonical(raw)
                    .filter(|c| c.staff_id == *staff)
                    .map(|c| (idx, c))
            })
            .ok_or_else(|| BackendError::not_found("staff", staff.as_str()))
    }

    fn summary_mut<'a>(
        state: &'a mut BackendSnapshot,
        station: &StationId,
    ) -> Result<&'a mut StationSummary, BackendError> {
        state
            .stations
            .iter_mut()
            .find(|s| s.station_id == *station)
            .ok_or_else(|| BackendError::not_found("station", station.as_str()))
    }
}

#[async_trait]
impl StationBackend for InMemoryBackend {
    async fn list_all_staff(&self) -> Result<RecordSet, BackendError> {
        let raw = Value::Array(self.state.read().staff.clone());
        Ok(RecordSet::from_json(&raw)?)
    }

    async fn list_staff_by_station(&self, station: &StationId) -> Result<RecordSet, BackendError> {
        let state = self.state.read();
        if !state.stations.iter().any(|s| s.station_id == *station) {
            return Err(BackendError::not_found("station", station.as_str()));
        }
        let assigned: Vec<Value> = state
            .staff
            .iter()
            .filter(|raw| {
                canonical(raw).is_some_and(|c| c.current_station_id.as_ref() == Some(station))
            })
            .cloned()
            .collect();
        Ok(RecordSet::from_json(&Value::Array(assigned))?)
    }

    async fn add_staff_to_station(
        &self,
        staff: &StaffId,
        station: &StationId,
    ) -> Result<(), BackendError> {
        let mut state = self.state.write();
        Self::summary_mut(&mut state, station)?;
        let (idx, current) = Self::staff_index(&state, staff)?;
        if let Some(other) = current.current_station_id {
            return Err(BackendError::Rejected(format!(
                "staff {staff} is already assigned to station {other}"
            )));
        }

        if let Value::Object(map) = &mut state.staff[idx] {
            clear_station_refs(map);
            map.insert("staffId".into(), json!(staff.as_str()));
            map.insert(
                "assignments".into(),
                json!([{"staffId": staff.as_str(), "stationId": station.as_str()}]),
            );
        }
        Self::summary_mut(&mut state, station)?
            .assignments
            .push(AssignmentStub::new(staff.clone(), station.clone()));
        Ok(())
    }

    async fn remove_staff_from_station(
        &self,
        staff: &StaffId,
        station: &StationId,
    ) -> Result<(), BackendError> {
        let mut state = self.state.write();
        Self::summary_mut(&mut state, station)?;
        let (idx, current) = Self::staff_index(&state, staff)?;
        if current.current_station_id.as_ref() != Some(station) {
            return Err(BackendError::Rejected(format!(
                "staff {staff} is not assigned to station {station}"
            )));
        }

        if let Value::Object(map) = &mut state.staff[idx] {
            clear_station_refs(map);
            map.insert("staffId".into(), json!(staff.as_str()));
        }
        Self::summary_mut(&mut state, station)?
            .assignments
            .retain(|stub| stub.staff_id.as_ref() != Some(staff));
        Ok(())
    }

    async fn list_stations(&self) -> Result<Vec<StationSummary>, BackendError> {
        Ok(self.state.read().stations.clone())
    }

    async fn get_station_detail(&self, station: &StationId) -> Result<StationDetail, BackendError> {
        self.state
            .read()
            .details
            .iter()
            .find(|d| d.station_id == *station)
            .cloned()
            .ok_or_else(|| BackendError::not_found("station", station.as_str()))
    }

    async fn remove_battery_from_station(&self, battery: &BatteryId) -> Result<(), BackendError> {
        let mut state = self.state.write();
        let mut found = false;
        for detail in &mut state.details {
            found |= detail.detach_battery(battery);
        }
        if found {
            Ok(())
        } else {
            Err(BackendError::not_found("battery", battery.as_str()))
        }
    }

    async fn get_exchange_history(
        &self,
        station: &StationId,
    ) -> Result<Vec<HistoryEntry>, BackendError> {
        Ok(self
            .state
            .read()
            .history
            .get(station.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn update_station_status(
        &self,
        station: &StationId,
        status: StationStatus,
    ) -> Result<(), BackendError> {
        let mut state = self.state.write();
        let mut found = false;
        if let Some(summary) = state.stations.iter_mut().find(|s| s.station_id == *station) {
            summary.status = status;
            found = true;
        }
        if let Some(detail) = state.details.iter_mut().find(|d| d.station_id == *station) {
            detail.status = status;
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(BackendError::not_found("station", station.as_str()))
        }
    }
}

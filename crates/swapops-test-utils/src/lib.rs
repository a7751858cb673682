//! Testing utilities for SwapOps workspace
//!
//! Shared fixtures and a scripted backend wrapper that records calls and
//! injects failures.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use swapops_core::{
    AssignmentStub, BackendError, BackendSnapshot, BatteryId, BatteryRef, HistoryEntry, RecordSet,
    Slot, StaffId, StationBackend, StationDetail, StationId, StationStatus, StationSummary,
};

pub fn staff_id(id: &str) -> StaffId {
    StaffId::new(id).unwrap()
}

pub fn station_id(id: &str) -> StationId {
    StationId::new(id).unwrap()
}

pub fn battery_id(id: &str) -> BatteryId {
    BatteryId::new(id).unwrap()
}

/// Raw assignment sub-record
pub fn assignment_json(staff: &str, station: &str) -> Value {
    json!({"staffId": staff, "stationId": station})
}

/// Raw staff record; assigned staff carry one assignment sub-record
pub fn staff_json(id: &str, station: Option<&str>) -> Value {
    let mut record = json!({
        "staffId": id,
        "name": format!("Staff {id}"),
        "username": id.to_lowercase(),
        "email": format!("{}@swap.test", id.to_lowercase()),
    });
    if let Some(station) = station {
        record["assignments"] = json!([assignment_json(id, station)]);
    }
    record
}

pub fn battery(id: &str) -> BatteryRef {
    BatteryRef::new(battery_id(id))
}

pub fn slot(id: &str, x: i32, y: i32, battery_ref: Option<&str>) -> Slot {
    let slot = Slot::new(id, x, y).with_status("Idle");
    match battery_ref {
        Some(b) => slot.with_battery(battery(b)).with_status("Charging"),
        None => slot,
    }
}

pub fn station_summary(id: &str, name: &str, staff: &[&str]) -> StationSummary {
    let mut summary = StationSummary::new(station_id(id), name);
    summary.status = StationStatus::Active;
    summary.assignments = staff
        .iter()
        .map(|s| AssignmentStub::new(staff_id(s), station_id(id)))
        .collect();
    summary
}

pub fn station_detail(id: &str, slots: Vec<Slot>) -> StationDetail {
    let mut detail = StationDetail::new(station_id(id));
    detail.status = StationStatus::Active;
    detail.slots = slots;
    detail
}

pub fn history(count: usize) -> Vec<HistoryEntry> {
    (0..count)
        .map(|i| HistoryEntry {
            entry_id: format!("h{i}"),
            fields: serde_json::Map::new(),
        })
        .collect()
}

/// Two stations: S1 at ST1, S2 at ST2, S3 and S4 unassigned
///
/// ST1 holds batteries B1 and B2 plus an empty slot; ST2 holds B3.
pub fn snapshot_two_stations() -> BackendSnapshot {
    let mut morgan = staff_json("S4", None);
    morgan["name"] = json!("Morgan Reyes");

    BackendSnapshot {
        staff: vec![
            staff_json("S1", Some("ST1")),
            staff_json("S2", Some("ST2")),
            staff_json("S3", None),
            morgan,
        ],
        stations: vec![
            station_summary("ST1", "Riverside", &["S1"]),
            station_summary("ST2", "Hilltop", &["S2"]),
        ],
        details: vec![
            station_detail(
                "ST1",
                vec![
                    slot("1", 1, 1, Some("B1")),
                    slot("2", 2, 1, Some("B2")),
                    slot("3", 3, 1, None),
                ],
            ),
            station_detail("ST2", vec![slot("1", 1, 1, Some("B3"))]),
        ],
        history: BTreeMap::from([("ST1".to_string(), history(2))]),
    }
}

/// Backend operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    ListAllStaff,
    ListStaffByStation,
    AddStaff,
    RemoveStaff,
    ListStations,
    GetStationDetail,
    RemoveBattery,
    GetExchangeHistory,
    UpdateStationStatus,
}

/// One recorded backend call with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListAllStaff,
    ListStaffByStation(String),
    AddStaff { staff: String, station: String },
    RemoveStaff { staff: String, station: String },
    ListStations,
    GetStationDetail(String),
    RemoveBattery(String),
    GetExchangeHistory(String),
    UpdateStationStatus { station: String, status: StationStatus },
}

impl Call {
    pub fn kind(&self) -> CallKind {
        match self {
            Self::ListAllStaff => CallKind::ListAllStaff,
            Self::ListStaffByStation(_) => CallKind::ListStaffByStation,
            Self::AddStaff { .. } => CallKind::AddStaff,
            Self::RemoveStaff { .. } => CallKind::RemoveStaff,
            Self::ListStations => CallKind::ListStations,
            Self::GetStationDetail(_) => CallKind::GetStationDetail,
            Self::RemoveBattery(_) => CallKind::RemoveBattery,
            Self::GetExchangeHistory(_) => CallKind::GetExchangeHistory,
            Self::UpdateStationStatus { .. } => CallKind::UpdateStationStatus,
        }
    }
}

/// Wraps a backend, recording every call and failing on demand
#[derive(Debug)]
pub struct ScriptedBackend<B> {
    inner: B,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<CallKind, (usize, BackendError)>>,
}

impl<B> ScriptedBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Fail the next `times` calls of `kind` with `error`
    ///
    /// Failed calls are still recorded but never reach the wrapped backend.
    pub fn fail_next(&self, kind: CallKind, times: usize, error: BackendError) {
        let mut failures = self.failures.lock();
        if times == 0 {
            failures.remove(&kind);
        } else {
            failures.insert(kind, (times, error));
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn kinds(&self) -> Vec<CallKind> {
        self.calls.lock().iter().map(Call::kind).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: Call) -> Result<(), BackendError> {
        let kind = call.kind();
        self.calls.lock().push(call);

        let mut failures = self.failures.lock();
        let Some((remaining, error)) = failures.get_mut(&kind) else {
            return Ok(());
        };
        let error = error.clone();
        *remaining -= 1;
        if *remaining == 0 {
            failures.remove(&kind);
        }
        Err(error)
    }
}

#[async_trait]
impl<B: StationBackend> StationBackend for ScriptedBackend<B> {
    async fn list_all_staff(&self) -> Result<RecordSet, BackendError> {
        self.record(Call::ListAllStaff)?;
        self.inner.list_all_staff().await
    }

    async fn list_staff_by_station(&self, station: &StationId) -> Result<RecordSet, BackendError> {
        self.record(Call::ListStaffByStation(station.to_string()))?;
        self.inner.list_staff_by_station(station).await
    }

    async fn add_staff_to_station(
        &self,
        staff: &StaffId,
        station: &StationId,
    ) -> Result<(), BackendError> {
        self.record(Call::AddStaff {
            staff: staff.to_string(),
            station: station.to_string(),
        })?;
        self.inner.add_staff_to_station(staff, station).await
    }

    async fn remove_staff_from_station(
        &self,
        staff: &StaffId,
        station: &StationId,
    ) -> Result<(), BackendError> {
        self.record(Call::RemoveStaff {
            staff: staff.to_string(),
            station: station.to_string(),
        })?;
        self.inner.remove_staff_from_station(staff, station).await
    }

    async fn list_stations(&self) -> Result<Vec<StationSummary>, BackendError> {
        self.record(Call::ListStations)?;
        self.inner.list_stations().await
    }

    async fn get_station_detail(&self, station: &StationId) -> Result<StationDetail, BackendError> {
        self.record(Call::GetStationDetail(station.to_string()))?;
        self.inner.get_station_detail(station).await
    }

    async fn remove_battery_from_station(&self, battery: &BatteryId) -> Result<(), BackendError> {
        self.record(Call::RemoveBattery(battery.to_string()))?;
        self.inner.remove_battery_from_station(battery).await
    }

    async fn get_exchange_history(
        &self,
        station: &StationId,
    ) -> Result<Vec<HistoryEntry>, BackendError> {
        self.record(Call::GetExchangeHistory(station.to_string()))?;
        self.inner.get_exchange_history(station).await
    }

    async fn update_station_status(
        &self,
        station: &StationId,
        status: StationStatus,
    ) -> Result<(), BackendError> {
        self.record(Call::UpdateStationStatus {
            station: station.to_string(),
            status,
        })?;
        self.inner.update_station_status(station, status).await
    }
}

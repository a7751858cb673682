//! Collaborator boundary
//!
//! The reconciliation core talks to the station backend only through
//! [`StationBackend`]. Transport, authentication and pagination live on the
//! other side of this trait.

pub mod memory;

pub use memory::{BackendSnapshot, InMemoryBackend};

use crate::error::BackendError;
use crate::record::RecordSet;
use crate::types::{
    BatteryId, HistoryEntry, StaffId, StationDetail, StationId, StationStatus, StationSummary,
};
use async_trait::async_trait;

/// Station backend operations consumed by the core
///
/// Read operations return raw record sets where the payload shape varies by
/// endpoint; the core normalizes them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StationBackend: Send + Sync {
    /// Every staff record, in backend order
    async fn list_all_staff(&self) -> Result<RecordSet, BackendError>;

    /// Staff records currently assigned to `station`
    async fn list_staff_by_station(&self, station: &StationId) -> Result<RecordSet, BackendError>;

    /// Assign `staff` to `station`
    async fn add_staff_to_station(
        &self,
        staff: &StaffId,
        station: &StationId,
    ) -> Result<(), BackendError>;

    /// End the assignment of `staff` at `station`
    async fn remove_staff_from_station(
        &self,
        staff: &StaffId,
        station: &StationId,
    ) -> Result<(), BackendError>;

    /// Station summaries with embedded assignment stubs
    async fn list_stations(&self) -> Result<Vec<StationSummary>, BackendError>;

    /// Slot layout and status of one station
    async fn get_station_detail(&self, station: &StationId) -> Result<StationDetail, BackendError>;

    /// Detach a battery from whichever slot holds it
    async fn remove_battery_from_station(&self, battery: &BatteryId) -> Result<(), BackendError>;

    /// Battery exchange history of a station
    async fn get_exchange_history(
        &self,
        station: &StationId,
    ) -> Result<Vec<HistoryEntry>, BackendError>;

    /// Change the operating status of a station
    async fn update_station_status(
        &self,
        station: &StationId,
        status: StationStatus,
    ) -> Result<(), BackendError>;
}

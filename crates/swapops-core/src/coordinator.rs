//! Station status coordinator
//!
//! Sequences every console mutation as remote write, then summary refresh,
//! then detail refresh, each awaited before the next starts. State is kept
//! per station id and overwritten on every refresh, so responses that land
//! after the user moved on are still safe to apply.
//!
//! Status changes are confirm-then-apply. Battery removal follows
//! [`ConsistencyPolicy`] from the console configuration.

use crate::assignment::{
    compute_candidates, current_staff, filter_by_search, search_needle, station_roster,
    ExclusionSet, StationRoster,
};
use crate::backend::StationBackend;
use crate::config::{ConsistencyPolicy, ConsoleConfig};
use crate::error::{CoordinatorError, MutationKind, RefreshStage, ValidationError};
use crate::grid::{build_grid, StationGrid};
use crate::normalize::normalize_staff;
use crate::types::{
    BatteryId, CanonicalStaff, StaffId, StationDetail, StationId, StationStatus, StationSummary,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// Everything the console shows for one station
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationView {
    pub detail: StationDetail,
    pub grid: StationGrid,
    /// Normalized direct listing; empty when the listing failed
    pub staff: Vec<CanonicalStaff>,
    /// Exchange history length; zero when history failed
    pub exchange_count: usize,
}

impl StationView {
    /// Build view, projecting the grid from the detail's slots
    #[must_use]
    pub fn new(detail: StationDetail, staff: Vec<CanonicalStaff>, exchange_count: usize) -> Self {
        let grid = build_grid(&detail.slots);
        Self {
            detail,
            grid,
            staff,
            exchange_count,
        }
    }

    fn detach_battery(&mut self, battery: &BatteryId) -> bool {
        let detached = self.detail.detach_battery(battery);
        if detached {
            self.grid = build_grid(&self.detail.slots);
        }
        detached
    }
}

/// Refreshed data returned by every successful mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRefresh {
    pub summaries: Vec<StationSummary>,
    pub view: Option<StationView>,
}

/// Orchestrates mutations and the re-fetches that follow them
pub struct StationStatusCoordinator<B: ?Sized> {
    backend: Arc<B>,
    config: ConsoleConfig,
    summaries: RwLock<Vec<StationSummary>>,
    views: DashMap<StationId, StationView>,
}

impl<B: StationBackend + ?Sized> StationStatusCoordinator<B> {
    /// Create coordinator with empty state
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<B>, config: ConsoleConfig) -> Self {
        Self {
            backend,
            config,
            summaries: RwLock::new(Vec::new()),
            views: DashMap::new(),
        }
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Current station summaries
    #[must_use]
    pub fn summaries(&self) -> Vec<StationSummary> {
        self.summaries.read().clone()
    }

    /// Current view of `station`, if it has been loaded
    #[must_use]
    pub fn view(&self, station: &StationId) -> Option<StationView> {
        self.views.get(station).map(|v| v.value().clone())
    }

    /// Re-fetch the summary list
    ///
    /// # Errors
    /// `CoordinatorError::Refresh` at the summaries stage; state is untouched
    pub async fn load_overview(&self) -> Result<Vec<StationSummary>, CoordinatorError> {
        let summaries = self
            .backend
            .list_stations()
            .await
            .map_err(|e| CoordinatorError::refresh(RefreshStage::Summaries, None, e))?;

        tracing::debug!("Loaded {} station summaries", summaries.len());
        *self.summaries.write() = summaries.clone();
        Ok(summaries)
    }

    /// Re-fetch detail, staff listing and history count of one station
    ///
    /// The three reads run concurrently. Only the detail is required; the
    /// other two degrade to empty.
    ///
    /// # Errors
    /// `CoordinatorError::Refresh` at the detail stage; the cached view is kept
    pub async fn load_station(&self, station: &StationId) -> Result<StationView, CoordinatorError> {
        let (detail, listing, history) = futures::join!(
            self.backend.get_station_detail(station),
            self.backend.list_staff_by_station(station),
            self.backend.get_exchange_history(station),
        );

        let detail = detail.map_err(|e| {
            CoordinatorError::refresh(RefreshStage::Detail, Some(station.as_str()), e)
        })?;
        let exchange_count = match history {
            Ok(entries) => entries.len(),
            Err(err) => {
                tracing::warn!("Exchange history of {} unavailable: {}", station, err);
                0
            }
        };

        let view = StationView::new(detail, current_staff(listing), exchange_count);
        self.views.insert(station.clone(), view.clone());
        Ok(view)
    }

    /// Staff that may be added to `station`, optionally searched
    ///
    /// `extra` is merged with the station's direct listing. Both reads
    /// degrade to empty, so this never fails.
    pub async fn candidates(
        &self,
        station: Option<&StationId>,
        extra: &ExclusionSet,
        search: Option<&str>,
    ) -> Vec<CanonicalStaff> {
        let all = self.all_staff().await;
        let mut exclusions = match station {
            Some(station) => ExclusionSet::from_staff(&current_staff(
                self.backend.list_staff_by_station(station).await,
            )),
            None => ExclusionSet::new(),
        };
        exclusions.merge(extra);

        let needle = search_needle(search, self.config.search_min_chars);
        let candidates = filter_by_search(
            compute_candidates(&all, station, &exclusions),
            needle.as_deref(),
        );
        tracing::debug!(
            "{} candidates out of {} staff ({} excluded)",
            candidates.len(),
            all.len(),
            exclusions.len()
        );
        candidates
    }

    /// Staff assigned to `station` and to other stations, kept apart
    pub async fn roster(&self, station: &StationId) -> StationRoster {
        let (all, listing) = futures::join!(
            self.all_staff(),
            self.backend.list_staff_by_station(station),
        );
        station_roster(&all, station, &current_staff(listing))
    }

    /// Assign a staff member to a station
    ///
    /// # Errors
    /// - `CoordinatorError::Validation` without a staff or station id
    /// - `CoordinatorError::Mutation` when the backend rejects the write
    /// - `CoordinatorError::Refresh` when the write went through but a re-fetch failed
    pub async fn add_staff(
        &self,
        staff: Option<&StaffId>,
        station: Option<&StationId>,
    ) -> Result<StationRefresh, CoordinatorError> {
        let (staff, station) = require_staff_target(staff, station)?;
        tracing::info!("Adding staff {} to station {}", staff, station);

        self.backend
            .add_staff_to_station(staff, station)
            .await
            .map_err(|e| CoordinatorError::mutation(MutationKind::AddStaff, e))?;
        self.refresh_after_staff_change(station).await
    }

    /// End a staff member's assignment at a station
    ///
    /// # Errors
    /// Same as [`Self::add_staff`]
    pub async fn remove_staff(
        &self,
        staff: Option<&StaffId>,
        station: Option<&StationId>,
    ) -> Result<StationRefresh, CoordinatorError> {
        let (staff, station) = require_staff_target(staff, station)?;
        tracing::info!("Removing staff {} from station {}", staff, station);

        self.backend
            .remove_staff_from_station(staff, station)
            .await
            .map_err(|e| CoordinatorError::mutation(MutationKind::RemoveStaff, e))?;
        self.refresh_after_staff_change(station).await
    }

    /// Change station status, applied locally only once the backend confirms
    ///
    /// # Errors
    /// - `CoordinatorError::Validation` without a station id
    /// - `CoordinatorError::Mutation` when the write fails; local state is unchanged
    pub async fn set_status(
        &self,
        station: Option<&StationId>,
        status: StationStatus,
    ) -> Result<StationRefresh, CoordinatorError> {
        let station = station.ok_or(ValidationError::MissingStationId)?;
        tracing::info!("Setting station {} to {}", station, status.as_str());

        self.backend
            .update_station_status(station, status)
            .await
            .map_err(|e| CoordinatorError::mutation(MutationKind::SetStatus, e))?;

        for summary in self
            .summaries
            .write()
            .iter_mut()
            .filter(|s| s.station_id == *station)
        {
            summary.status = status;
        }
        if let Some(mut view) = self.views.get_mut(station) {
            view.detail.status = status;
        }

        Ok(StationRefresh {
            summaries: self.summaries(),
            view: self.view(station),
        })
    }

    /// Detach a battery, then re-fetch the station detail
    ///
    /// Under confirm-then-apply the cached view is patched only after the
    /// backend succeeds. Under apply-then-reconcile it is patched first; on
    /// failure the detail is re-fetched at once, and if that also fails the
    /// pre-patch view is restored.
    ///
    /// # Errors
    /// - `CoordinatorError::Validation` without a station or battery id
    /// - `CoordinatorError::Mutation` when the removal fails
    /// - `CoordinatorError::Refresh` when the removal went through but the re-fetch failed
    pub async fn remove_battery(
        &self,
        station: Option<&StationId>,
        battery: Option<&BatteryId>,
    ) -> Result<StationRefresh, CoordinatorError> {
        let station = station.ok_or(ValidationError::MissingStationId)?;
        let battery = battery.ok_or(ValidationError::MissingBatteryId)?;
        tracing::info!(
            "Removing battery {} at station {} ({:?})",
            battery,
            station,
            self.config.battery_removal
        );

        match self.config.battery_removal {
            ConsistencyPolicy::ConfirmThenApply => {
                self.backend
                    .remove_battery_from_station(battery)
                    .await
                    .map_err(|e| CoordinatorError::mutation(MutationKind::RemoveBattery, e))?;
                self.patch_battery(station, battery);
            }
            ConsistencyPolicy::ApplyThenReconcile => {
                let before = self.view(station);
                self.patch_battery(station, battery);

                if let Err(err) = self.backend.remove_battery_from_station(battery).await {
                    if let Err(refetch) = self.load_station(station).await {
                        tracing::warn!(
                            "Reconciling {} after failed removal failed, restoring view: {}",
                            station,
                            refetch
                        );
                        match before {
                            Some(view) => {
                                self.views.insert(station.clone(), view);
                            }
                            None => {
                                self.views.remove(station);
                            }
                        }
                    }
                    return Err(CoordinatorError::mutation(MutationKind::RemoveBattery, err));
                }
            }
        }

        let view = self.load_station(station).await?;
        Ok(StationRefresh {
            summaries: self.summaries(),
            view: Some(view),
        })
    }

    async fn all_staff(&self) -> Vec<CanonicalStaff> {
        match self.backend.list_all_staff().await {
            Ok(records) => normalize_staff(&records),
            Err(err) => {
                tracing::warn!("Staff listing unavailable, treating as empty: {}", err);
                Vec::new()
            }
        }
    }

    fn patch_battery(&self, station: &StationId, battery: &BatteryId) {
        if let Some(mut view) = self.views.get_mut(station) {
            if !view.detach_battery(battery) {
                tracing::debug!("Battery {} not in cached view of {}", battery, station);
            }
        }
    }

    async fn refresh_after_staff_change(
        &self,
        station: &StationId,
    ) -> Result<StationRefresh, CoordinatorError> {
        let summaries = self.load_overview().await?;
        let view = self.load_station(station).await?;
        tracing::info!(
            "Station {} refreshed: {} staff, {} stations listed",
            station,
            view.staff.len(),
            summaries.len()
        );
        Ok(StationRefresh {
            summaries,
            view: Some(view),
        })
    }
}

fn require_staff_target<'a>(
    staff: Option<&'a StaffId>,
    station: Option<&'a StationId>,
) -> Result<(&'a StaffId, &'a StationId), ValidationError> {
    let staff = staff.ok_or(ValidationError::MissingStaffId)?;
    let station = station.ok_or(ValidationError::MissingStationId)?;
    Ok((staff, station))
}

//! Swapops Core - station console reconciliation
//!
//! The pure and coordinating parts of a battery-swap station console:
//! - Resolves a canonical staff id from inconsistently shaped records
//! - Normalizes staff records into one canonical shape
//! - Computes which staff may be assigned to a station
//! - Projects slot lists onto the fixed 5x6 cabinet grid
//! - Sequences mutations and the re-fetches that follow them
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use swapops_core::{ConsoleConfig, InMemoryBackend, StationId, StationStatusCoordinator};
//!
//! # async fn example(backend: InMemoryBackend) -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = StationStatusCoordinator::new(Arc::new(backend), ConsoleConfig::new());
//! let station = StationId::new("ST1").ok_or("bad id")?;
//!
//! coordinator.load_overview().await?;
//! let view = coordinator.load_station(&station).await?;
//! println!("{} batteries docked", view.grid.occupied);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod assignment;
pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod grid;
pub mod identity;
pub mod normalize;
pub mod record;
pub mod schema;
pub mod types;

pub use assignment::{
    availability, compute_candidates, current_staff, filter_by_search, search_candidates,
    search_needle, station_roster, Availability, ExclusionSet, StationRoster,
};
pub use backend::{BackendSnapshot, InMemoryBackend, StationBackend};
pub use config::{ConsistencyPolicy, ConsoleConfig};
pub use coordinator::{StationRefresh, StationStatusCoordinator, StationView};
pub use error::{
    BackendError, ConfigError, CoordinatorError, MutationKind, RecordError, RefreshStage,
    ValidationError,
};
pub use grid::{build_grid, occupied_count, Cell, GridStats, StationGrid, GRID_COLS, GRID_ROWS};
pub use identity::resolve_staff_id;
pub use normalize::{normalize_staff, normalize_staff_report, NormalizationReport, UnresolvedStaff};
pub use record::{Record, RecordArena, RecordSet};
pub use types::{
    AssignmentStub, BatteryId, BatteryRef, CanonicalStaff, HistoryEntry, Slot, StaffId,
    StationDetail, StationId, StationStatus, StationSummary,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Swapops Core
    pub use crate::{
        build_grid, compute_candidates, normalize_staff, CanonicalStaff, ConsoleConfig,
        CoordinatorError, ExclusionSet, RecordSet, StaffId, StationBackend, StationId,
        StationStatusCoordinator,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_then_candidates_then_grid() {
        let records = RecordSet::from_json(&json!({"data": [
            {"staffId": "s1", "stationId": "X"},
            {"staff": {"staffId": "s2"}, "assignments": [{"staffId": "s2", "stationId": "Y"}]},
            {"account": {"staffId": "s3", "name": "Free"}},
            {"accountId": "A9", "name": "Nobody"},
        ]}))
        .unwrap();
        let staff = normalize_staff(&records);
        assert_eq!(staff.len(), 3);

        let x = StationId::new("X").unwrap();
        let candidates = compute_candidates(&staff, Some(&x), &ExclusionSet::new());
        let ids: Vec<_> = candidates.iter().map(|s| s.staff_id.as_str()).collect();
        assert_eq!(ids, vec!["s3"]);

        let grid = build_grid(&[]);
        assert_eq!(grid.cells().count(), GRID_ROWS * GRID_COLS);
    }

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

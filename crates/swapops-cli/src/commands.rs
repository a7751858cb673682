//! Subcommand implementations
//!
//! Each command reads its inputs from JSON files and returns the text to
//! print.

use anyhow::{anyhow, Context, Result};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use swapops_core::{
    build_grid, compute_candidates, filter_by_search, normalize_staff, normalize_staff_report,
    search_needle, BackendSnapshot, BatteryId, ConsoleConfig, ExclusionSet, InMemoryBackend,
    RecordSet, StationDetail, StationGrid, StationId, StationStatusCoordinator, GRID_COLS,
};

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_records(path: &Path) -> Result<RecordSet> {
    RecordSet::from_json_str(&read(path)?)
        .with_context(|| format!("parsing staff records in {}", path.display()))
}

fn coordinator(
    snapshot: &Path,
    config: &ConsoleConfig,
) -> Result<StationStatusCoordinator<InMemoryBackend>> {
    let snapshot = BackendSnapshot::from_json_str(&read(snapshot)?)?;
    Ok(StationStatusCoordinator::new(
        Arc::new(InMemoryBackend::new(snapshot)),
        config.clone(),
    ))
}

/// Canonical staff as JSON, optionally with unresolved records
pub(crate) fn normalize(staff: &Path, include_unresolved: bool) -> Result<String> {
    let records = read_records(staff)?;
    let json = if include_unresolved {
        serde_json::to_string_pretty(&normalize_staff_report(&records))?
    } else {
        serde_json::to_string_pretty(&normalize_staff(&records))?
    };
    Ok(json)
}

/// Candidate list as JSON
pub(crate) fn candidates(
    staff: &Path,
    station: Option<&StationId>,
    station_staff: Option<&Path>,
    exclude: &[String],
    search: Option<&str>,
    config: &ConsoleConfig,
) -> Result<String> {
    let all = normalize_staff(&read_records(staff)?);

    let mut exclusions = match station_staff {
        Some(path) => ExclusionSet::from_staff(&normalize_staff(&read_records(path)?)),
        None => ExclusionSet::new(),
    };
    for id in exclude {
        exclusions.insert(id);
    }

    let needle = search_needle(search, config.search_min_chars);
    let candidates = filter_by_search(
        compute_candidates(&all, station, &exclusions),
        needle.as_deref(),
    );
    tracing::info!("{} of {} staff are candidates", candidates.len(), all.len());
    Ok(serde_json::to_string_pretty(&candidates)?)
}

/// Grid of a station detail document
pub(crate) fn grid(detail: &Path) -> Result<String> {
    let detail: StationDetail = serde_json::from_str(&read(detail)?)
        .with_context(|| format!("parsing station detail in {}", detail.display()))?;
    Ok(render_grid(&build_grid(&detail.slots)))
}

/// Summary, roster and grid of one station
pub(crate) async fn station(
    snapshot: &Path,
    station: &StationId,
    config: &ConsoleConfig,
) -> Result<String> {
    let coordinator = coordinator(snapshot, config)?;
    coordinator.load_overview().await?;
    let view = coordinator.load_station(station).await?;
    let roster = coordinator.roster(station).await;
    let candidates = coordinator.candidates(Some(station), &ExclusionSet::new(), None).await;

    let mut out = String::new();
    match coordinator
        .summaries()
        .into_iter()
        .find(|s| s.station_id == *station)
    {
        Some(summary) => {
            let _ = writeln!(
                out,
                "Station {} ({}) {}",
                summary.station_id,
                summary.name,
                summary.status.as_str()
            );
            let _ = writeln!(out, "staff count: {}", summary.staff_count());
        }
        None => {
            let _ = writeln!(out, "Station {} {}", station, view.detail.status.as_str());
        }
    }
    let _ = writeln!(
        out,
        "roster: {} assigned here, {} assigned elsewhere, {} candidates",
        roster.assigned_here.len(),
        roster.assigned_elsewhere.len(),
        candidates.len()
    );
    let _ = writeln!(out, "exchanges: {}", view.exchange_count);
    out.push_str(&render_grid(&view.grid));
    Ok(out)
}

/// Run the battery removal flow and render the refreshed grid
///
/// Blank ids are passed through so the coordinator rejects them.
pub(crate) async fn remove_battery(
    snapshot: &Path,
    station: &str,
    battery: &str,
    config: &ConsoleConfig,
) -> Result<String> {
    let coordinator = coordinator(snapshot, config)?;
    let station = StationId::new(station);
    let battery = BatteryId::new(battery);

    if let Some(station) = &station {
        coordinator.load_station(station).await?;
    }
    let refresh = coordinator
        .remove_battery(station.as_ref(), battery.as_ref())
        .await
        .context("battery removal failed")?;

    let view = refresh
        .view
        .ok_or_else(|| anyhow!("no station view after battery removal"))?;
    Ok(render_grid(&view.grid))
}

/// Text table of the grid, row 1 at the top
pub(crate) fn render_grid(grid: &StationGrid) -> String {
    let mut out = String::from("    ");
    for col in 1..=GRID_COLS {
        let _ = write!(out, " x{col:<7}");
    }
    out.push('\n');

    for (r, row) in grid.rows().enumerate() {
        let _ = write!(out, "y{:<3}", r + 1);
        for cell in row {
            let label = match (&cell.slot_id, &cell.battery) {
                (_, Some(battery)) => battery.battery_id.as_str(),
                (Some(_), None) => "--",
                (None, None) => ".",
            };
            let _ = write!(out, " {label:<8}");
        }
        out.push('\n');
    }

    let _ = write!(
        out,
        "occupied {} | filled cells {} | out of window {} | duplicates {}",
        grid.occupied, grid.stats.filled_cells, grid.stats.out_of_window, grid.stats.duplicates
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use swapops_core::ConsistencyPolicy;
    use swapops_test_utils::{slot, snapshot_two_stations, staff_json, station_detail, station_id};
    use tempfile::NamedTempFile;

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn snapshot_file() -> NamedTempFile {
        temp_file(&serde_json::to_string(&snapshot_two_stations()).unwrap())
    }

    #[test]
    fn normalize_prints_canonical_staff() {
        let file = temp_file(
            &json!({"data": [
                {"accountId": "A1", "assignments": [{"staffId": "S9", "stationId": "ST1"}]},
                {"accountId": "A2"}
            ]})
            .to_string(),
        );

        let out: serde_json::Value =
            serde_json::from_str(&normalize(file.path(), false).unwrap()).unwrap();
        assert_eq!(out[0]["staffId"], "S9");
        assert_eq!(out[0]["currentStationId"], "ST1");
        assert_eq!(out.as_array().unwrap().len(), 1);

        let report: serde_json::Value =
            serde_json::from_str(&normalize(file.path(), true).unwrap()).unwrap();
        assert_eq!(report["unresolved"][0]["accountId"], "A2");
    }

    #[test]
    fn candidates_apply_listing_and_explicit_exclusions() {
        let staff = temp_file(
            &json!([
                staff_json("S1", Some("ST1")),
                staff_json("S2", None),
                staff_json("S3", None),
                staff_json("S4", None),
            ])
            .to_string(),
        );
        let listing = temp_file(&json!([{"staffId": "S2"}]).to_string());

        let out = candidates(
            staff.path(),
            Some(&station_id("ST1")),
            Some(listing.path()),
            &["S3".to_string()],
            None,
            &ConsoleConfig::new(),
        )
        .unwrap();
        let out: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["staffId"], "S4");
    }

    #[test]
    fn grid_renders_batteries_and_stats() {
        let detail = station_detail(
            "ST1",
            vec![slot("1", 1, 1, Some("B1")), slot("2", 9, 9, Some("B9"))],
        );
        let file = temp_file(&serde_json::to_string(&detail).unwrap());

        let out = grid(file.path()).unwrap();
        let rows: Vec<_> = out.lines().collect();
        assert_eq!(rows.len(), 7);
        assert!(rows[1].starts_with("y1") && rows[1].contains("B1"));
        assert!(!out.contains("B9"));
        assert!(rows[6].starts_with("occupied 2 | filled cells 1 | out of window 1"));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = grid(Path::new("/no/such/detail.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/no/such/detail.json"));
    }

    #[tokio::test]
    async fn station_report_shows_roster_counts() {
        let file = snapshot_file();
        let out = station(file.path(), &station_id("ST1"), &ConsoleConfig::new())
            .await
            .unwrap();

        assert!(out.starts_with("Station ST1 (Riverside) ACTIVE"));
        assert!(out.contains("1 assigned here, 1 assigned elsewhere, 2 candidates"));
        assert!(out.contains("exchanges: 2"));
        assert!(out.contains("occupied 2"));
    }

    #[tokio::test]
    async fn remove_battery_under_both_policies() {
        for policy in [
            ConsistencyPolicy::ConfirmThenApply,
            ConsistencyPolicy::ApplyThenReconcile,
        ] {
            let file = snapshot_file();
            let config = ConsoleConfig::new().with_battery_removal(policy);
            let out = remove_battery(file.path(), "ST1", "B1", &config).await.unwrap();
            assert!(!out.contains("B1"));
            assert!(out.contains("occupied 1"));
        }
    }

    #[tokio::test]
    async fn blank_battery_id_is_rejected() {
        let file = snapshot_file();
        let err = remove_battery(file.path(), "ST1", "  ", &ConsoleConfig::new())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("invalid request"));
    }
}

//! Reconciliation properties across normalizer, candidate engine and grid

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};
use swapops_core::{
    build_grid, compute_candidates, normalize_staff, normalize_staff_report, occupied_count,
    CanonicalStaff, ExclusionSet, RecordSet, StaffId, StationId,
};
use swapops_test_utils::{slot, staff_json, station_id};

fn normalize_json(value: Value) -> Vec<CanonicalStaff> {
    normalize_staff(&RecordSet::from_json(&value).unwrap())
}

#[test]
fn records_without_reachable_staff_id_are_dropped() {
    let report = normalize_staff_report(
        &RecordSet::from_json(&json!([
            {"accountId": "A1", "name": "No id"},
            {"staff": {"name": "still none"}, "account": {"email": "x@y"}},
            {"assignments": [{"stationId": "ST1"}], "staffRef": {"userId": "U1"}},
            {"wrapper": {"staffId": "HIDDEN"}},
            {"staffId": "S1"},
        ]))
        .unwrap(),
    );

    assert_eq!(report.staff.len(), 1);
    assert_eq!(report.staff[0].staff_id.as_str(), "S1");
    assert_eq!(report.unresolved.len(), 4);
    assert_eq!(report.unresolved[0].account_id.as_deref(), Some("A1"));
}

#[test]
fn self_referencing_account_terminates() {
    let staff = normalize_json(json!([
        {"$id": "self", "accountId": "A1", "account": {"$ref": "self"}},
        {"$id": "loop", "account": {"$ref": "loop"}, "staff": {"staffId": "S7"}},
    ]));

    assert_eq!(staff.len(), 1);
    assert_eq!(staff[0].staff_id.as_str(), "S7");
}

#[test]
fn candidates_exclude_staff_assigned_anywhere() {
    let staff = normalize_json(json!([
        staff_json("s1", Some("X")),
        staff_json("s2", Some("Y")),
        staff_json("s3", None),
    ]));

    let x = station_id("X");
    let candidates = compute_candidates(&staff, Some(&x), &ExclusionSet::new());
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].staff_id.as_str(), "s3");
}

#[test]
fn external_exclusions_apply_after_assignment_rules() {
    let staff = normalize_json(json!([
        staff_json("s1", None),
        staff_json("s2", None),
        staff_json("s3", Some("X")),
    ]));
    let exclusions: ExclusionSet = ["s2"].into_iter().collect();

    let candidates = compute_candidates(&staff, None, &exclusions);
    let ids: Vec<_> = candidates.iter().map(|s| s.staff_id.as_str()).collect();
    assert_eq!(ids, vec!["s1"]);
    // input untouched
    assert_eq!(staff.len(), 3);
}

#[test]
fn single_battery_slot_projects_to_top_left() {
    let grid = build_grid(&[slot("1", 1, 1, Some("B1"))]);

    let filled: Vec<_> = grid.cells().filter(|c| !c.is_placeholder()).collect();
    assert_eq!(filled.len(), 1);
    assert_eq!((filled[0].row, filled[0].col), (1, 1));
    assert_eq!(
        filled[0].battery.as_ref().map(|b| b.battery_id.as_str()),
        Some("B1")
    );
    assert_eq!(grid.occupied, 1);
}

#[test]
fn account_with_assignment_normalizes_end_to_end() {
    let staff = normalize_json(json!([
        {"accountId": "A1", "assignments": [{"staffId": "S9", "stationId": "ST1"}]}
    ]));

    assert_eq!(
        serde_json::to_value(&staff).unwrap(),
        json!([{
            "staffId": "S9",
            "accountId": "A1",
            "name": "",
            "username": "",
            "phone": "",
            "email": "",
            "currentStationId": "ST1",
        }])
    );
}

#[test]
fn conflicting_assignments_resolve_to_the_first() {
    let staff = normalize_json(json!([{
        "assignments": [
            {"staffId": "S9", "stationId": "ST1"},
            {"staffId": "S9", "stationId": "ST2"},
        ]
    }]));

    assert_eq!(staff.len(), 1);
    assert_eq!(staff[0].current_station_id, Some(station_id("ST1")));
}

fn arb_staff() -> impl Strategy<Value = Vec<CanonicalStaff>> {
    prop::collection::vec(
        (
            "[a-z]{0,8}",
            "[a-z0-9@.]{0,12}",
            proptest::option::of("ST[1-4]"),
            proptest::option::of("A[0-9]{1,3}"),
        ),
        0..20,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (name, email, station, account))| {
                let mut staff = CanonicalStaff::new(StaffId::new(format!("S{i}")).unwrap())
                    .with_name(name);
                staff.email = email;
                staff.account_id = account;
                if let Some(station) = station.and_then(StationId::new) {
                    staff = staff.with_station(station);
                }
                staff
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_normalization_is_idempotent(staff in arb_staff()) {
        let raw = Value::Array(staff.iter().map(CanonicalStaff::to_raw).collect());
        let once = normalize_json(raw);
        prop_assert_eq!(&once, &staff);

        let again = normalize_json(Value::Array(once.iter().map(CanonicalStaff::to_raw).collect()));
        prop_assert_eq!(again, once);
    }

    #[test]
    fn prop_candidates_preserve_order_and_never_include_assigned(staff in arb_staff()) {
        let station = station_id("ST1");
        let candidates = compute_candidates(&staff, Some(&station), &ExclusionSet::new());

        prop_assert!(candidates.iter().all(|s| s.current_station_id.is_none()));
        let positions: Vec<_> = candidates
            .iter()
            .map(|c| staff.iter().position(|s| s.staff_id == c.staff_id).unwrap())
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prop_occupied_count_ignores_projection(
        coords in prop::collection::vec((-2i32..10, -2i32..10, any::<bool>()), 0..40)
    ) {
        let slots: Vec<_> = coords
            .iter()
            .enumerate()
            .map(|(i, (x, y, full))| {
                let battery = format!("B{i}");
                slot(&format!("{i}"), *x, *y, full.then_some(battery.as_str()))
            })
            .collect();
        let grid = build_grid(&slots);
        prop_assert_eq!(grid.occupied, occupied_count(&slots));
        prop_assert_eq!(grid.occupied, coords.iter().filter(|c| c.2).count());
    }
}

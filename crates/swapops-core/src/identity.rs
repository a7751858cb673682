//! Canonical staff identity resolution
//!
//! Breadth-first search over a record's wrapper graph. The shallowest node
//! that directly carries a staff id wins; children are enqueued in the fixed
//! [`TRAVERSAL`] order, so the result is deterministic for a given record.
//! Nodes are tracked by arena identity, which bounds the search on cyclic
//! graphs to one visit per reachable node.

use crate::record::{NodeId, Record};
use crate::schema::{direct_staff_id, TRAVERSAL};
use crate::types::StaffId;
use std::collections::{HashSet, VecDeque};

/// Resolve the canonical staff id reachable from `record`
///
/// Never fails: `None` means no staff id is reachable.
#[must_use]
pub fn resolve_staff_id(record: &Record<'_>) -> Option<StaffId> {
    resolve_with_depth(record).map(|(id, _)| id)
}

/// Resolve and report the BFS depth the id was found at (root = 0)
#[must_use]
pub fn resolve_with_depth(record: &Record<'_>) -> Option<(StaffId, usize)> {
    let mut queue: VecDeque<(Record<'_>, usize)> = VecDeque::new();
    let mut visited: HashSet<NodeId> = HashSet::new();

    visited.insert(record.id());
    queue.push_back((*record, 0));

    while let Some((node, depth)) = queue.pop_front() {
        if let Some(id) = direct_staff_id(&node).and_then(StaffId::new) {
            return Some((id, depth));
        }

        for relation in TRAVERSAL {
            for child in relation.targets(&node) {
                if visited.insert(child.id()) {
                    queue.push_back((child, depth + 1));
                }
            }
        }
    }

    None
}

/// Resolve against several roots in priority order; first hit wins
#[must_use]
pub fn resolve_first<'a, I>(roots: I) -> Option<StaffId>
where
    I: IntoIterator<Item = Record<'a>>,
{
    roots.into_iter().find_map(|root| resolve_staff_id(&root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, RecordArena, RecordSet};
    use proptest::prelude::*;
    use serde_json::json;

    fn resolve_json(value: serde_json::Value) -> Option<String> {
        let set = RecordSet::from_json(&json!([value])).unwrap();
        let rec = set.records().next().unwrap();
        resolve_staff_id(&rec).map(|id| id.as_str().to_string())
    }

    #[test]
    fn direct_id_wins() {
        assert_eq!(
            resolve_json(json!({"staffId": "S1", "staff": {"staffId": "S2"}})),
            Some("S1".into())
        );
    }

    #[test]
    fn shallowest_match_wins_over_traversal_order() {
        // assignments come first in traversal order, but the id inside them
        // is deeper than staff.staffId
        let rec = json!({
            "assignments": [{"staff": {"staffId": "DEEP"}}, {"stationId": "ST1"}],
            "staff": {"staffId": "SHALLOW"}
        });
        assert_eq!(resolve_json(rec), Some("SHALLOW".into()));
    }

    #[test]
    fn traversal_order_breaks_ties_at_same_depth() {
        let rec = json!({
            "account": {"staffId": "FROM_ACCOUNT"},
            "staff": {"staffId": "FROM_STAFF"},
            "assignments": [{"staffId": "FROM_ASSIGNMENT"}]
        });
        assert_eq!(resolve_json(rec), Some("FROM_ASSIGNMENT".into()));
    }

    #[test]
    fn follows_shortcuts_and_refs() {
        assert_eq!(
            resolve_json(json!({"staffRef": {"staff_id": 42}})),
            Some("42".into())
        );
        assert_eq!(
            resolve_json(json!({"accountRef": {"staffID": "S7"}})),
            Some("S7".into())
        );
        assert_eq!(
            resolve_json(json!({"primaryAssignment": {"staffId": "S8"}})),
            Some("S8".into())
        );
        assert_eq!(
            resolve_json(json!({"staff": {"account": {"staffId": "S9"}}})),
            Some("S9".into())
        );
    }

    #[test]
    fn blank_ids_are_skipped() {
        assert_eq!(
            resolve_json(json!({"staffId": "  ", "account": {"staffId": "S3"}})),
            Some("S3".into())
        );
        assert_eq!(resolve_json(json!({"accountId": "A1", "name": "x"})), None);
    }

    #[test]
    fn terminates_on_self_referencing_account() {
        let mut arena = RecordArena::new();
        let root = arena.alloc_object();
        arena.set(root, "accountId", Field::Text("A1".into()));
        arena.link(root, "account", root);
        let set = RecordSet::from_arena(arena, vec![root]);

        let rec = set.records().next().unwrap();
        assert_eq!(resolve_staff_id(&rec), None);
    }

    #[test]
    fn finds_id_behind_a_cycle() {
        let set = RecordSet::from_json(&json!([{
            "$id": "root",
            "account": {
                "$id": "acct",
                "owner": {"$ref": "root"},
                "staff": {"account": {"$ref": "acct"}, "staffId": "S5"}
            }
        }]))
        .unwrap();
        let rec = set.records().next().unwrap();
        assert_eq!(
            resolve_with_depth(&rec).map(|(id, d)| (id.as_str().to_string(), d)),
            Some(("S5".into(), 2))
        );
    }

    #[test]
    fn resolve_first_respects_priority() {
        let set = RecordSet::from_json(&json!([
            {"name": "no id"},
            {"staffId": "S1"},
            {"staffId": "S2"}
        ]))
        .unwrap();
        let id = resolve_first(set.records());
        assert_eq!(id.unwrap().as_str(), "S1");
    }

    /// Ring of `n` wrappers linked through every traversal key, id at `hit`
    fn ring(n: usize, hit: Option<usize>) -> RecordSet {
        let mut arena = RecordArena::new();
        let nodes: Vec<_> = (0..n).map(|_| arena.alloc_object()).collect();
        for (i, node) in nodes.iter().enumerate() {
            let next = nodes[(i + 1) % n];
            let prev = nodes[(i + n - 1) % n];
            arena.link(*node, "account", next);
            arena.link(*node, "staffRef", prev);
            arena.link(*node, "staff", *node);
        }
        if let Some(hit) = hit {
            arena.set(nodes[hit], "staffId", Field::Text(format!("S{hit}")));
        }
        RecordSet::from_arena(arena, vec![nodes[0]])
    }

    proptest! {
        #[test]
        fn prop_terminates_on_cyclic_rings(n in 1usize..40, hit in proptest::option::of(0usize..40)) {
            let hit = hit.filter(|h| *h < n);
            let set = ring(n, hit);
            let rec = set.records().next().unwrap();
            let found = resolve_staff_id(&rec).map(|id| id.as_str().to_string());
            prop_assert_eq!(found, hit.map(|h| format!("S{h}")));
        }
    }
}

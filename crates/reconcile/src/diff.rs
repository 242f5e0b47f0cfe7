//! Diff computation between desired and current loopbacks

use crate::change::Change;
use crate::types::Action;
use intent::LoopbackIntent;
use restconf::{LoopbackMap, LoopbackSnapshot};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Snapshot form of a declared loopback, comparable with device state
pub fn desired_snapshot(loopback: &LoopbackIntent) -> LoopbackSnapshot {
    LoopbackSnapshot {
        ip: Some(loopback.ipv4().to_string()),
        netmask: Some(loopback.netmask().to_string()),
        description: loopback.description().map(str::to_string),
    }
}

/// Compute the changes that bring `current` to `desired` on one device
///
/// Creates and updates come first, in declaration order; deletes follow in
/// the order of `current`. Loopbacks on the device but not in `desired`
/// are only deleted when `delete_unmanaged` is set.
pub fn diff_loopbacks(
    device: &str,
    desired: &[LoopbackIntent],
    current: &LoopbackMap,
    delete_unmanaged: bool,
) -> Vec<Change> {
    let mut changes = Vec::new();

    for loopback in desired {
        let id = loopback.key();
        let wanted = desired_snapshot(loopback);
        match current.get(&id) {
            None => changes.push(Change::create(device, &id, wanted)),
            Some(existing) if *existing != wanted => {
                changes.push(Change::update(device, &id, existing.clone(), wanted));
            }
            Some(_) => {}
        }
    }

    if delete_unmanaged {
        for id in unmanaged_ids(desired, current) {
            changes.push(Change::delete(device, &id, current[&id].clone()));
        }
    }

    changes
}

/// Ids present on the device but not declared, in `current` order
pub fn unmanaged_ids(desired: &[LoopbackIntent], current: &LoopbackMap) -> Vec<String> {
    let declared: HashSet<String> = desired.iter().map(LoopbackIntent::key).collect();
    current
        .keys()
        .filter(|id| !declared.contains(*id))
        .cloned()
        .collect()
}

/// Plan summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    /// Devices with at least one change
    pub devices: usize,
}

impl PlanSummary {
    pub fn from_changes(changes: &[Change]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.action() {
                Action::Create => summary.creates += 1,
                Action::Update => summary.updates += 1,
                Action::Delete => summary.deletes += 1,
            }
        }
        summary.devices = group_by_device(changes).len();
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.deletes
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} total ({} creates, {} updates, {} deletes)",
            self.total(),
            self.creates,
            self.updates,
            self.deletes
        )
    }
}

/// Group changes by device, keeping the order in which devices first appear
pub fn group_by_device(changes: &[Change]) -> Vec<(&str, Vec<&Change>)> {
    let mut groups: Vec<(&str, Vec<&Change>)> = Vec::new();
    for change in changes {
        match groups.iter_mut().find(|(device, _)| *device == change.device()) {
            Some((_, group)) => group.push(change),
            None => groups.push((change.device(), vec![change])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lb(id: i64, ip: &str, description: Option<&str>) -> LoopbackIntent {
        LoopbackIntent::new(id, ip, "255.255.255.255", description).unwrap()
    }

    fn current(entries: &[(&str, &str, Option<&str>)]) -> LoopbackMap {
        entries
            .iter()
            .map(|(id, ip, d)| {
                (
                    (*id).to_string(),
                    LoopbackSnapshot::new(ip, "255.255.255.255", *d),
                )
            })
            .collect()
    }

    #[test]
    fn test_create_when_absent() {
        let changes = diff_loopbacks("r1", &[lb(100, "10.0.0.1", None)], &LoopbackMap::new(), false);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), Action::Create);
        assert!(changes[0].current().is_none());
        assert_eq!(changes[0].desired().unwrap().ip.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_update_on_ip_drift() {
        let current = current(&[("100", "10.0.0.1", Some("A"))]);
        let changes = diff_loopbacks("r1", &[lb(100, "10.0.0.2", Some("A"))], &current, false);

        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert_eq!(change.action(), Action::Update);
        assert_eq!(change.current().unwrap().ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(change.desired().unwrap().ip.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn test_description_drift_is_an_update() {
        let current = current(&[("1", "10.0.0.1", Some("old"))]);
        let changes = diff_loopbacks("r1", &[lb(1, "10.0.0.1", None)], &current, false);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].changed_fields()[0].field, "description");
    }

    #[test]
    fn test_converged_device_has_no_changes() {
        let current = current(&[("100", "10.0.0.1", Some("Mgmt"))]);
        let changes = diff_loopbacks("r1", &[lb(100, "10.0.0.1", Some("Mgmt"))], &current, true);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_safe_default_never_deletes() {
        let current = current(&[
            ("100", "10.0.0.1", None),
            ("999", "10.9.9.9", None),
            ("7", "10.7.7.7", None),
        ]);
        let changes = diff_loopbacks("r1", &[lb(100, "10.0.0.1", None)], &current, false);
        assert!(changes.iter().all(|c| c.action() != Action::Delete));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_strict_mode_deletes_unmanaged() {
        let current = current(&[("100", "10.0.0.1", None), ("999", "10.9.9.9", None)]);
        let changes = diff_loopbacks("r1", &[lb(100, "10.0.0.1", None)], &current, true);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), Action::Delete);
        assert_eq!(changes[0].resource_id(), "999");
        assert!(changes[0].desired().is_none());
    }

    #[test]
    fn test_ordering_creates_updates_then_deletes() {
        let current = current(&[("5", "10.5.5.5", None), ("50", "10.0.0.1", None)]);
        let desired = [lb(300, "10.3.3.3", None), lb(50, "10.0.0.2", None), lb(2, "10.2.2.2", None)];
        let changes = diff_loopbacks("r1", &desired, &current, true);

        let order: Vec<_> = changes
            .iter()
            .map(|c| (c.action(), c.resource_id().to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Action::Create, "300".to_string()),
                (Action::Update, "50".to_string()),
                (Action::Create, "2".to_string()),
                (Action::Delete, "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_unmanaged_ids() {
        let current = current(&[("1", "10.0.0.1", None), ("2", "10.0.0.2", None)]);
        assert_eq!(unmanaged_ids(&[lb(1, "10.0.0.1", None)], &current), vec!["2"]);
    }

    #[test]
    fn test_plan_summary_and_grouping() {
        let changes = vec![
            Change::create("r1", "1", LoopbackSnapshot::default()),
            Change::delete("r2", "2", LoopbackSnapshot::default()),
            Change::create("r1", "3", LoopbackSnapshot::default()),
        ];
        let summary = PlanSummary::from_changes(&changes);
        assert_eq!(summary.creates, 2);
        assert_eq!(summary.deletes, 1);
        assert_eq!(summary.devices, 2);
        assert_eq!(summary.to_string(), "3 total (2 creates, 0 updates, 1 deletes)");

        let groups = group_by_device(&changes);
        assert_eq!(groups[0].0, "r1");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "r2");
    }
}

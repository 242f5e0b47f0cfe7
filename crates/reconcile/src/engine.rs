//! Reconciliation engine - reads current state, plans, applies, verifies

use crate::change::Change;
use crate::diff::{PlanSummary, diff_loopbacks, group_by_device, unmanaged_ids};
use crate::error::ApplyError;
use crate::events::{Event, EventSink};
use crate::types::{Action, Applied, ApplySummary, EngineOptions, PlanOutcome, ResourceKind};
use intent::{DeviceIntent, NetworkIntent};
use rayon::prelude::*;
use restconf::{DeviceConfigClient, LoopbackConfig, LoopbackMap, RollbackTarget};
use std::convert::Infallible;

/// Reconciles declared intent with the controller's view of each device
///
/// The engine borrows its client and event sink; the caller owns both and
/// is responsible for closing the client.
///
/// # Example
///
/// ```
/// use intent::NetworkIntent;
/// use reconcile::{IntentEngine, NoEvents};
/// use restconf::MockClient;
///
/// let client = MockClient::new();
/// client.add_device("r1");
/// let intent = NetworkIntent::from_value(serde_json::json!({
///     "devices": [{
///         "name": "r1",
///         "device_type": "ios-xe",
///         "loopbacks": [{"id": 100, "ipv4": "10.0.0.1", "netmask": "255.255.255.255"}]
///     }]
/// }))?;
///
/// let engine = IntentEngine::new(&client, &NoEvents);
/// let summary = engine.apply_intent(&intent, false);
/// assert_eq!(summary.counts(), (1, 0));
/// assert!(engine.plan(&intent).is_empty());
/// # Ok::<(), intent::IntentError>(())
/// ```
pub struct IntentEngine<'a> {
    client: &'a dyn DeviceConfigClient,
    events: &'a dyn EventSink,
    options: EngineOptions,
}

impl<'a> IntentEngine<'a> {
    pub fn new(client: &'a dyn DeviceConfigClient, events: &'a dyn EventSink) -> Self {
        Self {
            client,
            events,
            options: EngineOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    // =========================================================================
    // Current state
    // =========================================================================

    /// Loopbacks currently configured on a device
    ///
    /// Syncs the device first. An unreachable controller, an unknown device
    /// or an unreadable configuration all yield an empty map.
    pub fn current_loopbacks(&self, device: &str) -> LoopbackMap {
        self.events.emit(&Event::Querying { device });
        if !self.client.sync_from_device(device) {
            self.events.emit(&Event::SyncFailed { device });
        }
        self.read_loopbacks(device)
    }

    /// Read stored loopbacks without syncing
    fn read_loopbacks(&self, device: &str) -> LoopbackMap {
        let Some(config) = self.client.device_config(device) else {
            self.events.emit(&Event::ConfigUnavailable { device });
            return LoopbackMap::new();
        };

        match config.loopbacks() {
            Ok(loopbacks) => {
                self.events.emit(&Event::StateRead {
                    device,
                    count: loopbacks.len(),
                });
                loopbacks
            }
            Err(reason) => {
                self.events.emit(&Event::StateUnreadable {
                    device,
                    reason: &reason,
                });
                LoopbackMap::new()
            }
        }
    }

    // =========================================================================
    // Planning
    // =========================================================================

    /// Changes needed on one device
    pub fn device_changes(&self, device: &DeviceIntent) -> Vec<Change> {
        let name = device.name();
        let current = self.current_loopbacks(name);

        let unmanaged = unmanaged_ids(device.loopbacks(), &current);
        if !unmanaged.is_empty() {
            if device.delete_unmanaged_loopbacks() {
                self.events.emit(&Event::UnmanagedDeleted {
                    device: name,
                    ids: &unmanaged,
                });
            } else {
                self.events.emit(&Event::UnmanagedKept {
                    device: name,
                    ids: &unmanaged,
                });
            }
        }
        if device.bgp().is_some() {
            self.events.emit(&Event::BgpSkipped { device: name });
        }

        diff_loopbacks(
            name,
            device.loopbacks(),
            &current,
            device.delete_unmanaged_loopbacks(),
        )
    }

    /// Changes needed across every device of the intent
    ///
    /// Reads state but never mutates it.
    pub fn plan(&self, intent: &NetworkIntent) -> Vec<Change> {
        let devices = intent.devices();
        let per_device: Vec<Vec<Change>> = self.for_each_device(devices, |d| self.device_changes(d));
        per_device.into_iter().flatten().collect()
    }

    // =========================================================================
    // Applying
    // =========================================================================

    /// Apply a single change
    ///
    /// In dry-run mode nothing is sent to the controller.
    pub fn apply_change(&self, change: &Change, dry_run: bool) -> Result<Applied, ApplyError> {
        self.events.emit(&Event::Applying { change, dry_run });
        if dry_run {
            return Ok(Applied::dry_run());
        }

        let rollback_id = match (change.resource_type(), change.action()) {
            (ResourceKind::Loopback, Action::Create | Action::Update) => {
                let config = loopback_config(change)?;
                let rollback_id = if self.options.track_rollback {
                    self.client
                        .configure_loopback_tracked(change.device(), &config)
                        .map_err(|source| client_error(change, source))?
                } else {
                    self.client
                        .configure_loopback(change.device(), &config)
                        .map_err(|source| client_error(change, source))?;
                    None
                };
                // Configure merges, so a dropped description needs its own delete
                let had_description = change.current().is_some_and(|c| c.description.is_some());
                if had_description && config.description.is_none() {
                    self.client
                        .delete_loopback_description(change.device(), change.resource_id())
                        .map_err(|source| client_error(change, source))?;
                }
                rollback_id
            }
            (ResourceKind::Loopback, Action::Delete) => {
                self.client
                    .delete_loopback(change.device(), change.resource_id())
                    .map_err(|source| client_error(change, source))?;
                None
            }
        };

        if self.options.verify {
            self.verify(change)?;
        }

        Ok(Applied {
            dry_run: false,
            rollback_id,
            verified: self.options.verify,
        })
    }

    /// Sync the device and confirm the change took effect
    fn verify(&self, change: &Change) -> Result<(), ApplyError> {
        let device = change.device();
        if !self.client.sync_from_device(device) {
            return Err(ApplyError::Unsynced {
                change: change.to_string(),
                device: device.to_string(),
            });
        }

        let loopbacks = self.read_loopbacks(device);
        let observed = loopbacks.get(change.resource_id());
        let id = change.resource_id();
        let reason = match (change.action(), observed) {
            (Action::Delete, None) => return Ok(()),
            (Action::Delete, Some(_)) => format!("Loopback{id} still present after delete"),
            (_, None) => format!("Loopback{id} not present after {}", change.action().as_str()),
            (_, Some(state)) if Some(state) == change.desired() => return Ok(()),
            (_, Some(_)) => format!("Loopback{id} differs after {}", change.action().as_str()),
        };
        Err(ApplyError::Verification {
            change: change.to_string(),
            reason,
        })
    }

    /// Apply changes in order, continuing past failures
    pub fn apply_changes(&self, changes: &[Change], dry_run: bool) -> ApplySummary {
        let groups = group_by_device(changes);
        let summaries: Vec<ApplySummary> = self.for_each_device(&groups, |(_, group)| {
            let mut summary = ApplySummary::new(dry_run);
            for &change in group {
                let outcome = self.apply_change(change, dry_run);
                match &outcome {
                    Ok(applied) => self.events.emit(&Event::Applied {
                        change,
                        rollback_id: applied.rollback_id,
                    }),
                    Err(error) => self.events.emit(&Event::Failed { change, error }),
                }
                summary.record(change, &outcome);
            }
            summary
        });

        let mut summary = ApplySummary::new(dry_run);
        for device_summary in summaries {
            summary.merge(device_summary);
        }
        summary
    }

    /// Report a plan, ask `proceed` whether to go on, then apply it
    ///
    /// `proceed` is only asked when there is something to change. An error
    /// from it is returned untouched and nothing is applied.
    pub fn execute_plan<E>(
        &self,
        changes: &[Change],
        dry_run: bool,
        proceed: impl FnOnce(&PlanSummary) -> Result<bool, E>,
    ) -> Result<PlanOutcome, E> {
        let plan = PlanSummary::from_changes(changes);
        self.events.emit(&Event::Planned { summary: &plan });

        if !plan.has_changes() {
            return Ok(PlanOutcome::NoChanges);
        }
        if !proceed(&plan)? {
            return Ok(PlanOutcome::Declined);
        }

        let summary = self.apply_changes(changes, dry_run);
        self.events.emit(&Event::Finished {
            succeeded: summary.succeeded,
            failed: summary.failed,
            dry_run,
        });
        Ok(PlanOutcome::Applied(summary))
    }

    /// Plan every device, then apply the plan
    ///
    /// Returns `(0, 0)` counts without entering the apply phase when every
    /// device already matches its intent.
    pub fn apply_intent(&self, intent: &NetworkIntent, dry_run: bool) -> ApplySummary {
        let changes = self.plan(intent);
        let outcome = self.execute_plan(&changes, dry_run, |_| Ok::<_, Infallible>(true));
        match outcome {
            Ok(outcome) => outcome.into_summary(dry_run),
            Err(never) => match never {},
        }
    }

    /// Ask the controller what it would send for a create or update
    ///
    /// Deletes have no preview and return `None`.
    pub fn preview(&self, change: &Change) -> Result<Option<serde_json::Value>, ApplyError> {
        if change.action() == Action::Delete {
            return Ok(None);
        }
        let config = loopback_config(change)?;
        self.client
            .configure_loopback_dry_run(change.device(), &config)
            .map(Some)
            .map_err(|source| client_error(change, source))
    }

    // =========================================================================
    // Rollback
    // =========================================================================

    /// Apply a rollback file. Never called by the apply path.
    pub fn rollback(&self, target: RollbackTarget) -> Result<(), ApplyError> {
        self.events.emit(&Event::RollingBack { target });
        self.client.rollback(target).map_err(ApplyError::Rollback)
    }

    // =========================================================================
    // Device pool
    // =========================================================================

    /// Run `f` for each item, on a rayon pool when `jobs > 1`
    ///
    /// Results keep the input order. Items are independent devices; work
    /// for one device always stays on one thread.
    fn for_each_device<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Send + Sync,
    {
        let jobs = self.options.jobs.max(1);
        if jobs == 1 || items.len() <= 1 {
            return items.iter().map(f).collect();
        }

        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(|| items.par_iter().map(f).collect()),
            Err(e) => {
                let reason = e.to_string();
                self.events.emit(&Event::Sequential { reason: &reason });
                items.iter().map(f).collect()
            }
        }
    }
}

fn client_error(change: &Change, source: restconf::Error) -> ApplyError {
    ApplyError::Client {
        change: change.to_string(),
        source,
    }
}

/// Build the configure request for a create or update
fn loopback_config(change: &Change) -> Result<LoopbackConfig, ApplyError> {
    let missing = |field| ApplyError::MissingDesired {
        change: change.to_string(),
        field,
    };
    let desired = change.desired().ok_or_else(|| missing("a snapshot"))?;
    let id = change
        .resource_id()
        .parse::<u32>()
        .map_err(|_| ApplyError::InvalidId {
            change: change.to_string(),
            id: change.resource_id().to_string(),
        })?;

    Ok(LoopbackConfig {
        id,
        ip: desired.ip.clone().ok_or_else(|| missing("ip"))?,
        netmask: desired.netmask.clone().ok_or_else(|| missing("netmask"))?,
        description: desired.description.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MemorySink, NoEvents, Severity};
    use restconf::{LoopbackSnapshot, MockCall, MockClient};
    use serde_json::json;

    fn intent(delete_unmanaged: bool) -> NetworkIntent {
        NetworkIntent::from_value(json!({
            "devices": [{
                "name": "dist-rtr01",
                "device_type": "ios-xe",
                "delete_unmanaged_loopbacks": delete_unmanaged,
                "loopbacks": [
                    {"id": 100, "ipv4": "10.100.100.1", "netmask": "255.255.255.255", "description": "Mgmt"},
                    {"id": 101, "ipv4": "10.100.101.1", "netmask": "255.255.255.255"}
                ]
            }]
        }))
        .unwrap()
    }

    fn two_devices() -> NetworkIntent {
        NetworkIntent::from_value(json!({
            "devices": [
                {"name": "r1", "device_type": "ios", "loopbacks": [
                    {"id": 1, "ipv4": "10.0.1.1", "netmask": "255.255.255.255"},
                    {"id": 2, "ipv4": "10.0.1.2", "netmask": "255.255.255.255"}
                ]},
                {"name": "r2", "device_type": "ios", "loopbacks": [
                    {"id": 1, "ipv4": "10.0.2.1", "netmask": "255.255.255.255"}
                ]},
                {"name": "r3", "device_type": "ios", "loopbacks": [
                    {"id": 1, "ipv4": "10.0.3.1", "netmask": "255.255.255.255"}
                ]}
            ]
        }))
        .unwrap()
    }

    fn mock_with(devices: &[&str]) -> MockClient {
        let mock = MockClient::new();
        for device in devices {
            mock.add_device(device);
        }
        mock
    }

    #[test]
    fn test_apply_twice_is_idempotent() {
        let mock = mock_with(&["dist-rtr01"]);
        let engine = IntentEngine::new(&mock, &NoEvents);

        let first = engine.apply_intent(&intent(false), false);
        assert_eq!(first.counts(), (2, 0));

        assert!(engine.plan(&intent(false)).is_empty());
        let second = engine.apply_intent(&intent(false), false);
        assert_eq!(second.counts(), (0, 0));
        assert!(second.results.is_empty());
    }

    #[test]
    fn test_safe_default_keeps_unmanaged() {
        let mock = mock_with(&["dist-rtr01"]);
        mock.add_loopback(
            "dist-rtr01",
            "999",
            LoopbackSnapshot::new("10.9.9.9", "255.255.255.255", None),
        );
        let events = MemorySink::new();
        let engine = IntentEngine::new(&mock, &events);

        let changes = engine.plan(&intent(false));
        assert!(changes.iter().all(|c| c.action() != Action::Delete));
        assert!(events.contains("ignoring 1 unmanaged loopbacks: 999"));

        engine.apply_intent(&intent(false), false);
        assert!(mock.loopbacks("dist-rtr01").contains_key("999"));
    }

    #[test]
    fn test_strict_mode_deletes_999() {
        let mock = mock_with(&["dist-rtr01"]);
        mock.add_loopback(
            "dist-rtr01",
            "100",
            LoopbackSnapshot::new("10.100.100.1", "255.255.255.255", Some("Mgmt")),
        );
        mock.add_loopback(
            "dist-rtr01",
            "101",
            LoopbackSnapshot::new("10.100.101.1", "255.255.255.255", None),
        );
        mock.add_loopback("dist-rtr01", "999", LoopbackSnapshot::default());
        let engine = IntentEngine::new(&mock, &NoEvents);

        let changes = engine.plan(&intent(true));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), Action::Delete);
        assert_eq!(changes[0].resource_id(), "999");

        let summary = engine.apply_changes(&changes, false);
        assert_eq!(summary.counts(), (1, 0));
        assert!(!mock.loopbacks("dist-rtr01").contains_key("999"));
    }

    #[test]
    fn test_update_detected_from_device_state() {
        let mock = mock_with(&["r1"]);
        mock.add_loopback(
            "r1",
            "100",
            LoopbackSnapshot::new("10.0.0.1", "255.255.255.255", Some("A")),
        );
        let intent = NetworkIntent::from_value(json!({
            "devices": [{"name": "r1", "device_type": "ios", "loopbacks": [
                {"id": 100, "ipv4": "10.0.0.2", "netmask": "255.255.255.255", "description": "A"}
            ]}]
        }))
        .unwrap();

        let changes = IntentEngine::new(&mock, &NoEvents).plan(&intent);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action(), Action::Update);
        assert_eq!(changes[0].current().unwrap().ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(changes[0].desired().unwrap().ip.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn test_description_removal_converges_in_one_pass() {
        let mock = mock_with(&["r1"]);
        mock.add_loopback(
            "r1",
            "100",
            LoopbackSnapshot::new("10.0.0.1", "255.255.255.255", Some("old")),
        );
        let intent = NetworkIntent::from_value(json!({
            "devices": [{"name": "r1", "device_type": "ios", "loopbacks": [
                {"id": 100, "ipv4": "10.0.0.1", "netmask": "255.255.255.255"}
            ]}]
        }))
        .unwrap();
        let engine = IntentEngine::new(&mock, &NoEvents);

        let summary = engine.apply_intent(&intent, false);
        assert_eq!(summary.counts(), (1, 0));
        assert_eq!(mock.loopbacks("r1")["100"].description, None);
        assert!(mock.mutations().contains(&MockCall::DeleteDescription {
            device: "r1".to_string(),
            id: "100".to_string(),
        }));
        assert!(engine.plan(&intent).is_empty());
    }

    #[test]
    fn test_kept_description_sends_no_extra_delete() {
        let mock = mock_with(&["r1"]);
        mock.add_loopback(
            "r1",
            "100",
            LoopbackSnapshot::new("10.0.0.1", "255.255.255.255", Some("A")),
        );
        let intent = NetworkIntent::from_value(json!({
            "devices": [{"name": "r1", "device_type": "ios", "loopbacks": [
                {"id": 100, "ipv4": "10.0.0.2", "netmask": "255.255.255.255", "description": "A"}
            ]}]
        }))
        .unwrap();

        let summary = IntentEngine::new(&mock, &NoEvents).apply_intent(&intent, false);
        assert_eq!(summary.counts(), (1, 0));
        assert!(
            !mock
                .mutations()
                .iter()
                .any(|c| matches!(c, MockCall::DeleteDescription { .. }))
        );
    }

    #[test]
    fn test_declined_plan_applies_nothing() {
        let mock = mock_with(&["dist-rtr01"]);
        let sink = MemorySink::new();
        let engine = IntentEngine::new(&mock, &sink);
        let changes = engine.plan(&intent(false));

        let mut asked = None;
        let outcome = engine
            .execute_plan(&changes, false, |plan| {
                asked = Some(plan.total());
                Ok::<_, String>(false)
            })
            .unwrap();

        assert_eq!(outcome, PlanOutcome::Declined);
        assert_eq!(asked, Some(2));
        assert!(mock.mutations().is_empty());

        let err = engine.execute_plan(&changes, false, |_| Err("no tty".to_string()));
        assert_eq!(err, Err("no tty".to_string()));
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_empty_plan_never_asks() {
        let mock = mock_with(&["dist-rtr01"]);
        let engine = IntentEngine::new(&mock, &NoEvents);
        let outcome = engine
            .execute_plan(&[], false, |_| -> Result<bool, String> {
                panic!("nothing to confirm")
            })
            .unwrap();
        assert_eq!(outcome, PlanOutcome::NoChanges);
    }

    #[test]
    fn test_dry_run_never_mutates() {
        let mock = mock_with(&["dist-rtr01"]);
        let engine = IntentEngine::new(&mock, &NoEvents);

        let summary = engine.apply_intent(&intent(true), true);
        assert!(summary.dry_run);
        assert_eq!(summary.counts(), (2, 0));
        assert!(mock.mutations().is_empty());
        assert!(mock.loopbacks("dist-rtr01").is_empty());
    }

    #[test]
    fn test_failure_does_not_stop_batch() {
        let mock = mock_with(&["r1"]);
        mock.fail_loopback("r1", "2");
        let changes = vec![
            Change::create("r1", "1", LoopbackSnapshot::new("10.0.0.1", "255.255.255.255", None)),
            Change::create("r1", "2", LoopbackSnapshot::new("10.0.0.2", "255.255.255.255", None)),
            Change::create("r1", "3", LoopbackSnapshot::new("10.0.0.3", "255.255.255.255", None)),
        ];
        let events = MemorySink::new();
        let engine = IntentEngine::new(&mock, &events);

        let summary = engine.apply_changes(&changes, false);
        assert_eq!(summary.counts(), (2, 1));
        let configured: Vec<_> = mock
            .mutations()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Configure { id, .. } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(configured, vec![1, 2, 3]);

        let errors = events.messages(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("[r1] CREATE loopback 2"));
    }

    #[test]
    fn test_unreachable_controller_means_empty_state() {
        let mock = mock_with(&["r1"]);
        mock.set_unreachable(true);
        let events = MemorySink::new();
        let engine = IntentEngine::new(&mock, &events);

        assert!(engine.current_loopbacks("r1").is_empty());
        assert!(events.contains("sync-from-device failed"));
        assert!(events.contains("could not retrieve config"));
    }

    #[test]
    fn test_unreadable_shape_means_empty_state() {
        let mock = mock_with(&["r1"]);
        mock.set_raw_config("r1", json!({"tailf-ncs:config": {}}));
        let events = MemorySink::new();
        let engine = IntentEngine::new(&mock, &events);

        assert!(engine.current_loopbacks("r1").is_empty());
        let debug_only = events
            .events()
            .into_iter()
            .any(|(s, m)| s == Severity::Debug && m.contains("not found"));
        assert!(debug_only);
    }

    #[test]
    fn test_verification_catches_ignored_write() {
        let mock = mock_with(&["r1"]);
        mock.ignore_writes("r1");
        let engine = IntentEngine::new(&mock, &NoEvents);
        let change = Change::create("r1", "1", LoopbackSnapshot::new("10.0.0.1", "255.255.255.255", None));

        let err = engine.apply_change(&change, false).unwrap_err();
        assert!(matches!(err, ApplyError::Verification { .. }));
        assert!(err.to_string().contains("not present after create"));

        let unverified = IntentEngine::new(&mock, &NoEvents).with_options(EngineOptions {
            verify: false,
            ..EngineOptions::default()
        });
        let applied = unverified.apply_change(&change, false).unwrap();
        assert!(!applied.verified);
    }

    #[test]
    fn test_verification_needs_sync() {
        let mock = mock_with(&["r1"]);
        mock.fail_sync("r1");
        let engine = IntentEngine::new(&mock, &NoEvents);
        let change = Change::create("r1", "1", LoopbackSnapshot::new("10.0.0.1", "255.255.255.255", None));

        let err = engine.apply_change(&change, false).unwrap_err();
        assert!(matches!(err, ApplyError::Unsynced { .. }));
        // The write itself went through; only confirmation is missing
        assert!(mock.loopbacks("r1").contains_key("1"));
    }

    #[test]
    fn test_verified_apply_syncs_after_mutation() {
        let mock = mock_with(&["r1"]);
        let engine = IntentEngine::new(&mock, &NoEvents);
        let change = Change::create("r1", "1", LoopbackSnapshot::new("10.0.0.1", "255.255.255.255", None));

        let applied = engine.apply_change(&change, false).unwrap();
        assert!(applied.verified);
        assert_eq!(
            mock.calls(),
            vec![
                MockCall::Configure {
                    device: "r1".into(),
                    id: 1
                },
                MockCall::Sync("r1".into()),
            ]
        );
    }

    #[test]
    fn test_tracked_apply_records_rollback_ids() {
        let mock = mock_with(&["dist-rtr01"]);
        let engine = IntentEngine::new(&mock, &NoEvents).with_options(EngineOptions {
            track_rollback: true,
            ..EngineOptions::default()
        });

        let summary = engine.apply_intent(&intent(false), false);
        assert_eq!(summary.rollback_ids().len(), 2);

        engine.rollback(RollbackTarget::Relative(0)).unwrap();
        assert_eq!(mock.loopbacks("dist-rtr01").len(), 1);
        engine
            .rollback(RollbackTarget::Fixed(summary.rollback_ids()[0]))
            .unwrap();
        assert!(mock.loopbacks("dist-rtr01").is_empty());
    }

    #[test]
    fn test_failed_apply_never_rolls_back() {
        let mock = mock_with(&["dist-rtr01"]);
        mock.fail_loopback("dist-rtr01", "101");
        let engine = IntentEngine::new(&mock, &NoEvents);

        let summary = engine.apply_intent(&intent(false), false);
        assert_eq!(summary.counts(), (1, 1));
        assert!(
            !mock
                .calls()
                .iter()
                .any(|c| matches!(c, MockCall::Rollback(_)))
        );
        assert!(mock.loopbacks("dist-rtr01").contains_key("100"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential_mock = mock_with(&["r1", "r2", "r3"]);
        let sequential = IntentEngine::new(&sequential_mock, &NoEvents)
            .apply_intent(&two_devices(), false);

        let parallel_mock = mock_with(&["r1", "r2", "r3"]);
        parallel_mock.fail_loopback("r2", "1");
        let parallel = IntentEngine::new(&parallel_mock, &NoEvents)
            .with_options(EngineOptions {
                jobs: 3,
                ..EngineOptions::default()
            })
            .apply_intent(&two_devices(), false);

        assert_eq!(sequential.counts(), (4, 0));
        assert_eq!(parallel.counts(), (3, 1));
        let devices: Vec<_> = parallel.results.iter().map(|r| r.device.as_str()).collect();
        assert_eq!(devices, vec!["r1", "r1", "r2", "r3"]);
    }

    #[test]
    fn test_unknown_device_fails_change_not_batch() {
        let mock = mock_with(&["r1", "r2"]);
        let intent = NetworkIntent::from_value(json!({
            "devices": [
                {"name": "ghost", "device_type": "ios", "loopbacks": [{"id": 1, "ipv4": "10.0.0.1", "netmask": "255.255.255.255"}]},
                {"name": "r1", "device_type": "ios", "loopbacks": [{"id": 1, "ipv4": "10.0.0.1", "netmask": "255.255.255.255"}]}
            ]
        }))
        .unwrap();

        let summary = IntentEngine::new(&mock, &NoEvents).apply_intent(&intent, false);
        assert_eq!(summary.counts(), (1, 1));
        assert_eq!(summary.failures().next().unwrap().device, "ghost");
    }

    #[test]
    fn test_preview_uses_controller_dry_run() {
        let mock = mock_with(&["r1"]);
        let engine = IntentEngine::new(&mock, &NoEvents);
        let create = Change::create("r1", "5", LoopbackSnapshot::new("10.0.0.5", "255.255.255.255", None));
        let delete = Change::delete("r1", "6", LoopbackSnapshot::default());

        let native = engine.preview(&create).unwrap().unwrap();
        assert!(native.to_string().contains("interface Loopback5"));
        assert!(engine.preview(&delete).unwrap().is_none());
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_invalid_change_is_a_failure() {
        let mock = mock_with(&["r1"]);
        let engine = IntentEngine::new(&mock, &NoEvents);

        let bad_id = Change::create("r1", "lo0", LoopbackSnapshot::new("10.0.0.1", "255.255.255.255", None));
        assert!(matches!(
            engine.apply_change(&bad_id, false),
            Err(ApplyError::InvalidId { .. })
        ));

        let no_ip = Change::create("r1", "1", LoopbackSnapshot::default());
        assert!(matches!(
            engine.apply_change(&no_ip, false),
            Err(ApplyError::MissingDesired { field: "ip", .. })
        ));
        assert!(mock.mutations().is_empty());
    }
}

//! A single unit of drift between desired and current state

use crate::types::{Action, ResourceKind};
use restconf::LoopbackSnapshot;
use serde::Serialize;
use std::fmt;

/// One field that differs between the current and desired snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// A planned change to one resource on one device
///
/// `current` is absent for creates and `desired` is absent for deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    action: Action,
    device: String,
    resource_type: ResourceKind,
    resource_id: String,
    current: Option<LoopbackSnapshot>,
    desired: Option<LoopbackSnapshot>,
}

impl Change {
    pub fn create(device: &str, id: &str, desired: LoopbackSnapshot) -> Self {
        Self {
            action: Action::Create,
            device: device.to_string(),
            resource_type: ResourceKind::Loopback,
            resource_id: id.to_string(),
            current: None,
            desired: Some(desired),
        }
    }

    pub fn update(
        device: &str,
        id: &str,
        current: LoopbackSnapshot,
        desired: LoopbackSnapshot,
    ) -> Self {
        Self {
            action: Action::Update,
            device: device.to_string(),
            resource_type: ResourceKind::Loopback,
            resource_id: id.to_string(),
            current: Some(current),
            desired: Some(desired),
        }
    }

    pub fn delete(device: &str, id: &str, current: LoopbackSnapshot) -> Self {
        Self {
            action: Action::Delete,
            device: device.to_string(),
            resource_type: ResourceKind::Loopback,
            resource_id: id.to_string(),
            current: Some(current),
            desired: None,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn resource_type(&self) -> ResourceKind {
        self.resource_type
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn current(&self) -> Option<&LoopbackSnapshot> {
        self.current.as_ref()
    }

    pub fn desired(&self) -> Option<&LoopbackSnapshot> {
        self.desired.as_ref()
    }

    /// Fields that differ, in `ip`, `netmask`, `description` order
    pub fn changed_fields(&self) -> Vec<FieldChange> {
        let empty = LoopbackSnapshot::default();
        let from = self.current.as_ref().unwrap_or(&empty);
        let to = self.desired.as_ref().unwrap_or(&empty);

        [
            ("ip", &from.ip, &to.ip),
            ("netmask", &from.netmask, &to.netmask),
            ("description", &from.description, &to.description),
        ]
        .into_iter()
        .filter(|(_, a, b)| a != b)
        .map(|(field, a, b)| FieldChange {
            field,
            from: a.clone(),
            to: b.clone(),
        })
        .collect()
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {}",
            self.device, self.action, self.resource_type, self.resource_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let change = Change::create(
            "dist-rtr01",
            "100",
            LoopbackSnapshot::new("10.0.0.1", "255.255.255.255", None),
        );
        assert_eq!(change.to_string(), "[dist-rtr01] CREATE loopback 100");

        let change = Change::delete("dist-rtr01", "999", LoopbackSnapshot::default());
        assert_eq!(change.to_string(), "[dist-rtr01] DELETE loopback 999");
        assert!(change.desired().is_none());
    }

    #[test]
    fn test_changed_fields() {
        let change = Change::update(
            "r1",
            "100",
            LoopbackSnapshot::new("10.0.0.1", "255.255.255.255", Some("A")),
            LoopbackSnapshot::new("10.0.0.2", "255.255.255.255", Some("A")),
        );
        let fields = change.changed_fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field, "ip");
        assert_eq!(fields[0].from.as_deref(), Some("10.0.0.1"));
        assert_eq!(fields[0].to.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn test_create_lists_every_set_field() {
        let change = Change::create(
            "r1",
            "1",
            LoopbackSnapshot::new("10.0.0.1", "255.255.255.0", None),
        );
        let names: Vec<_> = change.changed_fields().iter().map(|f| f.field).collect();
        assert_eq!(names, vec!["ip", "netmask"]);
    }
}

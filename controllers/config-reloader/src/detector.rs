//! Change detection for watched resource updates.
//!
//! Decides whether an update of a ConfigMap or Secret must roll the workloads
//! that share its match label, and logs what changed.

use crate::resource::{PayloadSection, ResourceKind, Snapshot};
use serde_json::Value;
use tracing::{debug, info};

/// A request to restart every workload in `namespace` whose match label
/// equals `label_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutEvent {
    pub namespace: String,
    pub label_value: String,
    /// Resource whose change produced the event
    pub source_kind: ResourceKind,
    pub source_name: String,
}

/// Gates updates on the match label and compares payloads.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    match_label: String,
}

impl ChangeDetector {
    pub fn new(match_label: impl Into<String>) -> Self {
        Self {
            match_label: match_label.into(),
        }
    }

    /// Compares two versions of the same resource.
    ///
    /// The previous version is authoritative for relevance: it must carry
    /// the match label, and its value is the one propagated to workloads.
    /// Returns `None` when the update is irrelevant or no payload section
    /// changed.
    #[must_use]
    pub fn detect(&self, old: &Snapshot, new: &Snapshot) -> Option<RolloutEvent> {
        let Some(label_value) = old.label(&self.match_label) else {
            debug!(
                kind = %old.kind,
                namespace = %old.namespace,
                name = %old.name,
                "Ignoring update of resource without match label"
            );
            return None;
        };

        let changed = old.changed_sections(new);
        if changed.is_empty() {
            debug!(
                kind = %old.kind,
                namespace = %old.namespace,
                name = %old.name,
                "Payload unchanged, skipping rollout"
            );
            return None;
        }

        for section in &changed {
            log_section_diff(old, new, section);
        }

        info!(
            kind = %old.kind,
            namespace = %old.namespace,
            name = %old.name,
            "Going to rollout resources labeled with {}:{}",
            self.match_label,
            label_value
        );

        Some(RolloutEvent {
            namespace: old.namespace.clone(),
            label_value: label_value.to_string(),
            source_kind: old.kind,
            source_name: old.name.clone(),
        })
    }
}

fn log_section_diff(old: &Snapshot, new: &Snapshot, section: &str) {
    match section_diff(old.kind, old.payload.get(section), new.payload.get(section)) {
        Ok(diff) => info!(
            kind = %old.kind,
            namespace = %old.namespace,
            name = %old.name,
            section,
            diff = %diff,
            "Payload changed"
        ),
        // Diagnostic only
        Err(e) => debug!(
            kind = %old.kind,
            namespace = %old.namespace,
            name = %old.name,
            section,
            error = %e,
            "Failed to compute payload diff"
        ),
    }
}

/// JSON Patch turning `old` into `new`. Secret values are stripped so only
/// the operations and key paths are logged.
fn section_diff(
    kind: ResourceKind,
    old: Option<&PayloadSection>,
    new: Option<&PayloadSection>,
) -> Result<Value, serde_json::Error> {
    let old = serde_json::to_value(old)?;
    let new = serde_json::to_value(new)?;
    let mut diff = serde_json::to_value(json_patch::diff(&old, &new))?;

    if kind == ResourceKind::Secret {
        if let Value::Array(ops) = &mut diff {
            for op in ops.iter_mut().filter_map(Value::as_object_mut) {
                op.remove("value");
            }
        }
    }
    Ok(diff)
}

//! Workload models
//!
//! Kind-agnostic views of `Deployment`, `StatefulSet` and `DaemonSet`
//! objects, plus the restart patch they all share.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::fmt;

/// Pod-template annotation whose change makes the workload roll its pods.
pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// Field manager recorded on every restart patch.
pub const FIELD_MANAGER: &str = "cnvrg-cre-rollout";

/// Workload kinds that can be restarted through their pod template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl WorkloadKind {
    /// All kinds, in the order they are scanned.
    pub const ALL: [WorkloadKind; 3] = [
        WorkloadKind::Deployment,
        WorkloadKind::StatefulSet,
        WorkloadKind::DaemonSet,
    ];

    /// Kubernetes `kind` string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one workload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkloadRef {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
}

impl WorkloadRef {
    pub fn new(kind: WorkloadKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// A listed workload. Never cached; built fresh from each list response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

impl Workload {
    /// Builds a workload view from object metadata.
    ///
    /// Returns `None` when the metadata has no name, which the API server
    /// never produces for listed objects.
    #[must_use]
    pub fn from_meta(kind: WorkloadKind, fallback_namespace: &str, meta: &ObjectMeta) -> Option<Self> {
        let name = meta.name.clone()?;
        Some(Self {
            kind,
            namespace: meta
                .namespace
                .clone()
                .unwrap_or_else(|| fallback_namespace.to_string()),
            name,
            labels: meta.labels.clone().unwrap_or_default(),
        })
    }

    /// Value of a label, if the workload carries the key.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// True when the workload carries `key` with exactly `value`.
    #[must_use]
    pub fn matches_label(&self, key: &str, value: &str) -> bool {
        self.label(key) == Some(value)
    }

    #[must_use]
    pub fn reference(&self) -> WorkloadRef {
        WorkloadRef::new(self.kind, self.namespace.clone(), self.name.clone())
    }
}

/// Patch body that sets the restart annotation on the pod template.
#[must_use]
pub fn restart_patch(restarted_at: &str) -> serde_json::Value {
    serde_json::json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": {
                        RESTARTED_AT_ANNOTATION: restarted_at
                    }
                }
            }
        }
    })
}

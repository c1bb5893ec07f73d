//! WorkloadClient trait for mocking
//!
//! The concrete `KubeWorkloadClient` implements this trait, and controller
//! tests use `MockWorkloadClient` instead of a live cluster.

use crate::error::WorkloadError;
use crate::models::{Workload, WorkloadKind, WorkloadRef};

/// Workload operations the rollout pipeline depends on.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait WorkloadClientTrait: Send + Sync {
    /// Lists workloads of `kind` in `namespace` that carry the label key
    /// `label_key`, whatever its value.
    async fn list_labeled(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        label_key: &str,
    ) -> Result<Vec<Workload>, WorkloadError>;

    /// Sets the pod-template restart annotation of one workload to
    /// `restarted_at`.
    async fn restart(&self, workload: &WorkloadRef, restarted_at: &str) -> Result<(), WorkloadError>;
}

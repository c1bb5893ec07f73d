//! Workload restart trigger.
//!
//! A restart is a patch of the pod-template `restartedAt` annotation to the
//! current time. The workload controller sees a changed template and rolls
//! the pods; the logical spec is untouched. Repeating the patch only moves
//! the timestamp, so concurrent triggers converge on the last write.

use crate::retry::{RetryConfig, retry_with_backoff};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::info;
use workload_client::{WorkloadClientTrait, WorkloadError, WorkloadRef};

/// Patches workloads so they roll their pods.
#[derive(Clone)]
pub struct RestartTrigger {
    client: Arc<dyn WorkloadClientTrait>,
    retry: RetryConfig,
}

impl RestartTrigger {
    pub fn new(client: Arc<dyn WorkloadClientTrait>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Restarts one workload, retrying transient failures.
    ///
    /// Returns the timestamp written to the annotation.
    pub async fn restart(&self, workload: &WorkloadRef) -> Result<String, WorkloadError> {
        let restarted_at = restart_timestamp();
        let operation = format!("restart {workload}");

        retry_with_backoff(&self.retry, &operation, || self.client.restart(workload, &restarted_at)).await?;

        info!(
            kind = %workload.kind,
            namespace = %workload.namespace,
            name = %workload.name,
            restarted_at = %restarted_at,
            "Triggered rollout"
        );
        Ok(restarted_at)
    }
}

/// Current UTC time in RFC 3339 with microseconds, so two restarts in the
/// same second still write different values.
fn restart_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

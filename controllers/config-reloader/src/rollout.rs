//! Rollout coordination.
//!
//! Turns a `RolloutEvent` into restarts: every Deployment, StatefulSet and
//! DaemonSet in the event's namespace whose match label equals the event's
//! label value is restarted. Workloads are listed fresh for every event.
//!
//! Failures stay scoped to this rollout: a kind that cannot be listed is
//! skipped, a workload that cannot be patched is skipped, and both are
//! recorded in the returned report.

use crate::detector::RolloutEvent;
use crate::restart::RestartTrigger;
use crate::retry::{RetryConfig, retry_with_backoff};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};
use workload_client::{WorkloadClientTrait, WorkloadKind, WorkloadRef};

/// Outcome of one rollout.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RolloutReport {
    pub restarted: Vec<WorkloadRef>,
    /// Workloads whose restart failed after retries, with the last error
    pub failed_restarts: Vec<(WorkloadRef, String)>,
    /// Kinds whose listing failed after retries, with the last error
    pub failed_listings: Vec<(WorkloadKind, String)>,
}

impl RolloutReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_restarts.is_empty() && self.failed_listings.is_empty()
    }

    fn merge(&mut self, other: RolloutReport) {
        self.restarted.extend(other.restarted);
        self.failed_restarts.extend(other.failed_restarts);
        self.failed_listings.extend(other.failed_listings);
    }
}

/// Finds and restarts the workloads matching a rollout event.
pub struct RolloutCoordinator {
    client: Arc<dyn WorkloadClientTrait>,
    trigger: RestartTrigger,
    match_label: String,
    retry: RetryConfig,
}

impl RolloutCoordinator {
    pub fn new(client: Arc<dyn WorkloadClientTrait>, match_label: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            trigger: RestartTrigger::new(Arc::clone(&client), retry.clone()),
            client,
            match_label: match_label.into(),
            retry,
        }
    }

    /// Restarts every matching workload of every kind.
    ///
    /// The three kind scans run concurrently; restarts within a kind run in
    /// list order.
    pub async fn rollout(&self, event: &RolloutEvent) -> RolloutReport {
        let scans = WorkloadKind::ALL.map(|kind| self.rollout_kind(kind, event));

        let mut report = RolloutReport::default();
        for scan in join_all(scans).await {
            report.merge(scan);
        }

        if report.is_clean() {
            info!(
                namespace = %event.namespace,
                label = %self.match_label,
                value = %event.label_value,
                source_kind = %event.source_kind,
                source = %event.source_name,
                restarted = report.restarted.len(),
                "Rollout complete"
            );
        } else {
            warn!(
                namespace = %event.namespace,
                label = %self.match_label,
                value = %event.label_value,
                source_kind = %event.source_kind,
                source = %event.source_name,
                restarted = report.restarted.len(),
                failed_restarts = report.failed_restarts.len(),
                failed_listings = report.failed_listings.len(),
                "Rollout completed with failures"
            );
        }
        report
    }

    async fn rollout_kind(&self, kind: WorkloadKind, event: &RolloutEvent) -> RolloutReport {
        let mut report = RolloutReport::default();
        let namespace = event.namespace.as_str();
        let operation = format!("list {kind}s in {namespace}");

        let listed = retry_with_backoff(&self.retry, &operation, || {
            self.client.list_labeled(kind, namespace, &self.match_label)
        })
        .await;

        let workloads = match listed {
            Ok(workloads) => workloads,
            Err(e) => {
                error!(
                    %kind,
                    namespace,
                    label = %self.match_label,
                    value = %event.label_value,
                    error = %e,
                    "Failed to list workloads, skipping kind for this rollout"
                );
                report.failed_listings.push((kind, e.to_string()));
                return report;
            }
        };

        for workload in workloads
            .iter()
            .filter(|w| w.matches_label(&self.match_label, &event.label_value))
        {
            let reference = workload.reference();
            match self.trigger.restart(&reference).await {
                Ok(_) => report.restarted.push(reference),
                Err(e) => {
                    error!(
                        %kind,
                        namespace,
                        name = %workload.name,
                        value = %event.label_value,
                        error = %e,
                        "Failed to trigger rollout, skipping workload"
                    );
                    report.failed_restarts.push((reference, e.to_string()));
                }
            }
        }
        report
    }
}

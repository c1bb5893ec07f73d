//! Mock WorkloadClient for unit testing
//!
//! Stores workloads in memory and behaves like the API server for the two
//! operations the controller uses: label-key selector listing and restart
//! patching. Failures can be injected per kind/namespace (listing) or per
//! workload (patching) to exercise retry and error scoping.

use crate::error::WorkloadError;
use crate::models::{RESTARTED_AT_ANNOTATION, Workload, WorkloadKind, WorkloadRef};
use crate::workload_trait::WorkloadClientTrait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
pub(crate) struct MockWorkload {
    pub(crate) labels: BTreeMap<String, String>,
    pub(crate) template_annotations: BTreeMap<String, String>,
}

/// Mock WorkloadClient for testing
#[derive(Clone, Default)]
pub struct MockWorkloadClient {
    pub(crate) workloads: Arc<Mutex<BTreeMap<WorkloadRef, MockWorkload>>>,
    // Remaining injected failures
    pub(crate) list_failures: Arc<Mutex<HashMap<(WorkloadKind, String), u32>>>,
    pub(crate) restart_failures: Arc<Mutex<HashMap<WorkloadRef, u32>>>,
    // Call log
    pub(crate) list_calls: Arc<Mutex<Vec<(WorkloadKind, String, String)>>>,
    pub(crate) restarts: Arc<Mutex<Vec<(WorkloadRef, String)>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockWorkloadClient {
    /// Create an empty mock client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a workload to the mock store (for test setup)
    pub fn add_workload(&self, kind: WorkloadKind, namespace: &str, name: &str, labels: &[(&str, &str)]) {
        let workload = MockWorkload {
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            template_annotations: BTreeMap::new(),
        };
        lock(&self.workloads).insert(WorkloadRef::new(kind, namespace, name), workload);
    }

    /// Make the next `times` listings of `kind` in `namespace` fail
    pub fn fail_list(&self, kind: WorkloadKind, namespace: &str, times: u32) {
        lock(&self.list_failures).insert((kind, namespace.to_string()), times);
    }

    /// Make the next `times` restarts of `workload` fail
    pub fn fail_restart(&self, workload: &WorkloadRef, times: u32) {
        lock(&self.restart_failures).insert(workload.clone(), times);
    }

    /// Current restart annotation of a workload, if it has been restarted
    #[must_use]
    pub fn restarted_at(&self, workload: &WorkloadRef) -> Option<String> {
        lock(&self.workloads)
            .get(workload)
            .and_then(|w| w.template_annotations.get(RESTARTED_AT_ANNOTATION).cloned())
    }

    /// Successful restarts in the order they were applied
    #[must_use]
    pub fn restarts(&self) -> Vec<(WorkloadRef, String)> {
        lock(&self.restarts).clone()
    }

    /// Workloads restarted at least once, sorted
    #[must_use]
    pub fn restarted_workloads(&self) -> Vec<WorkloadRef> {
        let mut refs: Vec<WorkloadRef> = lock(&self.restarts).iter().map(|(r, _)| r.clone()).collect();
        refs.sort();
        refs.dedup();
        refs
    }

    /// Listing calls as `(kind, namespace, selector)`
    #[must_use]
    pub fn list_calls(&self) -> Vec<(WorkloadKind, String, String)> {
        lock(&self.list_calls).clone()
    }

    fn take_failure<K: std::hash::Hash + Eq>(failures: &Mutex<HashMap<K, u32>>, key: &K) -> bool {
        let mut failures = lock(failures);
        match failures.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait::async_trait]
impl WorkloadClientTrait for MockWorkloadClient {
    async fn list_labeled(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        label_key: &str,
    ) -> Result<Vec<Workload>, WorkloadError> {
        lock(&self.list_calls).push((kind, namespace.to_string(), label_key.to_string()));

        if Self::take_failure(&self.list_failures, &(kind, namespace.to_string())) {
            return Err(WorkloadError::Api(format!(
                "injected failure listing {kind} in namespace {namespace}"
            )));
        }

        // Selector is key presence, as the API server applies it
        Ok(lock(&self.workloads)
            .iter()
            .filter(|(r, w)| r.kind == kind && r.namespace == namespace && w.labels.contains_key(label_key))
            .map(|(r, w)| Workload {
                kind: r.kind,
                namespace: r.namespace.clone(),
                name: r.name.clone(),
                labels: w.labels.clone(),
            })
            .collect())
    }

    async fn restart(&self, workload: &WorkloadRef, restarted_at: &str) -> Result<(), WorkloadError> {
        if Self::take_failure(&self.restart_failures, workload) {
            return Err(WorkloadError::Api(format!("injected failure patching {workload}")));
        }

        let mut workloads = lock(&self.workloads);
        let stored = workloads
            .get_mut(workload)
            .ok_or_else(|| WorkloadError::NotFound(workload.to_string()))?;
        stored
            .template_annotations
            .insert(RESTARTED_AT_ANNOTATION.to_string(), restarted_at.to_string());
        lock(&self.restarts).push((workload.clone(), restarted_at.to_string()));
        Ok(())
    }
}

//! Kubernetes-backed workload client

use crate::error::WorkloadError;
use crate::models::{restart_patch, Workload, WorkloadKind, WorkloadRef, FIELD_MANAGER};
use crate::workload_trait::WorkloadClientTrait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Workload client backed by a shared `kube::Client`.
///
/// `kube::Client` is a cheap handle; cloning this struct shares the same
/// underlying connection pool.
#[derive(Clone)]
pub struct KubeWorkloadClient {
    client: Client,
}

impl KubeWorkloadClient {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn list_kind<K>(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        label_key: &str,
    ) -> Result<Vec<Workload>, WorkloadError>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default().labels(label_key))
            .await
            .map_err(|e| api_error(e, &format!("{kind}s in {namespace}")))?;
        Ok(list
            .items
            .iter()
            .filter_map(|obj| Workload::from_meta(kind, namespace, obj.meta()))
            .collect())
    }

    async fn patch_kind<K>(&self, workload: &WorkloadRef, restarted_at: &str) -> Result<(), WorkloadError>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), &workload.namespace);
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PatchParams::default()
        };
        let body = restart_patch(restarted_at);
        api.patch(&workload.name, &params, &Patch::Strategic(&body))
            .await
            .map_err(|e| api_error(e, &workload.to_string()))?;
        Ok(())
    }
}

/// Classifies API server rejections; transport and client errors stay `Kube`.
fn api_error(err: kube::Error, target: &str) -> WorkloadError {
    match err {
        kube::Error::Api(response) if response.code == 404 => WorkloadError::NotFound(target.to_string()),
        kube::Error::Api(response) => WorkloadError::Api(format!(
            "{target}: {} ({}): {}",
            response.code, response.reason, response.message
        )),
        other => WorkloadError::Kube(other),
    }
}

#[async_trait::async_trait]
impl WorkloadClientTrait for KubeWorkloadClient {
    async fn list_labeled(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        label_key: &str,
    ) -> Result<Vec<Workload>, WorkloadError> {
        debug!(%kind, namespace, selector = label_key, "Listing workloads");
        match kind {
            WorkloadKind::Deployment => self.list_kind::<Deployment>(kind, namespace, label_key).await,
            WorkloadKind::StatefulSet => self.list_kind::<StatefulSet>(kind, namespace, label_key).await,
            WorkloadKind::DaemonSet => self.list_kind::<DaemonSet>(kind, namespace, label_key).await,
        }
    }

    async fn restart(&self, workload: &WorkloadRef, restarted_at: &str) -> Result<(), WorkloadError> {
        debug!(%workload, restarted_at, "Patching restart annotation");
        match workload.kind {
            WorkloadKind::Deployment => self.patch_kind::<Deployment>(workload, restarted_at).await,
            WorkloadKind::StatefulSet => self.patch_kind::<StatefulSet>(workload, restarted_at).await,
            WorkloadKind::DaemonSet => self.patch_kind::<DaemonSet>(workload, restarted_at).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;

    fn status(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("request failed with {code}"),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_missing_workload_is_not_found() {
        let err = api_error(status(404, "NotFound"), "Deployment ns1/app1");
        assert!(matches!(err, WorkloadError::NotFound(ref target) if target == "Deployment ns1/app1"));
    }

    #[test]
    fn test_rejected_request_is_api_error() {
        let err = api_error(status(403, "Forbidden"), "Deployment ns1/app1");
        match err {
            WorkloadError::Api(message) => {
                assert!(message.contains("403"));
                assert!(message.contains("Forbidden"));
                assert!(message.starts_with("Deployment ns1/app1"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_other_errors_stay_kube() {
        let err = api_error(kube::Error::LinesCodecMaxLineLengthExceeded, "Deployment ns1/app1");
        assert!(matches!(err, WorkloadError::Kube(_)));
    }
}

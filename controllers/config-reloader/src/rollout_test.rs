//! Unit tests for the rollout coordinator and the detector-to-restart path

#[cfg(test)]
mod tests {
    use crate::detector::RolloutEvent;
    use crate::resource::{ResourceKind, WatchedResource};
    use crate::retry::RetryConfig;
    use crate::rollout::RolloutCoordinator;
    use crate::test_utils::*;
    use std::sync::Arc;
    use workload_client::{MockWorkloadClient, WorkloadKind, WorkloadRef};

    const LABEL: &str = "foo";

    fn event(namespace: &str, value: &str) -> RolloutEvent {
        RolloutEvent {
            namespace: namespace.to_string(),
            label_value: value.to_string(),
            source_kind: ResourceKind::ConfigMap,
            source_name: "cm1".to_string(),
        }
    }

    fn coordinator(mock: &MockWorkloadClient) -> RolloutCoordinator {
        RolloutCoordinator::new(Arc::new(mock.clone()), LABEL, RetryConfig::fast(3))
    }

    fn deployment(namespace: &str, name: &str) -> WorkloadRef {
        WorkloadRef::new(WorkloadKind::Deployment, namespace, name)
    }

    #[tokio::test]
    async fn test_only_matching_label_value_is_restarted() {
        let mock = MockWorkloadClient::new();
        mock.add_workload(WorkloadKind::Deployment, "ns1", "app1", &[(LABEL, "autoreload-ccp")]);
        mock.add_workload(WorkloadKind::Deployment, "ns1", "app2", &[(LABEL, "autoreload-ccp")]);
        mock.add_workload(WorkloadKind::Deployment, "ns1", "app3", &[(LABEL, "other")]);

        let report = coordinator(&mock).rollout(&event("ns1", "autoreload-ccp")).await;

        assert!(report.is_clean());
        assert_eq!(
            mock.restarted_workloads(),
            vec![deployment("ns1", "app1"), deployment("ns1", "app2")]
        );
        assert_eq!(mock.restarted_at(&deployment("ns1", "app3")), None);
    }

    #[tokio::test]
    async fn test_unlabeled_workload_is_never_restarted() {
        let mock = MockWorkloadClient::new();
        mock.add_workload(WorkloadKind::Deployment, "ns1", "plain", &[("app", "plain")]);

        let report = coordinator(&mock).rollout(&event("ns1", "bar")).await;

        assert!(report.restarted.is_empty());
        assert!(mock.restarts().is_empty());
    }

    #[tokio::test]
    async fn test_other_namespaces_are_untouched() {
        let mock = MockWorkloadClient::new();
        mock.add_workload(WorkloadKind::Deployment, "ns1", "dep1", &[(LABEL, "bar")]);
        mock.add_workload(WorkloadKind::Deployment, "ns2", "dep1", &[(LABEL, "bar")]);

        coordinator(&mock).rollout(&event("ns1", "bar")).await;

        assert_eq!(mock.restarted_workloads(), vec![deployment("ns1", "dep1")]);
        assert!(mock.list_calls().iter().all(|(_, ns, _)| ns == "ns1"));
    }

    #[tokio::test]
    async fn test_all_kinds_are_listed_with_label_key_selector() {
        let mock = MockWorkloadClient::new();
        mock.add_workload(WorkloadKind::Deployment, "ns1", "web", &[(LABEL, "bar")]);
        mock.add_workload(WorkloadKind::StatefulSet, "ns1", "db", &[(LABEL, "bar")]);
        mock.add_workload(WorkloadKind::DaemonSet, "ns1", "agent", &[(LABEL, "bar")]);

        let report = coordinator(&mock).rollout(&event("ns1", "bar")).await;

        assert_eq!(report.restarted.len(), 3);
        let mut kinds: Vec<WorkloadKind> = mock.list_calls().iter().map(|(k, _, _)| *k).collect();
        kinds.sort();
        assert_eq!(kinds, WorkloadKind::ALL.to_vec());
        assert!(mock.list_calls().iter().all(|(_, _, selector)| selector == LABEL));
    }

    #[tokio::test]
    async fn test_listing_failure_does_not_block_other_kinds() {
        let mock = MockWorkloadClient::new();
        mock.add_workload(WorkloadKind::Deployment, "ns1", "web", &[(LABEL, "bar")]);
        mock.add_workload(WorkloadKind::StatefulSet, "ns1", "db", &[(LABEL, "bar")]);
        mock.add_workload(WorkloadKind::DaemonSet, "ns1", "agent", &[(LABEL, "bar")]);
        mock.fail_list(WorkloadKind::Deployment, "ns1", 10);

        let report = coordinator(&mock).rollout(&event("ns1", "bar")).await;

        assert_eq!(report.failed_listings.len(), 1);
        assert_eq!(report.failed_listings[0].0, WorkloadKind::Deployment);
        assert_eq!(
            mock.restarted_workloads(),
            vec![
                WorkloadRef::new(WorkloadKind::StatefulSet, "ns1", "db"),
                WorkloadRef::new(WorkloadKind::DaemonSet, "ns1", "agent"),
            ]
        );
    }

    #[tokio::test]
    async fn test_transient_listing_failure_is_retried() {
        let mock = MockWorkloadClient::new();
        mock.add_workload(WorkloadKind::Deployment, "ns1", "web", &[(LABEL, "bar")]);
        mock.fail_list(WorkloadKind::Deployment, "ns1", 2);

        let report = coordinator(&mock).rollout(&event("ns1", "bar")).await;

        assert!(report.is_clean());
        assert_eq!(report.restarted, vec![deployment("ns1", "web")]);
    }

    #[tokio::test]
    async fn test_patch_failure_skips_only_that_workload() {
        let mock = MockWorkloadClient::new();
        mock.add_workload(WorkloadKind::Deployment, "ns1", "app1", &[(LABEL, "bar")]);
        mock.add_workload(WorkloadKind::Deployment, "ns1", "app2", &[(LABEL, "bar")]);
        mock.fail_restart(&deployment("ns1", "app1"), 10);

        let report = coordinator(&mock).rollout(&event("ns1", "bar")).await;

        assert_eq!(report.failed_restarts.len(), 1);
        assert_eq!(report.failed_restarts[0].0, deployment("ns1", "app1"));
        assert_eq!(mock.restarted_workloads(), vec![deployment("ns1", "app2")]);
    }

    #[tokio::test]
    async fn test_transient_patch_failure_is_retried() {
        let mock = MockWorkloadClient::new();
        mock.add_workload(WorkloadKind::Deployment, "ns1", "app1", &[(LABEL, "bar")]);
        mock.fail_restart(&deployment("ns1", "app1"), 1);

        let report = coordinator(&mock).rollout(&event("ns1", "bar")).await;

        assert!(report.is_clean());
        assert!(mock.restarted_at(&deployment("ns1", "app1")).is_some());
    }

    #[tokio::test]
    async fn test_config_map_update_restarts_labeled_deployment() {
        let mock = MockWorkloadClient::new();
        mock.add_workload(WorkloadKind::Deployment, "ns1", "dep1", &[(LABEL, "bar")]);
        mock.add_workload(WorkloadKind::Deployment, "ns2", "dep1", &[(LABEL, "bar")]);
        let (detector, coordinator) = pipeline(LABEL, &mock);

        let old = config_map("ns1", "cm1", &[(LABEL, "bar")], &[("x", "1")]);
        let new = with_version(&config_map("ns1", "cm1", &[(LABEL, "bar")], &[("x", "2")]), "2");

        let event = detector
            .detect(&old.snapshot(), &new.snapshot())
            .expect("data change should trigger a rollout");
        coordinator.rollout(&event).await;

        assert_eq!(mock.restarted_workloads(), vec![deployment("ns1", "dep1")]);
    }

    #[tokio::test]
    async fn test_secret_update_without_payload_change_restarts_nothing() {
        let mock = MockWorkloadClient::new();
        mock.add_workload(WorkloadKind::Deployment, "ns1", "dep1", &[(LABEL, "bar")]);
        let (detector, _coordinator) = pipeline(LABEL, &mock);

        let old = secret("ns1", "s1", &[(LABEL, "bar")], &[("k", "v")], &[]);
        let new = with_version(&secret("ns1", "s1", &[(LABEL, "bar"), ("team", "ml")], &[("k", "v")], &[]), "2");

        assert_eq!(detector.detect(&old.snapshot(), &new.snapshot()), None);
        assert!(mock.restarts().is_empty());
    }
}

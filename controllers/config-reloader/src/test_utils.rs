//! Test utilities for building watched resources and pipelines
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::detector::ChangeDetector;
use crate::retry::RetryConfig;
use crate::rollout::RolloutCoordinator;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;
use workload_client::MockWorkloadClient;

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn meta(namespace: &str, name: &str, labels: &[(&str, &str)]) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: (!labels.is_empty()).then(|| string_map(labels)),
        resource_version: Some("1".to_string()),
        ..Default::default()
    }
}

/// Helper to create a test ConfigMap with string `data`
pub fn config_map(namespace: &str, name: &str, labels: &[(&str, &str)], data: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: meta(namespace, name, labels),
        data: (!data.is_empty()).then(|| string_map(data)),
        ..Default::default()
    }
}

/// Helper to create a test Secret; `data` values are stored as bytes
pub fn secret(
    namespace: &str,
    name: &str,
    labels: &[(&str, &str)],
    data: &[(&str, &str)],
    string_data: &[(&str, &str)],
) -> Secret {
    Secret {
        metadata: meta(namespace, name, labels),
        data: (!data.is_empty()).then(|| {
            data.iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                .collect()
        }),
        string_data: (!string_data.is_empty()).then(|| string_map(string_data)),
        ..Default::default()
    }
}

/// Returns a copy of `obj` with the given resource version
pub fn with_version<K: kube::Resource + Clone>(obj: &K, version: &str) -> K {
    let mut obj = obj.clone();
    obj.meta_mut().resource_version = Some(version.to_string());
    obj
}

/// Change detector and coordinator wired to a mock workload client
pub fn pipeline(match_label: &str, mock: &MockWorkloadClient) -> (ChangeDetector, RolloutCoordinator) {
    let detector = ChangeDetector::new(match_label);
    let coordinator = RolloutCoordinator::new(Arc::new(mock.clone()), match_label, RetryConfig::fast(3));
    (detector, coordinator)
}

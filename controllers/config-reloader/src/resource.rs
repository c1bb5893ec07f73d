//! Watched resource kinds and their comparison snapshots.
//!
//! `ConfigMap` and `Secret` are both reduced to a `Snapshot`: identity,
//! labels, and named payload sections that are compared by deep equality.

use k8s_openapi::ByteString;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a watched resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ConfigMap,
    Secret,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::ConfigMap => f.write_str("ConfigMap"),
            ResourceKind::Secret => f.write_str("Secret"),
        }
    }
}

/// One payload mapping of a watched resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PayloadSection {
    Text(BTreeMap<String, String>),
    Binary(BTreeMap<String, ByteString>),
}

/// Comparison-ready view of a ConfigMap or Secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    /// Payload mappings keyed by their API field name
    pub payload: BTreeMap<&'static str, PayloadSection>,
}

impl Snapshot {
    /// Value of a label, if present.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Names of the payload sections that differ between `self` and `other`.
    #[must_use]
    pub fn changed_sections(&self, other: &Snapshot) -> Vec<&'static str> {
        let empty_text = PayloadSection::Text(BTreeMap::new());
        let mut names: Vec<&'static str> = self.payload.keys().chain(other.payload.keys()).copied().collect();
        names.sort_unstable();
        names.dedup();
        names
            .into_iter()
            .filter(|name| {
                let old = self.payload.get(name).unwrap_or(&empty_text);
                let new = other.payload.get(name).unwrap_or(&empty_text);
                old != new
            })
            .collect()
    }
}

/// A namespaced resource whose payload changes trigger rollouts.
pub trait WatchedResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + DeserializeOwned
    + fmt::Debug
    + Send
    + Sync
    + 'static
{
    const KIND: ResourceKind;

    /// Payload mappings, keyed by API field name. Absent fields are empty.
    fn payload(&self) -> BTreeMap<&'static str, PayloadSection>;

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            kind: Self::KIND,
            namespace: self.namespace().unwrap_or_default(),
            name: self.name_any(),
            labels: self.labels().clone(),
            payload: self.payload(),
        }
    }
}

impl WatchedResource for ConfigMap {
    const KIND: ResourceKind = ResourceKind::ConfigMap;

    fn payload(&self) -> BTreeMap<&'static str, PayloadSection> {
        BTreeMap::from([
            ("data", PayloadSection::Text(self.data.clone().unwrap_or_default())),
            ("binaryData", PayloadSection::Binary(self.binary_data.clone().unwrap_or_default())),
        ])
    }
}

impl WatchedResource for Secret {
    const KIND: ResourceKind = ResourceKind::Secret;

    fn payload(&self) -> BTreeMap<&'static str, PayloadSection> {
        BTreeMap::from([
            ("data", PayloadSection::Binary(self.data.clone().unwrap_or_default())),
            ("stringData", PayloadSection::Text(self.string_data.clone().unwrap_or_default())),
        ])
    }
}

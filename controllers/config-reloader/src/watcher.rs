//! Kubernetes resource watchers.
//!
//! One watcher runs per watched kind (ConfigMap, Secret). Each keeps a local
//! mirror of the collection fed by `kube_runtime::watcher`, turns
//! notifications into add/update/delete transitions, and hands every update
//! to the change detector and, when it fires, the rollout coordinator.
//!
//! Stream interruptions are absorbed by the watcher's default backoff, which
//! re-lists and resumes; the re-list is reconciled against the mirror.

use crate::detector::ChangeDetector;
use crate::error::ControllerError;
use crate::resource::WatchedResource;
use crate::rollout::{RolloutCoordinator, RolloutReport};
use futures::StreamExt;
use kube::{Api, ResourceExt};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{WatchStreamExt, watcher};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of observing one object in the mirror.
#[derive(Debug)]
pub enum Transition<K> {
    /// First time this object is seen
    Added,
    /// Same resource version as the mirrored copy
    Unchanged,
    /// Newer version of a mirrored object
    Updated { old: K, new: K },
}

/// In-memory copy of the most recent observed state of each object.
///
/// Holds exactly one version per object; the previous version is handed
/// out with `Transition::Updated` and dropped by the caller after comparison.
#[derive(Debug)]
pub struct LocalMirror<K: WatchedResource> {
    objects: HashMap<ObjectRef<K>, K>,
    /// Objects seen since the current re-list started
    relisted: Option<HashSet<ObjectRef<K>>>,
}

impl<K: WatchedResource> Default for LocalMirror<K> {
    fn default() -> Self {
        Self {
            objects: HashMap::new(),
            relisted: None,
        }
    }
}

impl<K: WatchedResource> LocalMirror<K> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Records an applied object and reports how it relates to the mirror.
    pub fn observe(&mut self, obj: K) -> Transition<K> {
        let key = ObjectRef::from_obj(&obj);
        if let Some(relisted) = self.relisted.as_mut() {
            relisted.insert(key.clone());
        }

        let mirrored_version = self.objects.get(&key).map(|old| old.resource_version());
        match mirrored_version {
            None => {
                self.objects.insert(key, obj);
                Transition::Added
            }
            Some(version) if version.is_some() && version == obj.resource_version() => Transition::Unchanged,
            Some(_) => {
                let new = obj.clone();
                let old = self.objects.insert(key, obj);
                match old {
                    Some(old) => Transition::Updated { old, new },
                    None => Transition::Added,
                }
            }
        }
    }

    /// Removes a deleted object. Returns the mirrored copy, if any.
    pub fn remove(&mut self, obj: &K) -> Option<K> {
        self.objects.remove(&ObjectRef::from_obj(obj))
    }

    /// Marks the start of a (re-)list.
    pub fn begin_relist(&mut self) {
        self.relisted = Some(HashSet::new());
    }

    /// Ends a (re-)list, dropping objects the list did not return.
    ///
    /// Returns the number of dropped objects.
    pub fn finish_relist(&mut self) -> usize {
        let Some(relisted) = self.relisted.take() else {
            return 0;
        };
        let before = self.objects.len();
        self.objects.retain(|key, _| relisted.contains(key));
        before - self.objects.len()
    }
}

/// Turns watch events for one kind into mirror updates and rollouts.
///
/// Only updates reach the change detector; adds and deletes just maintain
/// the mirror.
pub struct EventHandler<K: WatchedResource> {
    detector: ChangeDetector,
    coordinator: Arc<RolloutCoordinator>,
    mirror: LocalMirror<K>,
}

impl<K: WatchedResource> EventHandler<K> {
    pub fn new(detector: ChangeDetector, coordinator: Arc<RolloutCoordinator>) -> Self {
        Self {
            detector,
            coordinator,
            mirror: LocalMirror::default(),
        }
    }

    /// Applies one event. Returns the report of the rollout it caused, if any.
    pub async fn handle_event(&mut self, event: watcher::Event<K>) -> Option<RolloutReport> {
        match event {
            watcher::Event::Init => {
                debug!(kind = %K::KIND, "Watcher (re-)listing");
                self.mirror.begin_relist();
                None
            }
            watcher::Event::InitApply(obj) | watcher::Event::Apply(obj) => self.handle_apply(obj).await,
            watcher::Event::InitDone => {
                let dropped = self.mirror.finish_relist();
                info!(
                    kind = %K::KIND,
                    objects = self.mirror.len(),
                    dropped,
                    "Watcher initialization complete"
                );
                None
            }
            watcher::Event::Delete(obj) => {
                debug!(kind = %K::KIND, namespace = ?obj.namespace(), name = %obj.name_any(), "Deleted");
                self.mirror.remove(&obj);
                None
            }
        }
    }

    async fn handle_apply(&mut self, obj: K) -> Option<RolloutReport> {
        match self.mirror.observe(obj) {
            Transition::Added | Transition::Unchanged => None,
            Transition::Updated { old, new } => {
                debug!(kind = %K::KIND, namespace = ?new.namespace(), name = %new.name_any(), "Updated");
                let event = self.detector.detect(&old.snapshot(), &new.snapshot())?;
                Some(self.coordinator.rollout(&event).await)
            }
        }
    }
}

/// Watches one resource kind and drives rollouts from its updates.
pub struct ResourceWatcher<K: WatchedResource> {
    api: Api<K>,
    handler: EventHandler<K>,
}

impl<K: WatchedResource> ResourceWatcher<K> {
    /// Creates a new watcher instance.
    pub fn new(api: Api<K>, detector: ChangeDetector, coordinator: Arc<RolloutCoordinator>) -> Self {
        Self {
            api,
            handler: EventHandler::new(detector, coordinator),
        }
    }

    /// Watches until `cancel` fires.
    ///
    /// Notifications are handled one at a time: an update's rollout finishes
    /// before the next notification is read.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ControllerError> {
        info!(kind = %K::KIND, "Starting watcher");

        let stream = watcher(self.api.clone(), watcher::Config::default()).default_backoff();
        tokio::pin!(stream);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!(kind = %K::KIND, "Watcher cancelled");
                    return Ok(());
                }
                event = stream.next() => match event {
                    Some(Ok(event)) => {
                        self.handler.handle_event(event).await;
                    }
                    Some(Err(e)) => {
                        // Backoff and re-list are handled by the stream
                        warn!(kind = %K::KIND, error = %e, "Watch stream error");
                    }
                    None => {
                        return Err(ControllerError::Watch(format!("{} watch stream ended", K::KIND)));
                    }
                },
            }
        }
    }
}

//! Main controller implementation.
//!
//! Wires the ConfigMap and Secret watchers to a shared change detector and
//! rollout coordinator, and runs them until a shutdown signal arrives or a
//! watcher stops on its own.

use crate::config::Config;
use crate::detector::ChangeDetector;
use crate::error::ControllerError;
use crate::rollout::RolloutCoordinator;
use crate::watcher::ResourceWatcher;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use workload_client::KubeWorkloadClient;

type WatcherHandle = JoinHandle<Result<(), ControllerError>>;

/// Main controller for config-driven rollouts.
pub struct Controller {
    config_map_watcher: WatcherHandle,
    secret_watcher: WatcherHandle,
    cancel: CancellationToken,
}

impl Controller {
    /// Creates the controller and starts both watchers.
    pub fn new(config: &Config, client: Client) -> Self {
        info!(
            match_label = %config.match_label,
            namespace = config.watch_namespace.as_deref().unwrap_or("all namespaces"),
            "Initializing config reloader"
        );

        let workloads = Arc::new(KubeWorkloadClient::new(client.clone()));
        let coordinator = Arc::new(RolloutCoordinator::new(
            workloads,
            config.match_label.clone(),
            config.retry.clone(),
        ));
        let detector = ChangeDetector::new(config.match_label.clone());
        let cancel = CancellationToken::new();

        let config_map_watcher = ResourceWatcher::new(
            api::<ConfigMap>(&client, config.watch_namespace.as_deref()),
            detector.clone(),
            Arc::clone(&coordinator),
        );
        let secret_watcher = ResourceWatcher::new(
            api::<Secret>(&client, config.watch_namespace.as_deref()),
            detector,
            coordinator,
        );

        Self {
            config_map_watcher: tokio::spawn(config_map_watcher.run(cancel.child_token())),
            secret_watcher: tokio::spawn(secret_watcher.run(cancel.child_token())),
            cancel,
        }
    }

    /// Runs until SIGINT/SIGTERM or until a watcher exits.
    ///
    /// Both watchers are cancelled and joined before returning.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Config reloader running");

        // A finished handle must not be polled again, so each branch joins
        // only the other one.
        let (config_maps, secrets) = tokio::select! {
            signal = shutdown_signal() => {
                match &signal {
                    Ok(()) => info!("Shutdown signal received"),
                    Err(e) => error!(error = %e, "Failed to listen for shutdown signals"),
                }
                self.cancel.cancel();
                let joined = (self.config_map_watcher.await, self.secret_watcher.await);
                signal?;
                joined
            }
            result = &mut self.config_map_watcher => {
                self.cancel.cancel();
                (result, self.secret_watcher.await)
            }
            result = &mut self.secret_watcher => {
                self.cancel.cancel();
                (self.config_map_watcher.await, result)
            }
        };

        let config_maps = flatten("ConfigMap", config_maps);
        let secrets = flatten("Secret", secrets);
        config_maps.and(secrets)
    }
}

fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

fn flatten(
    kind: &str,
    joined: Result<Result<(), ControllerError>, tokio::task::JoinError>,
) -> Result<(), ControllerError> {
    match joined {
        Ok(Ok(())) => {
            info!(kind, "Watcher stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(kind, error = %e, "Watcher failed");
            Err(e)
        }
        Err(e) => {
            error!(kind, error = %e, "Watcher panicked");
            Err(ControllerError::Watch(format!("{kind} watcher panicked: {e}")))
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<(), ControllerError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<(), ControllerError> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

//! Controller-specific error types.
//!
//! Rollout-time API failures are not represented here: they are retried and
//! then recorded in the rollout report (`WorkloadError`), never propagated
//! out of a watcher.

use kube::Error as KubeError;
use kube::config::{InClusterError, InferConfigError, KubeconfigError};
use thiserror::Error;

/// Errors that can occur in the config reloader.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API or client construction error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Kubeconfig could not be read or loaded
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] KubeconfigError),

    /// Not running inside a cluster and no usable kubeconfig
    #[error("In-cluster configuration error: {0}")]
    InCluster(#[from] InClusterError),

    /// Neither kubeconfig nor in-cluster environment could be inferred
    #[error("Kubernetes config inference failed: {0}")]
    InferConfig(#[from] InferConfigError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Shutdown signal handling failed
    #[error("Shutdown failed: {0}")]
    Shutdown(#[from] std::io::Error),
}

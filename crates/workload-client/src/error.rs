//! Workload client errors

use thiserror::Error;

/// Errors that can occur when listing or patching workloads
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// Transport or client error; API server rejections map to the variants below
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Workload does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// API server rejected the request
    #[error("API error: {0}")]
    Api(String),
}

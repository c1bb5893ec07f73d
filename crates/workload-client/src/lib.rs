//! Workload Client
//!
//! Typed access to the three pod-template workload kinds the config reloader
//! restarts: `Deployment`, `StatefulSet` and `DaemonSet`.
//!
//! # Example
//!
//! ```no_run
//! use workload_client::{KubeWorkloadClient, WorkloadClientTrait, WorkloadKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeWorkloadClient::new(kube::Client::try_default().await?);
//!
//! // Every Deployment in `ns1` that carries the `mlops.cnvrg.io` label key
//! let deployments = client
//!     .list_labeled(WorkloadKind::Deployment, "ns1", "mlops.cnvrg.io")
//!     .await?;
//!
//! for deployment in &deployments {
//!     client
//!         .restart(&deployment.reference(), "2026-01-01T00:00:00Z")
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Label-selector listing**: server-side filtering on label key presence
//! - **Restart patching**: strategic-merge patch of the pod-template
//!   `kubectl.kubernetes.io/restartedAt` annotation
//! - **Mocking**: `MockWorkloadClient` behind the `test-util` feature

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod workload_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeWorkloadClient;
pub use error::WorkloadError;
pub use models::*;
pub use workload_trait::WorkloadClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockWorkloadClient;

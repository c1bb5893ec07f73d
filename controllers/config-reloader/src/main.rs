//! cre - Config Reloader
//!
//! Watches ConfigMaps and Secrets carrying a configurable label key. When the
//! payload of such a resource changes, every Deployment, StatefulSet and
//! DaemonSet in the same namespace whose label has the same value is rolled
//! by stamping a restart annotation on its pod template.

mod backoff;
mod config;
mod controller;
mod detector;
mod error;
mod logging;
mod resource;
mod restart;
mod retry;
mod rollout;
#[cfg(test)]
mod rollout_test;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::{Cli, Config};
use crate::error::ControllerError;
use clap::Parser;
use controller::Controller;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let installed = rustls::crypto::ring::default_provider().install_default();

    let config = Config::try_from(Cli::parse())?;
    logging::init_tracing(config.verbose, config.json_log);

    if installed.is_err() {
        warn!("A rustls crypto provider was already installed, keeping it");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        match_label = %config.match_label,
        namespace = config.watch_namespace.as_deref().unwrap_or("all namespaces"),
        "Starting cre"
    );

    let client = config.kube_client().await?;
    Controller::new(&config, client).run().await?;

    info!("cre stopped");
    Ok(())
}

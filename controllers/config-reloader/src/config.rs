//! Command line and environment configuration.
//!
//! Every flag can also be set through an environment variable named after
//! the flag (upper-cased, `-` replaced by `_`). The parsed `Cli` is validated
//! once into an immutable `Config` that is shared by all components.

use crate::error::ControllerError;
use crate::retry::RetryConfig;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use kube::config::{KubeConfigOptions, Kubeconfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Label key used when none is configured
pub const DEFAULT_MATCH_LABEL: &str = "mlops.cnvrg.io";

/// cre - restarts workloads when their labeled ConfigMaps and Secrets change
#[derive(Parser, Debug, Clone)]
#[command(name = "cre", version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging with source locations
    #[arg(
        short = 'v',
        long,
        env = "VERBOSE",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    pub verbose: bool,

    /// Label key shared by watched resources and the workloads they feed
    #[arg(long, env = "MATCH_LABEL", default_value = DEFAULT_MATCH_LABEL)]
    pub match_label: String,

    /// Emit logs as JSON lines
    #[arg(
        short = 'J',
        long,
        env = "JSON_LOG",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    pub json_log: bool,

    /// Kubeconfig file, or a list of files separated like `PATH`; in-cluster
    /// configuration is used when none of them exists
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Restrict watching to one namespace (default: all namespaces)
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Attempts per workload list or patch call, including the first
    #[arg(long, env = "RETRY_ATTEMPTS", default_value_t = 5)]
    pub retry_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(long, env = "RETRY_MIN_DELAY_MS", default_value_t = 200)]
    pub retry_min_delay_ms: u64,

    /// Upper bound on a single retry delay, in milliseconds
    #[arg(long, env = "RETRY_MAX_DELAY_MS", default_value_t = 10_000)]
    pub retry_max_delay_ms: u64,
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub match_label: String,
    pub kubeconfig: Option<PathBuf>,
    pub watch_namespace: Option<String>,
    pub retry: RetryConfig,
    pub verbose: bool,
    pub json_log: bool,
}

impl TryFrom<Cli> for Config {
    type Error = ControllerError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        validate_label_key(&cli.match_label)?;

        if cli.retry_attempts == 0 {
            return Err(ControllerError::InvalidConfig(
                "retry-attempts must be at least 1".to_string(),
            ));
        }
        if cli.retry_min_delay_ms == 0 {
            return Err(ControllerError::InvalidConfig(
                "retry-min-delay-ms must be at least 1".to_string(),
            ));
        }
        if cli.retry_min_delay_ms > cli.retry_max_delay_ms {
            return Err(ControllerError::InvalidConfig(format!(
                "retry-min-delay-ms ({}) exceeds retry-max-delay-ms ({})",
                cli.retry_min_delay_ms, cli.retry_max_delay_ms
            )));
        }

        let watch_namespace = cli.watch_namespace.filter(|ns| !ns.is_empty());
        let kubeconfig = cli.kubeconfig.filter(|p| !p.as_os_str().is_empty());

        Ok(Self {
            match_label: cli.match_label,
            kubeconfig,
            watch_namespace,
            retry: RetryConfig {
                max_attempts: cli.retry_attempts,
                min_delay: Duration::from_millis(cli.retry_min_delay_ms),
                max_delay: Duration::from_millis(cli.retry_max_delay_ms),
            },
            verbose: cli.verbose,
            json_log: cli.json_log,
        })
    }
}

impl Config {
    /// Builds a Kubernetes client.
    ///
    /// A kubeconfig value may list several files separated like `PATH`.
    /// Existing files are merged in order; when none exists the in-cluster
    /// service account is used. Without a value kube's standard inference
    /// applies.
    pub async fn kube_client(&self) -> Result<kube::Client, ControllerError> {
        let config = match &self.kubeconfig {
            Some(value) => {
                let paths = existing_kubeconfig_paths(value);
                if paths.is_empty() {
                    info!(kubeconfig = %value.display(), "Kubeconfig not found, using in-cluster configuration");
                    kube::Config::incluster()?
                } else {
                    info!(paths = ?paths, "Using kubeconfig");
                    let kubeconfig = paths.iter().try_fold(Kubeconfig::default(), |merged, path| {
                        Kubeconfig::read_from(path).and_then(|next| merged.merge(next))
                    })?;
                    kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
                }
            }
            None => kube::Config::infer().await?,
        };
        Ok(kube::Client::try_from(config)?)
    }
}

/// Files named by a kubeconfig value that exist on disk, in order.
fn existing_kubeconfig_paths(value: &Path) -> Vec<PathBuf> {
    std::env::split_paths(value.as_os_str())
        .filter(|path| !path.as_os_str().is_empty() && path.exists())
        .collect()
}

/// Checks a Kubernetes label key: an optional DNS subdomain prefix and `/`,
/// then a name of at most 63 characters.
fn validate_label_key(key: &str) -> Result<(), ControllerError> {
    let invalid = |reason: &str| ControllerError::InvalidConfig(format!("invalid match label {key:?}: {reason}"));

    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() || prefix.len() > 253 {
            return Err(invalid("prefix must be 1-253 characters"));
        }
        let labels_ok = prefix.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
                && !label.starts_with('-')
                && !label.ends_with('-')
        });
        if !labels_ok {
            return Err(invalid("prefix must be a DNS subdomain"));
        }
    }

    if name.is_empty() || name.len() > 63 {
        return Err(invalid("name must be 1-63 characters"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(invalid("name may only contain alphanumerics, '-', '_' and '.'"));
    }
    let alnum_ends = name.bytes().next().is_some_and(|b| b.is_ascii_alphanumeric())
        && name.bytes().last().is_some_and(|b| b.is_ascii_alphanumeric());
    if !alnum_ends {
        return Err(invalid("name must start and end with an alphanumeric character"));
    }
    Ok(())
}

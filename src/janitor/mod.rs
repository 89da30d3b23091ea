//! Cluster cleanup janitor.
//!
//! The janitor resets a test cluster to a known-empty state. A single
//! reachability probe gates every cleanup so that test suites can call it
//! unconditionally; when the API host does not accept connections the cleanup
//! is a silent no-op. Otherwise kinds are drained one at a time, in a fixed
//! order, and the first fatal error stops the sequence. Kinds already drained
//! stay drained.

mod types;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::cluster::{ClusterApi, ClusterError, KubeClusterApi};
use crate::config::{ConfigError, JanitorConfig};
use crate::context::{ConnectionContext, resolve_connection_context};
use crate::drain::{DrainError, DrainReconciler};
use crate::handle::HandleFactory;
use crate::kind::ResourceKind;
use crate::probe::{ReachabilityProbe, TcpProbe};

pub use types::{CleanupOutcome, CleanupSummary};

/// Kinds drained by [`Janitor::cleanup_all`], in order.
///
/// Replication controllers go before pods so a controller cannot recreate
/// pods the janitor has just deleted. Deployments are not part of the
/// sequence; drain them with [`Janitor::cleanup_kind`].
pub const CLEANUP_ORDER: [ResourceKind; 4] = [
    ResourceKind::ReplicationController,
    ResourceKind::Pod,
    ResourceKind::Secret,
    ResourceKind::Service,
];

/// Errors raised while wiring a janitor to a live cluster.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum JanitorError {
    /// Configuration was invalid or no cluster configuration resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The API client could not be built.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Sequences drains across kinds behind a reachability gate.
#[derive(Clone, Debug)]
pub struct Janitor<A, P> {
    reconciler: DrainReconciler<A>,
    probe: P,
}

impl Janitor<KubeClusterApi, TcpProbe> {
    /// Resolves the connection context once and wires the janitor to the
    /// cluster it names.
    ///
    /// # Errors
    ///
    /// Returns [`JanitorError::Config`] when `config` is invalid or no cluster
    /// configuration resolves, and [`JanitorError::Cluster`] when the client
    /// cannot be built.
    pub async fn connect(config: &JanitorConfig) -> Result<Self, JanitorError> {
        let settings = config.drain_settings()?;
        let kubeconfig = config.kubeconfig_path();
        let mut context = resolve_connection_context(kubeconfig.as_deref()).await?;
        if let Some(namespace) = config.namespace.as_deref() {
            context = context.with_namespace(namespace.trim());
        }
        let api = KubeClusterApi::connect(&context)?;
        info!(
            api_host = context.api_host(),
            namespace = context.namespace(),
            "janitor connected"
        );
        let factory = HandleFactory::new(Arc::new(context));
        Ok(Self::new(
            DrainReconciler::new(factory, api, settings),
            TcpProbe::new(config.probe_timeout()),
        ))
    }

    /// Loads [`JanitorConfig`] from configuration files and the environment,
    /// then connects as [`Self::connect`] does.
    ///
    /// # Errors
    ///
    /// Returns [`JanitorError::Config`] when loading or validation fails, and
    /// any error [`Self::connect`] returns.
    pub async fn from_environment() -> Result<Self, JanitorError> {
        let config = JanitorConfig::load_without_cli_args()?;
        Self::connect(&config).await
    }
}

impl<A: ClusterApi, P: ReachabilityProbe> Janitor<A, P> {
    /// Creates a janitor from an existing reconciler and probe.
    #[must_use]
    pub const fn new(reconciler: DrainReconciler<A>, probe: P) -> Self {
        Self { reconciler, probe }
    }

    /// Context every request is scoped to.
    #[must_use]
    pub fn context(&self) -> &ConnectionContext {
        self.reconciler.factory().context()
    }

    /// Drains every kind in [`CLEANUP_ORDER`].
    ///
    /// # Errors
    ///
    /// Returns the first [`DrainError`]; later kinds are not attempted.
    pub async fn cleanup_all(&self) -> Result<CleanupOutcome, DrainError> {
        self.cleanup(&CLEANUP_ORDER).await
    }

    /// Drains a single kind behind the same reachability gate.
    ///
    /// # Errors
    ///
    /// Returns the [`DrainError`] raised by the drain.
    pub async fn cleanup_kind(&self, kind: ResourceKind) -> Result<CleanupOutcome, DrainError> {
        self.cleanup(&[kind]).await
    }

    async fn cleanup(&self, kinds: &[ResourceKind]) -> Result<CleanupOutcome, DrainError> {
        let api_host = self.context().api_host();
        if !self.probe.is_reachable(api_host).await {
            info!(api_host, "cluster unreachable; skipping cleanup");
            return Ok(CleanupOutcome::Skipped {
                api_host: api_host.to_owned(),
            });
        }

        let mut summary = CleanupSummary::default();
        for kind in kinds {
            summary.reports.push(self.reconciler.drain(*kind).await?);
        }
        info!(
            api_host,
            kinds = summary.reports.len(),
            deleted = summary.total_deleted(),
            "cleanup complete"
        );
        Ok(CleanupOutcome::Completed(summary))
    }
}

#[cfg(test)]
mod tests;

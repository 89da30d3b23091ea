//! Typed handles addressing one named resource.
//!
//! Handles are constructed without touching the network. Every API call goes
//! through a [`ClusterApi`] passed in by the caller, so a handle carries no
//! client of its own.

use std::sync::Arc;

use camino::Utf8Path;

use crate::cluster::{ClusterApi, ClusterError, Lookup};
use crate::config::ConfigError;
use crate::context::{ConnectionContext, resolve_connection_context};
use crate::drain::DrainError;
use crate::kind::ResourceKind;
use crate::record::ObjectRecord;

/// Builds handles bound to a single connection context.
#[derive(Clone, Debug)]
pub struct HandleFactory {
    context: Arc<ConnectionContext>,
}

impl HandleFactory {
    /// Creates a factory sharing `context`.
    #[must_use]
    pub const fn new(context: Arc<ConnectionContext>) -> Self {
        Self { context }
    }

    /// Creates a factory for a context resolved from `kubeconfig`, falling back
    /// to the default resolution chain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unavailable`] when no usable context exists.
    pub async fn resolve(kubeconfig: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let context = resolve_connection_context(kubeconfig).await?;
        Ok(Self::new(Arc::new(context)))
    }

    /// Context shared by every handle this factory creates.
    #[must_use]
    pub const fn context(&self) -> &Arc<ConnectionContext> {
        &self.context
    }

    /// Creates a handle for `kind`/`name`. Performs no I/O.
    #[must_use]
    pub fn create_handle(&self, kind: ResourceKind, name: impl Into<String>) -> ResourceHandle {
        ResourceHandle {
            kind,
            name: name.into(),
            context: Arc::clone(&self.context),
            record: None,
        }
    }

    /// Lists every current record of `kind` through `api`.
    ///
    /// # Errors
    ///
    /// Returns [`DrainError::Cluster`] when listing fails and
    /// [`DrainError::Malformed`] when an entry cannot be adapted.
    pub async fn list<A>(&self, api: &A, kind: ResourceKind) -> Result<Vec<ObjectRecord>, DrainError>
    where
        A: ClusterApi + ?Sized,
    {
        let raw = api.list(kind).await?;
        raw.into_iter()
            .map(|entry| ObjectRecord::from_value(kind, entry).map_err(DrainError::from))
            .collect()
    }
}

/// A resource addressed by kind and name, with its last fetched state.
#[derive(Clone, Debug)]
pub struct ResourceHandle {
    kind: ResourceKind,
    name: String,
    context: Arc<ConnectionContext>,
    record: Option<ObjectRecord>,
}

impl ResourceHandle {
    /// Kind of the addressed resource.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Name of the addressed resource.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Context the handle is bound to.
    #[must_use]
    pub fn context(&self) -> &ConnectionContext {
        &self.context
    }

    /// State observed by the most recent successful [`Self::fetch`].
    #[must_use]
    pub const fn record(&self) -> Option<&ObjectRecord> {
        self.record.as_ref()
    }

    /// Re-reads the resource, returning the refreshed handle or
    /// [`Lookup::NotFound`] when it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`DrainError::Cluster`] for API failures other than not-found
    /// and [`DrainError::Malformed`] when the response cannot be adapted.
    pub async fn fetch<A>(mut self, api: &A) -> Result<Lookup<Self>, DrainError>
    where
        A: ClusterApi + ?Sized,
    {
        match api.get(self.kind, &self.name).await? {
            Lookup::Found(raw) => {
                self.record = Some(ObjectRecord::from_value(self.kind, raw)?);
                Ok(Lookup::Found(self))
            }
            Lookup::NotFound => Ok(Lookup::NotFound),
        }
    }

    /// Deletes the resource.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] for any failure other than not-found.
    pub async fn delete<A>(&self, api: &A) -> Result<Lookup<()>, ClusterError>
    where
        A: ClusterApi + ?Sized,
    {
        api.delete(self.kind, &self.name).await
    }
}

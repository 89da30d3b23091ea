//! Boundary to the remote resource-management API.
//!
//! The janitor consumes three operations per kind: list, fetch by name and
//! delete by name. A fetch or delete that finds nothing is reported as
//! [`Lookup::NotFound`] rather than as an error, because a record vanishing
//! between listing and deletion is the expected race during a drain.

mod error;
mod kube_api;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::kind::ResourceKind;

pub use error::ClusterError;
pub use kube_api::KubeClusterApi;

/// Future returned by [`ClusterApi`] operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ClusterError>> + Send + 'a>>;

/// Outcome of an operation addressed at a single named resource.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Lookup<T> {
    /// The resource existed and the operation produced `T`.
    Found(T),
    /// The resource no longer exists.
    NotFound,
}

impl<T> Lookup<T> {
    /// Returns `true` for [`Lookup::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Maps the found value.
    #[must_use]
    pub fn map<U>(self, op: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(op(value)),
            Self::NotFound => Lookup::NotFound,
        }
    }
}

/// List, fetch and delete operations against a cluster.
///
/// Implementations are bound to one connection context and shared read-only
/// across concurrent delete workers.
pub trait ClusterApi: Send + Sync {
    /// Lists every current resource of `kind` as raw structured records.
    ///
    /// Returns an empty vector when nothing exists.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] when the API rejects or fails the request.
    fn list(&self, kind: ResourceKind) -> ApiFuture<'_, Vec<Value>>;

    /// Fetches the named resource.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] for any failure other than not-found.
    fn get<'a>(&'a self, kind: ResourceKind, name: &'a str) -> ApiFuture<'a, Lookup<Value>>;

    /// Deletes the named resource.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] for any failure other than not-found.
    fn delete<'a>(&'a self, kind: ResourceKind, name: &'a str) -> ApiFuture<'a, Lookup<()>>;
}

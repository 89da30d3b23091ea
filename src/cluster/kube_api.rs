//! [`ClusterApi`] implementation backed by the `kube` client.

use kube::Client;
use kube::api::{Api, DeleteParams, ListParams};
use kube::core::DynamicObject;
use serde_json::Value;

use crate::context::ConnectionContext;
use crate::kind::ResourceKind;

use super::{ApiFuture, ClusterApi, ClusterError, Lookup};

/// Cluster API that talks to a live control plane through `kube`.
///
/// Objects are requested as [`DynamicObject`]s and handed to the janitor as
/// raw JSON records, so filtering never depends on the typed object model.
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
    namespace: String,
}

impl std::fmt::Debug for KubeClusterApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterApi")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl KubeClusterApi {
    /// Wraps an existing client scoped to `namespace`.
    #[must_use]
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// Builds a client from a resolved connection context.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Client`] when the client cannot be built from
    /// the context's configuration.
    pub fn connect(context: &ConnectionContext) -> Result<Self, ClusterError> {
        let client =
            Client::try_from(context.config().clone()).map_err(|err| ClusterError::Client {
                message: err.to_string(),
            })?;
        Ok(Self::new(client, context.namespace()))
    }

    /// Namespace every request is scoped to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn api(&self, kind: ResourceKind) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), &self.namespace, &kind.api_resource())
    }
}

impl ClusterApi for KubeClusterApi {
    fn list(&self, kind: ResourceKind) -> ApiFuture<'_, Vec<Value>> {
        Box::pin(async move {
            let objects = self
                .api(kind)
                .list(&ListParams::default())
                .await
                .map_err(|err| map_error("list", kind, err))?;
            objects
                .items
                .iter()
                .map(|object| to_record(kind, object))
                .collect()
        })
    }

    fn get<'a>(&'a self, kind: ResourceKind, name: &'a str) -> ApiFuture<'a, Lookup<Value>> {
        Box::pin(async move {
            let fetched = lookup("get", kind, self.api(kind).get(name).await)?;
            match fetched {
                Lookup::Found(object) => to_record(kind, &object).map(Lookup::Found),
                Lookup::NotFound => Ok(Lookup::NotFound),
            }
        })
    }

    fn delete<'a>(&'a self, kind: ResourceKind, name: &'a str) -> ApiFuture<'a, Lookup<()>> {
        Box::pin(async move {
            let deleted = self
                .api(kind)
                .delete(name, &DeleteParams::default())
                .await;
            lookup("delete", kind, deleted).map(|outcome| outcome.map(|_| ()))
        })
    }
}

pub(super) fn to_record(kind: ResourceKind, object: &DynamicObject) -> Result<Value, ClusterError> {
    serde_json::to_value(object).map_err(|err| ClusterError::Decode {
        kind,
        message: err.to_string(),
    })
}

pub(super) fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

pub(super) fn map_error(verb: &str, kind: ResourceKind, err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(response) => ClusterError::Api {
            verb: verb.to_owned(),
            kind,
            code: response.code,
            message: response.message,
        },
        other => ClusterError::Transport {
            verb: verb.to_owned(),
            kind,
            message: other.to_string(),
        },
    }
}

pub(super) fn lookup<T>(
    verb: &str,
    kind: ResourceKind,
    result: Result<T, kube::Error>,
) -> Result<Lookup<T>, ClusterError> {
    match result {
        Ok(value) => Ok(Lookup::Found(value)),
        Err(err) if is_not_found(&err) => Ok(Lookup::NotFound),
        Err(err) => Err(map_error(verb, kind, err)),
    }
}

//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::ffi::OsString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard as StdMutexGuard, PoisonError};

use serde_json::{Map, Value, json};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

use crate::cluster::{ApiFuture, ClusterApi, ClusterError, Lookup};
use crate::context::ConnectionContext;
use crate::kind::ResourceKind;
use crate::probe::{ProbeFuture, ReachabilityProbe};

/// Endpoint used by [`test_context`].
pub const TEST_API_HOST: &str = "https://127.0.0.1:6443";

/// Records a single call made against [`FakeCluster`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApiCall {
    /// `list(kind)`.
    List(ResourceKind),
    /// `get(kind, name)`.
    Get(ResourceKind, String),
    /// `delete(kind, name)`.
    Delete(ResourceKind, String),
}

impl ApiCall {
    /// Kind the call addressed.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::List(kind) | Self::Get(kind, _) | Self::Delete(kind, _) => *kind,
        }
    }
}

type Key = (ResourceKind, String);

#[derive(Debug, Default)]
struct FakeState {
    records: BTreeMap<ResourceKind, BTreeMap<String, Value>>,
    extra_entries: BTreeMap<ResourceKind, Vec<Value>>,
    calls: Vec<ApiCall>,
    vanish_before_get: BTreeSet<Key>,
    vanish_before_delete: BTreeSet<Key>,
    sticky: BTreeSet<Key>,
    delete_failures: BTreeMap<Key, ClusterError>,
    list_failures: BTreeMap<ResourceKind, ClusterError>,
}

/// In-memory cluster that records every call and can script races and
/// failures.
///
/// Clones share state, so a test can keep one clone for assertions while the
/// code under test owns another.
#[derive(Clone, Debug, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StdMutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `record` under its `metadata.name`.
    ///
    /// # Panics
    ///
    /// Panics when `record` has no string `metadata.name`.
    pub fn insert(&self, kind: ResourceKind, record: Value) {
        let Some(name) = record
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            panic!("fake records need metadata.name; use insert_listing_entry for malformed ones");
        };
        self.state()
            .records
            .entry(kind)
            .or_default()
            .insert(name, record);
    }

    /// Stores several records of one kind.
    ///
    /// # Panics
    ///
    /// Panics when a record has no string `metadata.name`.
    #[must_use]
    pub fn with_records(self, kind: ResourceKind, records: impl IntoIterator<Item = Value>) -> Self {
        for record in records {
            self.insert(kind, record);
        }
        self
    }

    /// Appends a raw entry that only ever appears in listings.
    pub fn insert_listing_entry(&self, kind: ResourceKind, entry: Value) {
        self.state()
            .extra_entries
            .entry(kind)
            .or_default()
            .push(entry);
    }

    /// Removes the record just before the next fetch of it, as if another
    /// client deleted it after the listing.
    pub fn vanish_before_get(&self, kind: ResourceKind, name: &str) {
        self.state()
            .vanish_before_get
            .insert((kind, name.to_owned()));
    }

    /// Removes the record just before the next delete of it.
    pub fn vanish_before_delete(&self, kind: ResourceKind, name: &str) {
        self.state()
            .vanish_before_delete
            .insert((kind, name.to_owned()));
    }

    /// Accepts deletes of the record without ever removing it.
    pub fn make_sticky(&self, kind: ResourceKind, name: &str) {
        self.state().sticky.insert((kind, name.to_owned()));
    }

    /// Fails every delete of the record with `error`.
    pub fn fail_delete(&self, kind: ResourceKind, name: &str, error: ClusterError) {
        self.state()
            .delete_failures
            .insert((kind, name.to_owned()), error);
    }

    /// Fails every listing of `kind` with `error`.
    pub fn fail_list(&self, kind: ResourceKind, error: ClusterError) {
        self.state().list_failures.insert(kind, error);
    }

    /// Names of the live records of `kind`, sorted.
    #[must_use]
    pub fn names(&self, kind: ResourceKind) -> Vec<String> {
        self.state()
            .records
            .get(&kind)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    /// Names passed to `delete(kind, _)`, in call order.
    #[must_use]
    pub fn delete_requests(&self, kind: ResourceKind) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::Delete(called, name) if *called == kind => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    fn list_now(&self, kind: ResourceKind) -> Result<Vec<Value>, ClusterError> {
        let mut state = self.state();
        state.calls.push(ApiCall::List(kind));
        if let Some(error) = state.list_failures.get(&kind) {
            return Err(error.clone());
        }
        let mut entries: Vec<Value> = state
            .records
            .get(&kind)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        if let Some(extra) = state.extra_entries.get(&kind) {
            entries.extend(extra.iter().cloned());
        }
        Ok(entries)
    }

    fn get_now(&self, kind: ResourceKind, name: &str) -> Lookup<Value> {
        let mut state = self.state();
        state.calls.push(ApiCall::Get(kind, name.to_owned()));
        let key = (kind, name.to_owned());
        if state.vanish_before_get.remove(&key) {
            remove_record(&mut state, kind, name);
        }
        state
            .records
            .get(&kind)
            .and_then(|records| records.get(name))
            .cloned()
            .map_or(Lookup::NotFound, Lookup::Found)
    }

    fn delete_now(&self, kind: ResourceKind, name: &str) -> Result<Lookup<()>, ClusterError> {
        let mut state = self.state();
        state.calls.push(ApiCall::Delete(kind, name.to_owned()));
        let key = (kind, name.to_owned());
        if let Some(error) = state.delete_failures.get(&key) {
            return Err(error.clone());
        }
        if state.vanish_before_delete.remove(&key) {
            remove_record(&mut state, kind, name);
        }
        if state.sticky.contains(&key) {
            return Ok(Lookup::Found(()));
        }
        Ok(if remove_record(&mut state, kind, name) {
            Lookup::Found(())
        } else {
            Lookup::NotFound
        })
    }
}

fn remove_record(state: &mut FakeState, kind: ResourceKind, name: &str) -> bool {
    state
        .records
        .get_mut(&kind)
        .is_some_and(|records| records.remove(name).is_some())
}

impl ClusterApi for FakeCluster {
    fn list(&self, kind: ResourceKind) -> ApiFuture<'_, Vec<Value>> {
        let result = self.list_now(kind);
        Box::pin(async move { result })
    }

    fn get<'a>(&'a self, kind: ResourceKind, name: &'a str) -> ApiFuture<'a, Lookup<Value>> {
        let lookup = self.get_now(kind, name);
        Box::pin(async move { Ok(lookup) })
    }

    fn delete<'a>(&'a self, kind: ResourceKind, name: &'a str) -> ApiFuture<'a, Lookup<()>> {
        let result = self.delete_now(kind, name);
        Box::pin(async move { result })
    }
}

/// Probe with a fixed answer that counts how often it was asked.
#[derive(Clone, Debug)]
pub struct StaticProbe {
    reachable: bool,
    endpoints: Arc<Mutex<Vec<String>>>,
    probes: Arc<AtomicUsize>,
}

impl StaticProbe {
    /// Probe that always reports the endpoint reachable.
    #[must_use]
    pub fn reachable() -> Self {
        Self::answering(true)
    }

    /// Probe that always reports the endpoint unreachable.
    #[must_use]
    pub fn unreachable() -> Self {
        Self::answering(false)
    }

    fn answering(reachable: bool) -> Self {
        Self {
            reachable,
            endpoints: Arc::default(),
            probes: Arc::default(),
        }
    }

    /// Number of probes issued.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Endpoints probed, in order.
    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReachabilityProbe for StaticProbe {
    fn is_reachable<'a>(&'a self, endpoint: &'a str) -> ProbeFuture<'a> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(endpoint.to_owned());
        let reachable = self.reachable;
        Box::pin(async move { reachable })
    }
}

/// Shared context pointing at [`TEST_API_HOST`].
///
/// # Panics
///
/// Panics if [`TEST_API_HOST`] stops being a valid URI.
#[must_use]
pub fn test_context() -> Arc<ConnectionContext> {
    let context = ConnectionContext::for_endpoint(TEST_API_HOST)
        .unwrap_or_else(|err| panic!("test endpoint should parse: {err}"));
    Arc::new(context)
}

/// Minimal record with a name and labels.
#[must_use]
pub fn record_json(name: &str, labels: &[(&str, &str)]) -> Value {
    let label_map: Map<String, Value> = labels
        .iter()
        .map(|(key, value)| ((*key).to_owned(), Value::from(*value)))
        .collect();
    json!({ "metadata": { "name": name, "labels": label_map } })
}

/// Minimal Pod record.
#[must_use]
pub fn pod_json(name: &str) -> Value {
    json!({ "apiVersion": "v1", "kind": "Pod", "metadata": { "name": name } })
}

/// Minimal ReplicationController record.
#[must_use]
pub fn replication_controller_json(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ReplicationController",
        "metadata": { "name": name },
        "spec": { "replicas": 1 }
    })
}

/// Minimal Secret record with the given `type`.
#[must_use]
pub fn secret_json(name: &str, secret_type: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": { "name": name },
        "type": secret_type
    })
}

/// Minimal Service record with the given labels.
#[must_use]
pub fn service_json(name: &str, labels: &[(&str, &str)]) -> Value {
    let mut record = record_json(name, labels);
    if let Some(object) = record.as_object_mut() {
        object.insert(String::from("apiVersion"), Value::from("v1"));
        object.insert(String::from("kind"), Value::from("Service"));
    }
    record
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        let changes: Vec<(&str, Option<&str>)> = pairs
            .iter()
            .map(|(key, value)| (*key, Some(*value)))
            .collect();
        Self::with_vars(&changes).await
    }

    /// Sets (`Some`) or removes (`None`) environment variables while holding
    /// a global mutex.
    pub async fn with_vars(changes: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                changes.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::with_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(changes.len());
        for (key, value) in changes {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}

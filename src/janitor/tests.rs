//! Unit tests for the janitor module.

use super::*;
use crate::drain::DrainSettings;
use crate::test_support::{
    ApiCall, EnvGuard, FakeCluster, StaticProbe, TEST_API_HOST, pod_json,
    replication_controller_json, secret_json, service_json, test_context,
};
use rstest::{fixture, rstest};
use serde_json::json;
use std::time::Duration;

#[fixture]
fn cluster() -> FakeCluster {
    FakeCluster::new()
        .with_records(
            ResourceKind::ReplicationController,
            [replication_controller_json("web-rc")],
        )
        .with_records(ResourceKind::Pod, [pod_json("web-rc-abcde"), pod_json("debug")])
        .with_records(
            ResourceKind::Secret,
            [
                secret_json("default-token-q8z", "kubernetes.io/service-account-token"),
                secret_json("db-password", "Opaque"),
            ],
        )
        .with_records(
            ResourceKind::Service,
            [
                service_json(
                    "kubernetes",
                    &[("component", "apiserver"), ("provider", "kubernetes")],
                ),
                service_json("web", &[("app", "web")]),
            ],
        )
        .with_records(ResourceKind::Deployment, [json!({ "metadata": { "name": "api" } })])
}

fn janitor(cluster: &FakeCluster, probe: &StaticProbe) -> Janitor<FakeCluster, StaticProbe> {
    let settings = DrainSettings {
        poll_interval: Duration::ZERO,
        ..DrainSettings::default()
    };
    Janitor::new(
        DrainReconciler::new(HandleFactory::new(test_context()), cluster.clone(), settings),
        probe.clone(),
    )
}

#[rstest]
fn cleanup_order_puts_controllers_before_pods_and_omits_deployments() {
    assert_eq!(CLEANUP_ORDER.first(), Some(&ResourceKind::ReplicationController));
    assert!(!CLEANUP_ORDER.contains(&ResourceKind::Deployment));
}

#[rstest]
#[tokio::test]
async fn unreachable_cluster_is_left_untouched(cluster: FakeCluster) {
    let probe = StaticProbe::unreachable();

    let outcome = janitor(&cluster, &probe)
        .cleanup_all()
        .await
        .unwrap_or_else(|err| panic!("skip is not an error: {err}"));

    assert_eq!(
        outcome,
        CleanupOutcome::Skipped {
            api_host: String::from(TEST_API_HOST)
        }
    );
    assert!(cluster.calls().is_empty());
    assert_eq!(probe.probe_count(), 1);
    assert_eq!(probe.endpoints(), [TEST_API_HOST]);
}

#[rstest]
#[tokio::test]
async fn cleanup_all_drains_kinds_in_order(cluster: FakeCluster) {
    let probe = StaticProbe::reachable();

    let outcome = janitor(&cluster, &probe)
        .cleanup_all()
        .await
        .unwrap_or_else(|err| panic!("cleanup should succeed: {err}"));

    let summary = outcome
        .summary()
        .unwrap_or_else(|| panic!("cleanup should complete"));
    assert_eq!(summary.kinds(), CLEANUP_ORDER);
    assert_eq!(summary.total_deleted(), 5);

    let calls = cluster.calls();
    let last_rc_call = calls
        .iter()
        .rposition(|call| call.kind() == ResourceKind::ReplicationController);
    let first_pod_call = calls
        .iter()
        .position(|call| call.kind() == ResourceKind::Pod);
    assert!(
        last_rc_call < first_pod_call,
        "replication controllers must finish before pods: {calls:?}"
    );
}

#[rstest]
#[tokio::test]
async fn cleanup_all_keeps_protected_records_and_deployments(cluster: FakeCluster) {
    let probe = StaticProbe::reachable();

    janitor(&cluster, &probe)
        .cleanup_all()
        .await
        .unwrap_or_else(|err| panic!("cleanup should succeed: {err}"));

    assert!(cluster.names(ResourceKind::ReplicationController).is_empty());
    assert!(cluster.names(ResourceKind::Pod).is_empty());
    assert_eq!(cluster.names(ResourceKind::Secret), ["default-token-q8z"]);
    assert_eq!(cluster.names(ResourceKind::Service), ["kubernetes"]);
    assert_eq!(cluster.names(ResourceKind::Deployment), ["api"]);
    assert!(
        cluster
            .calls()
            .iter()
            .all(|call| call.kind() != ResourceKind::Deployment)
    );
}

#[rstest]
#[tokio::test]
async fn cleanup_kind_drains_deployments_behind_the_gate(cluster: FakeCluster) {
    let probe = StaticProbe::reachable();
    let janitor = janitor(&cluster, &probe);

    let outcome = janitor
        .cleanup_kind(ResourceKind::Deployment)
        .await
        .unwrap_or_else(|err| panic!("deployment drain should succeed: {err}"));

    assert_eq!(
        outcome.summary().map(CleanupSummary::kinds),
        Some(vec![ResourceKind::Deployment])
    );
    assert!(cluster.names(ResourceKind::Deployment).is_empty());
    assert_eq!(cluster.names(ResourceKind::Pod).len(), 2);
    assert_eq!(probe.probe_count(), 1);
}

#[rstest]
#[tokio::test]
async fn cleanup_kind_skips_when_unreachable(cluster: FakeCluster) {
    let probe = StaticProbe::unreachable();

    let outcome = janitor(&cluster, &probe)
        .cleanup_kind(ResourceKind::Deployment)
        .await
        .unwrap_or_else(|err| panic!("skip is not an error: {err}"));

    assert!(outcome.is_skipped());
    assert!(cluster.calls().is_empty());
}

#[rstest]
#[tokio::test]
async fn fatal_error_stops_later_kinds(cluster: FakeCluster) {
    let probe = StaticProbe::reachable();
    let forbidden = ClusterError::Api {
        verb: String::from("delete"),
        kind: ResourceKind::Pod,
        code: 403,
        message: String::from("forbidden"),
    };
    cluster.fail_delete(ResourceKind::Pod, "debug", forbidden.clone());

    let err = janitor(&cluster, &probe)
        .cleanup_all()
        .await
        .expect_err("forbidden delete should abort cleanup");

    assert_eq!(err, DrainError::Cluster(forbidden));
    assert!(cluster.names(ResourceKind::ReplicationController).is_empty());
    assert!(
        !cluster
            .calls()
            .iter()
            .any(|call| matches!(call, ApiCall::List(ResourceKind::Secret | ResourceKind::Service)))
    );
    assert_eq!(cluster.names(ResourceKind::Secret).len(), 2);
}

#[rstest]
#[tokio::test]
async fn connect_rejects_invalid_configuration() {
    let config = JanitorConfig {
        delete_concurrency: 0,
        ..JanitorConfig::default()
    };

    let err = Janitor::connect(&config)
        .await
        .expect_err("zero concurrency should be rejected");

    assert!(
        matches!(err, JanitorError::Config(ConfigError::Invalid(_))),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn from_environment_validates_loaded_configuration() {
    let _guard = EnvGuard::set_vars(&[("KUBE_JANITOR_DELETE_CONCURRENCY", "0")]).await;

    let err = Janitor::from_environment()
        .await
        .expect_err("zero concurrency from the environment should be rejected");

    let JanitorError::Config(ConfigError::Invalid(message)) = err else {
        panic!("expected Config(Invalid), got {err:?}");
    };
    assert!(
        message.contains("KUBE_JANITOR_DELETE_CONCURRENCY"),
        "error should name the variable: {message}"
    );
}

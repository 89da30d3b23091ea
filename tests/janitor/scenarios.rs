//! BDD scenarios for cluster cleanup.

use rstest_bdd_macros::scenario;

use super::test_helpers::{JanitorContext, janitor_context};

#[scenario(
    path = "tests/features/janitor.feature",
    name = "Service-account token secrets survive a secret drain"
)]
fn scenario_token_secrets_survive(janitor_context: JanitorContext) {
    drop(janitor_context);
}

#[scenario(
    path = "tests/features/janitor.feature",
    name = "The control-plane service survives a full cleanup"
)]
fn scenario_control_plane_service_survives(janitor_context: JanitorContext) {
    drop(janitor_context);
}

#[scenario(
    path = "tests/features/janitor.feature",
    name = "An unreachable cluster is left untouched"
)]
fn scenario_unreachable_cluster(janitor_context: JanitorContext) {
    drop(janitor_context);
}

#[scenario(
    path = "tests/features/janitor.feature",
    name = "Replication controllers are drained before pods"
)]
fn scenario_controllers_before_pods(janitor_context: JanitorContext) {
    drop(janitor_context);
}

#[scenario(
    path = "tests/features/janitor.feature",
    name = "A pod deleted by someone else mid-drain is tolerated"
)]
fn scenario_vanishing_pod(janitor_context: JanitorContext) {
    drop(janitor_context);
}

#[scenario(
    path = "tests/features/janitor.feature",
    name = "Deployments are left out of the full cleanup"
)]
fn scenario_deployments_excluded(janitor_context: JanitorContext) {
    drop(janitor_context);
}

#[scenario(
    path = "tests/features/janitor.feature",
    name = "A forbidden delete aborts the cleanup"
)]
fn scenario_forbidden_delete(janitor_context: JanitorContext) {
    drop(janitor_context);
}

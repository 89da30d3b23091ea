//! BDD step definitions for janitor behaviour.

use kube_janitor::test_support::{
    pod_json, record_json, replication_controller_json, secret_json, service_json,
};
use kube_janitor::{ClusterError, ResourceKind};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{CleanupResult, JanitorContext, parse_kind};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("unknown resource kind: {0}")]
    UnknownKind(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn kind_named(name: &str) -> Result<ResourceKind, StepError> {
    parse_kind(name).ok_or_else(|| StepError::UnknownKind(name.to_owned()))
}

#[given("a reachable cluster")]
fn reachable_cluster(janitor_context: JanitorContext) -> JanitorContext {
    *janitor_context.reachable.borrow_mut() = true;
    janitor_context
}

#[given("an unreachable cluster")]
fn unreachable_cluster(janitor_context: JanitorContext) -> JanitorContext {
    *janitor_context.reachable.borrow_mut() = false;
    janitor_context
}

#[given("a secret \"{name}\" of type \"{secret_type}\"")]
fn secret_exists(janitor_context: JanitorContext, name: String, secret_type: String) -> JanitorContext {
    janitor_context
        .cluster
        .insert(ResourceKind::Secret, secret_json(&name, &secret_type));
    janitor_context
}

#[given("the control-plane service \"{name}\"")]
fn control_plane_service_exists(janitor_context: JanitorContext, name: String) -> JanitorContext {
    janitor_context.cluster.insert(
        ResourceKind::Service,
        service_json(&name, &[("component", "apiserver"), ("provider", "kubernetes")]),
    );
    janitor_context
}

#[given("a service \"{name}\"")]
fn service_exists(janitor_context: JanitorContext, name: String) -> JanitorContext {
    janitor_context.cluster.insert(
        ResourceKind::Service,
        service_json(&name, &[("app", name.as_str())]),
    );
    janitor_context
}

#[given("a pod \"{name}\"")]
fn pod_exists(janitor_context: JanitorContext, name: String) -> JanitorContext {
    janitor_context
        .cluster
        .insert(ResourceKind::Pod, pod_json(&name));
    janitor_context
}

#[given("a replication controller \"{name}\"")]
fn replication_controller_exists(janitor_context: JanitorContext, name: String) -> JanitorContext {
    janitor_context.cluster.insert(
        ResourceKind::ReplicationController,
        replication_controller_json(&name),
    );
    janitor_context
}

#[given("a deployment \"{name}\"")]
fn deployment_exists(janitor_context: JanitorContext, name: String) -> JanitorContext {
    janitor_context
        .cluster
        .insert(ResourceKind::Deployment, record_json(&name, &[]));
    janitor_context
}

#[given("pod \"{name}\" vanishes before it is fetched")]
fn pod_vanishes(janitor_context: JanitorContext, name: String) -> JanitorContext {
    janitor_context
        .cluster
        .vanish_before_get(ResourceKind::Pod, &name);
    janitor_context
}

#[given("deleting pod \"{name}\" is forbidden")]
fn pod_delete_forbidden(janitor_context: JanitorContext, name: String) -> JanitorContext {
    janitor_context.cluster.fail_delete(
        ResourceKind::Pod,
        &name,
        ClusterError::Api {
            verb: String::from("delete"),
            kind: ResourceKind::Pod,
            code: 403,
            message: format!("pods \"{name}\" is forbidden"),
        },
    );
    janitor_context
}

fn run_cleanup(
    janitor_context: JanitorContext,
    kind: Option<ResourceKind>,
) -> Result<JanitorContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let janitor = janitor_context.janitor();
    let result = runtime.block_on(async {
        match kind {
            Some(single) => janitor.cleanup_kind(single).await,
            None => janitor.cleanup_all().await,
        }
    });
    *janitor_context.outcome.borrow_mut() = Some(match result {
        Ok(outcome) => CleanupResult::Finished(outcome),
        Err(err) => CleanupResult::Failed(err.to_string()),
    });
    Ok(janitor_context)
}

#[when("I run the full cleanup")]
fn full_cleanup(janitor_context: JanitorContext) -> Result<JanitorContext, StepError> {
    run_cleanup(janitor_context, None)
}

#[when("I drain \"{kind}\" resources")]
fn drain_kind(janitor_context: JanitorContext, kind: String) -> Result<JanitorContext, StepError> {
    let parsed = kind_named(&kind)?;
    run_cleanup(janitor_context, Some(parsed))
}

#[then("the cleanup completes")]
fn cleanup_completes(janitor_context: &JanitorContext) -> Result<(), StepError> {
    match janitor_context.outcome.borrow().as_ref() {
        Some(CleanupResult::Finished(outcome)) if !outcome.is_skipped() => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a completed cleanup, got {other:?}"
        ))),
    }
}

#[then("the cleanup is skipped")]
fn cleanup_skipped(janitor_context: &JanitorContext) -> Result<(), StepError> {
    match janitor_context.outcome.borrow().as_ref() {
        Some(CleanupResult::Finished(outcome)) if outcome.is_skipped() => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a skipped cleanup, got {other:?}"
        ))),
    }
}

#[then("the cleanup fails mentioning \"{text}\"")]
fn cleanup_fails(janitor_context: &JanitorContext, text: String) -> Result<(), StepError> {
    match janitor_context.outcome.borrow().as_ref() {
        Some(CleanupResult::Failed(message)) if message.contains(&text) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a failure mentioning {text}, got {other:?}"
        ))),
    }
}

#[then("no API calls were made")]
fn no_api_calls(janitor_context: &JanitorContext) -> Result<(), StepError> {
    let calls = janitor_context.cluster.calls();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!("unexpected calls: {calls:?}")))
    }
}

#[then("{count} \"{kind}\" resources were deleted")]
fn resources_deleted(
    janitor_context: &JanitorContext,
    count: usize,
    kind: String,
) -> Result<(), StepError> {
    let parsed = kind_named(&kind)?;
    let deleted = janitor_context
        .outcome
        .borrow()
        .as_ref()
        .and_then(|result| match result {
            CleanupResult::Finished(outcome) => outcome
                .summary()
                .and_then(|summary| summary.report(parsed))
                .map(|report| report.deleted),
            CleanupResult::Failed(_) => None,
        });
    if deleted == Some(count) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} deleted {kind} resources, got {deleted:?}"
        )))
    }
}

#[then("only \"{name}\" remains among \"{kind}\" resources")]
fn only_remaining(
    janitor_context: &JanitorContext,
    name: String,
    kind: String,
) -> Result<(), StepError> {
    let remaining = janitor_context.cluster.names(kind_named(&kind)?);
    if remaining == [name.as_str()] {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected only {name} to remain, got {remaining:?}"
        )))
    }
}

#[then("no \"{kind}\" resources remain")]
fn none_remaining(janitor_context: &JanitorContext, kind: String) -> Result<(), StepError> {
    let remaining = janitor_context.cluster.names(kind_named(&kind)?);
    if remaining.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no {kind} resources, got {remaining:?}"
        )))
    }
}

#[then("replication controllers are drained before pods")]
fn controllers_before_pods(janitor_context: &JanitorContext) -> Result<(), StepError> {
    let calls = janitor_context.cluster.calls();
    let last_controller_call = calls
        .iter()
        .rposition(|call| call.kind() == ResourceKind::ReplicationController);
    let first_pod_call = calls
        .iter()
        .position(|call| call.kind() == ResourceKind::Pod);
    match (last_controller_call, first_pod_call) {
        (Some(controller), Some(pod)) if controller < pod => Ok(()),
        _ => Err(StepError::Assertion(format!(
            "replication controller calls must precede pod calls: {calls:?}"
        ))),
    }
}

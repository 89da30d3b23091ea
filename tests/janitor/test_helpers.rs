//! Shared fixtures and helpers for janitor BDD scenarios.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use kube_janitor::test_support::{FakeCluster, StaticProbe, test_context};
use kube_janitor::{
    CleanupOutcome, DrainReconciler, DrainSettings, HandleFactory, Janitor, ResourceKind,
};
use rstest::fixture;

#[derive(Clone, Debug)]
pub enum CleanupResult {
    Finished(CleanupOutcome),
    Failed(String),
}

#[derive(Clone, Debug)]
pub struct JanitorContext {
    pub cluster: FakeCluster,
    pub reachable: Rc<RefCell<bool>>,
    pub outcome: Rc<RefCell<Option<CleanupResult>>>,
}

impl JanitorContext {
    pub fn janitor(&self) -> Janitor<FakeCluster, StaticProbe> {
        let probe = if *self.reachable.borrow() {
            StaticProbe::reachable()
        } else {
            StaticProbe::unreachable()
        };
        let settings = DrainSettings {
            poll_interval: Duration::ZERO,
            ..DrainSettings::default()
        };
        Janitor::new(
            DrainReconciler::new(
                HandleFactory::new(test_context()),
                self.cluster.clone(),
                settings,
            ),
            probe,
        )
    }
}

#[fixture]
pub fn janitor_context() -> JanitorContext {
    JanitorContext {
        cluster: FakeCluster::new(),
        reachable: Rc::new(RefCell::new(true)),
        outcome: Rc::new(RefCell::new(None)),
    }
}

pub fn parse_kind(name: &str) -> Option<ResourceKind> {
    ResourceKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == name.trim())
}

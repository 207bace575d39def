/*!

Runs the scenario against in-memory clusters that simulate the hub's add-on manager and account
controller, and a managed cluster that answers `TokenReview`s.

!*/

use kube::api::DynamicObject;
use model::clients::{ManagedServiceAccountClient, StatusCode};
use model::constants::ADDON_INSTALL_NAMESPACE;
use model::mock::{ManualClock, MockCluster, Verb};
use model::resource_id::{
    MANAGED_CLUSTER_ADDON, MANAGED_SERVICE_ACCOUNT, MULTICLUSTER_ENGINE, TOKEN_REVIEW,
};
use model::{ManagedCluster, ManagedClusterAddOn};
use msa_e2e::context::resolve_cluster;
use msa_e2e::scenario::{self, Step, StepOutcome};
use msa_e2e::{Context, Error, Options, Timing};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    hub: Arc<MockCluster>,
    managed: Arc<MockCluster>,
    clock: Arc<ManualClock>,
}

impl Fixture {
    /// A hub whose controllers do their job immediately, with `cluster1` imported.
    fn new() -> Self {
        let fixture = Self::without_controllers();
        fixture.hub.simulate_addon_manager();
        fixture.hub.simulate_account_controller();
        fixture
    }

    fn without_controllers() -> Self {
        let hub = MockCluster::new("hub");
        hub.insert(&ManagedCluster::registered("cluster1"));
        let managed = MockCluster::new("cluster1");
        managed.trust_account_tokens(ADDON_INSTALL_NAMESPACE);
        Self {
            hub: Arc::new(hub),
            managed: Arc::new(managed),
            clock: Arc::new(ManualClock::new()),
        }
    }

    fn context(&self) -> Context {
        Context::new(
            self.hub.clone(),
            self.managed.clone(),
            ManagedCluster::registered("cluster1"),
            Timing::default(),
            self.clock.clone(),
        )
    }

    fn addon_installed(&self) -> bool {
        self.hub
            .get_stored(
                &MANAGED_CLUSTER_ADDON,
                Some("cluster1"),
                "managed-serviceaccount",
            )
            .is_some()
    }

    async fn accounts(&self) -> usize {
        let cluster = ManagedCluster::registered("cluster1");
        let accounts = ManagedServiceAccountClient::new(self.hub.as_ref(), &cluster);
        accounts.list().await.unwrap().len()
    }
}

#[tokio::test]
async fn full_lifecycle() {
    let fixture = Fixture::new();
    let report = scenario::run(&fixture.context()).await.unwrap();

    assert_eq!(report.cluster, "cluster1");
    assert!(report.account.as_deref().unwrap().starts_with("e2e-"));
    assert_eq!(
        report.steps,
        vec![
            (Step::ResolveCluster, StepOutcome::Passed),
            (Step::EnableFeature, StepOutcome::Skipped),
            (Step::InstallAddon, StepOutcome::Passed),
            (Step::CreateAccount, StepOutcome::Passed),
            (Step::ValidateToken, StepOutcome::Passed),
            (Step::DeleteAccount, StepOutcome::Passed),
            (Step::UninstallAddon, StepOutcome::Passed),
        ]
    );
    assert_eq!(fixture.managed.count(Verb::Create, &TOKEN_REVIEW), 1);
    assert_eq!(fixture.accounts().await, 0);
    assert!(!fixture.addon_installed());
    // every wait was satisfied on its first check
    assert!(fixture.clock.sleeps().is_empty());
}

#[tokio::test]
async fn account_completes_after_transient_errors() {
    let fixture = Fixture::new();
    for _ in 0..3 {
        fixture.hub.fail_next(
            Verb::Get,
            &MANAGED_SERVICE_ACCOUNT,
            StatusCode::SERVICE_UNAVAILABLE,
        );
    }

    let report = scenario::run(&fixture.context()).await.unwrap();
    assert_eq!(
        report.outcome(Step::CreateAccount),
        Some(StepOutcome::Passed)
    );
    // each failed check costs one interval
    assert_eq!(fixture.clock.sleeps(), vec![Duration::from_secs(10); 3]);
    assert_eq!(fixture.accounts().await, 0);
}

#[tokio::test]
async fn enable_feature_on_engine() {
    let fixture = Fixture::new();
    let resource = MULTICLUSTER_ENGINE.api_resource();
    let mut engine = DynamicObject::new("multiclusterengine", &resource);
    engine.data = json!({
        "spec": { "overrides": { "components": [
            { "name": "console-mce", "enabled": true },
            { "name": "managedserviceaccount", "enabled": false },
        ] } }
    });
    fixture.hub.insert_generic(&MULTICLUSTER_ENGINE, engine);

    let ctx = fixture.context().with_enable_feature(true);
    let report = scenario::run(&ctx).await.unwrap();
    assert_eq!(
        report.outcome(Step::EnableFeature),
        Some(StepOutcome::Passed)
    );
    let stored = fixture
        .hub
        .get_stored(&MULTICLUSTER_ENGINE, None, "multiclusterengine")
        .unwrap();
    assert_eq!(
        stored.data["spec"]["overrides"]["components"],
        json!([
            { "name": "console-mce", "enabled": true },
            { "name": "managedserviceaccount", "enabled": true },
        ])
    );
}

#[tokio::test]
async fn enable_feature_without_engine() {
    let fixture = Fixture::new();
    let ctx = fixture.context().with_enable_feature(true);
    let err = scenario::run(&ctx).await.unwrap_err();
    assert_eq!(err.step(), Some(Step::EnableFeature));
    assert!(!fixture.addon_installed());
}

#[tokio::test]
async fn addon_already_installed() {
    let fixture = Fixture::new();
    fixture
        .hub
        .insert(&ManagedClusterAddOn::managed_serviceaccount("cluster1"));

    let report = scenario::run(&fixture.context()).await.unwrap();
    assert_eq!(
        report.outcome(Step::InstallAddon),
        Some(StepOutcome::Skipped)
    );
    assert_eq!(fixture.hub.count(Verb::Create, &MANAGED_CLUSTER_ADDON), 0);
    assert_eq!(
        report.outcome(Step::UninstallAddon),
        Some(StepOutcome::Passed)
    );
}

#[tokio::test]
async fn addon_never_becomes_available() {
    let fixture = Fixture::without_controllers();
    let err = scenario::run(&fixture.context()).await.unwrap_err();

    assert_eq!(err.step(), Some(Step::InstallAddon));
    assert!(matches!(err, Error::Poll { .. }));
    // checked at 0s, 10s, ..., 300s
    assert_eq!(fixture.clock.elapsed(), Duration::from_secs(300));
    assert_eq!(fixture.clock.sleeps().len(), 30);
    // the existence check, the create-if-absent lookup and 31 checks
    assert_eq!(fixture.hub.count(Verb::Get, &MANAGED_CLUSTER_ADDON), 33);
    // nothing is cleaned up after a failure
    assert!(fixture.addon_installed());
}

#[tokio::test]
async fn token_never_reported() {
    let fixture = Fixture::without_controllers();
    fixture.hub.simulate_addon_manager();
    let err = scenario::run(&fixture.context()).await.unwrap_err();

    assert_eq!(err.step(), Some(Step::CreateAccount));
    assert_eq!(fixture.clock.elapsed(), Duration::from_secs(60));
    assert_eq!(fixture.accounts().await, 1);
}

#[tokio::test]
async fn username_mismatch_keeps_resources() {
    let fixture = Fixture::new();
    let managed = Arc::new(MockCluster::new("cluster1"));
    managed.trust_account_tokens("some-other-namespace");
    let ctx = Context::new(
        fixture.hub.clone(),
        managed,
        ManagedCluster::registered("cluster1"),
        Timing::default(),
        fixture.clock.clone(),
    );

    let err = scenario::run(&ctx).await.unwrap_err();
    assert_eq!(err.step(), Some(Step::ValidateToken));
    assert!(err.to_string().contains("some-other-namespace"));
    assert_eq!(fixture.accounts().await, 1);
    assert!(fixture.addon_installed());
    assert_eq!(fixture.hub.count(Verb::Delete, &MANAGED_SERVICE_ACCOUNT), 0);
}

#[tokio::test]
async fn resolve_first_registered_cluster() {
    let fixture = Fixture::new();
    fixture.hub.insert(&ManagedCluster::registered("cluster2"));
    let yaml = r#"
options:
  hub:
    name: hub
    kubeconfig: /tmp/hub
  managedClusters:
    - name: cluster0
    - name: cluster2
      kubeconfig: /tmp/cluster2
    - name: cluster1
      kubeconfig: /tmp/cluster1
"#;
    let options = Options::from_yaml(yaml, Path::new("options.yaml")).unwrap();
    let cluster = resolve_cluster(fixture.hub.as_ref(), &options)
        .await
        .unwrap();
    assert_eq!(cluster.metadata.name.as_deref(), Some("cluster2"));

    let yaml = "options:\n  hub:\n    name: hub\n  managedClusters:\n    - name: cluster9\n";
    let none = Options::from_yaml(yaml, Path::new("options.yaml")).unwrap();
    let err = resolve_cluster(fixture.hub.as_ref(), &none)
        .await
        .unwrap_err();
    assert_eq!(err.step(), Some(Step::ResolveCluster));
}

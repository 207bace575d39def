use crate::error::{self, Result};
use crate::options::{ClusterOptions, Options, PollingOptions};
use crate::scenario::Step;
use log::info;
use model::clients::{ClusterApi, KubeEndpoint, ManagedClusterClient};
use model::poll::{Clock, PollSettings, TokioClock};
use model::{CrdExt, ManagedCluster};
use snafu::{ensure, ResultExt};
use std::sync::Arc;

/// The poll settings for each kind of wait in the scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub addon: PollSettings,
    pub account: PollSettings,
    pub deletion: PollSettings,
}

impl From<&PollingOptions> for Timing {
    fn from(polling: &PollingOptions) -> Self {
        Self {
            addon: polling.addon(),
            account: polling.account(),
            deletion: polling.deletion(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from(&PollingOptions::default())
    }
}

/// Everything a scenario run needs: the two endpoints, the managed cluster under test, and how
/// long to wait for things.
pub struct Context {
    pub hub: Arc<dyn ClusterApi>,
    pub managed: Arc<dyn ClusterApi>,
    pub cluster: ManagedCluster,
    pub timing: Timing,
    pub enable_feature: bool,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    pub fn new(
        hub: Arc<dyn ClusterApi>,
        managed: Arc<dyn ClusterApi>,
        cluster: ManagedCluster,
        timing: Timing,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            hub,
            managed,
            cluster,
            timing,
            enable_feature: false,
            clock,
        }
    }

    pub fn with_enable_feature(mut self, enable_feature: bool) -> Self {
        self.enable_feature = enable_feature;
        self
    }

    /// Connect to the hub, pick the first configured managed cluster the hub has registered and
    /// connect to it as well.
    pub async fn connect(options: &Options) -> Result<Self> {
        let hub = connect_hub(options).await?;
        let cluster = resolve_cluster(hub.as_ref(), options).await?;
        let cluster_options = options.managed_cluster(cluster.object_name())?;
        let managed = connect_cluster(cluster_options).await?;
        Ok(Self::new(
            hub,
            managed,
            cluster,
            Timing::from(&options.polling),
            Arc::new(TokioClock),
        )
        .with_enable_feature(options.enable_feature))
    }

    pub fn cluster_name(&self) -> &str {
        self.cluster.object_name()
    }
}

/// Connect to the hub only, for commands that never touch a managed cluster.
pub async fn connect_hub(options: &Options) -> Result<Arc<dyn ClusterApi>> {
    connect_cluster(&options.hub).await
}

pub async fn resolve_cluster(hub: &dyn ClusterApi, options: &Options) -> Result<ManagedCluster> {
    ensure!(
        !options.managed_clusters.is_empty(),
        error::NoManagedClustersSnafu
    );
    ManagedClusterClient::new(hub)
        .find_imported(options.managed_cluster_names())
        .await
        .context(error::ClientSnafu {
            step: Step::ResolveCluster,
        })
}

async fn connect_cluster(cluster: &ClusterOptions) -> Result<Arc<dyn ClusterApi>> {
    match &cluster.kubeconfig {
        Some(path) => info!(
            "connecting to '{}' using '{}'",
            cluster.name,
            path.display()
        ),
        None => info!(
            "connecting to '{}' using the inferred configuration",
            cluster.name
        ),
    }
    let endpoint = KubeEndpoint::from_kubeconfig(
        &cluster.name,
        cluster.kubeconfig.as_deref(),
        cluster.kubecontext.as_deref(),
        cluster.api_server_url.as_deref(),
    )
    .await
    .context(error::EndpointSnafu {
        name: &cluster.name,
    })?;
    Ok(Arc::new(endpoint))
}

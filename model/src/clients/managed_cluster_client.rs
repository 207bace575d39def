use super::error::{self, AllowNotFound, Result};
use super::{ClusterApi, ResourceClient};
use crate::ManagedCluster;
use log::{debug, info};

/// Read access to the hub's `ManagedCluster` registrations.
pub struct ManagedClusterClient<'a> {
    clusters: ResourceClient<'a, ManagedCluster>,
}

impl<'a> ManagedClusterClient<'a> {
    pub fn new(hub: &'a dyn ClusterApi) -> Self {
        Self {
            clusters: ResourceClient::cluster_scoped(hub),
        }
    }

    pub async fn get(&self, name: &str) -> Result<ManagedCluster> {
        self.clusters.get(name).await
    }

    pub async fn list(&self) -> Result<Vec<ManagedCluster>> {
        self.clusters.list().await
    }

    /// Return the registration of the first name in `candidates` that the hub knows about. A
    /// candidate that is not registered (404) is skipped; any other error stops the search.
    pub async fn find_imported<I, S>(&self, candidates: I) -> Result<ManagedCluster>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tried = Vec::new();
        for candidate in candidates {
            let name = candidate.as_ref();
            let cluster = self
                .clusters
                .get(name)
                .await
                .allow_not_found(|_| debug!("cluster '{}' is not registered on the hub", name))?;
            if let Some(cluster) = cluster {
                info!("using managed cluster '{}'", name);
                return Ok(cluster);
            }
            tried.push(name.to_string());
        }
        Err(error::NoImportedClusterSnafu { candidates: tried }
            .build()
            .into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clients::ErrorKind;
    use crate::mock::{MockCluster, Verb};
    use crate::resource_id::MANAGED_CLUSTER;
    use crate::CrdExt;
    use http::StatusCode;

    #[tokio::test]
    async fn first_registered_candidate_wins() {
        let hub = MockCluster::new("hub");
        hub.insert(&ManagedCluster::registered("cluster2"));
        hub.insert(&ManagedCluster::registered("cluster3"));
        let client = ManagedClusterClient::new(&hub);

        let found = client
            .find_imported(["cluster1", "cluster3", "cluster2"])
            .await
            .unwrap();
        assert_eq!(found.object_name(), "cluster3");
        assert_eq!(client.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn no_registered_candidate() {
        let hub = MockCluster::new("hub");
        let client = ManagedClusterClient::new(&hub);
        let err = client
            .find_imported(vec!["cluster1".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.to_string().contains("cluster1"));
    }

    #[tokio::test]
    async fn transport_error_stops_search() {
        let hub = MockCluster::new("hub");
        hub.insert(&ManagedCluster::registered("cluster2"));
        hub.fail_next(Verb::Get, &MANAGED_CLUSTER, StatusCode::BAD_GATEWAY);
        let client = ManagedClusterClient::new(&hub);
        let err = client
            .find_imported(["cluster1", "cluster2"])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}

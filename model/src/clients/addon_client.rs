use super::error::{AllowNotFound, Result};
use super::{ClusterApi, ResourceClient};
use crate::constants::{ADDON_NAME, CONDITION_AVAILABLE};
use crate::{CrdExt, ManagedCluster, ManagedClusterAddOn};
use log::{debug, error, info, warn};

/// An API client for the managed-serviceaccount `ManagedClusterAddOn` of one managed cluster.
/// The add-on object lives on the hub in the namespace named after the managed cluster.
pub struct AddonClient<'a> {
    addons: ResourceClient<'a, ManagedClusterAddOn>,
}

impl<'a> AddonClient<'a> {
    pub fn new(hub: &'a dyn ClusterApi, cluster: &ManagedCluster) -> Self {
        Self {
            addons: ResourceClient::namespaced(hub, cluster.object_name()),
        }
    }

    fn cluster_namespace(&self) -> &str {
        self.addons.namespace().unwrap_or_default()
    }

    pub async fn get(&self) -> Result<ManagedClusterAddOn> {
        self.addons.get(ADDON_NAME).await
    }

    /// Create the add-on unless it is already there, in which case the existing object is
    /// returned untouched.
    pub async fn create(&self) -> Result<ManagedClusterAddOn> {
        let existing = self
            .get()
            .await
            .allow_not_found(|_| debug!("add-on not found in '{}'", self.cluster_namespace()))?;
        if let Some(existing) = existing {
            info!(
                "add-on '{}' already exists in '{}'",
                ADDON_NAME,
                self.cluster_namespace()
            );
            return Ok(existing);
        }
        info!(
            "creating add-on '{}' in '{}'",
            ADDON_NAME,
            self.cluster_namespace()
        );
        let addon = ManagedClusterAddOn::managed_serviceaccount(self.cluster_namespace());
        self.addons.create(&addon).await
    }

    pub async fn delete(&self) -> Result<()> {
        info!(
            "deleting add-on '{}' from '{}'",
            ADDON_NAME,
            self.cluster_namespace()
        );
        self.addons.delete(ADDON_NAME).await
    }

    /// `Ok(false)` only on a 404.
    pub async fn exists(&self) -> Result<bool> {
        self.addons.exists(ADDON_NAME).await
    }

    /// Wait condition: the add-on reports `Available=True`. Errors count as "not yet".
    pub async fn is_available(&self) -> bool {
        match self.get().await {
            Ok(addon) => addon.is_condition_true(CONDITION_AVAILABLE),
            Err(e) => {
                error!("unable to read add-on status: {}", e);
                false
            }
        }
    }

    /// Wait condition for deletion. Only a confirmed 404 counts as gone; any other error is logged
    /// and treated as "still there".
    pub async fn is_gone(&self) -> bool {
        match self.exists().await {
            Ok(exists) => !exists,
            Err(e) => {
                warn!("unable to confirm add-on deletion: {}", e);
                false
            }
        }
    }
}

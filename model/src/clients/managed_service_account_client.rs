use super::error::{self, Result};
use super::{AddonClient, ClusterApi, ResourceClient};
use crate::constants::{
    CONDITION_SECRET_CREATED, CONDITION_TOKEN_REPORTED, SERVICE_ACCOUNT_USER_PREFIX, TOKEN_KEY,
};
use crate::{CrdExt, ManagedCluster, ManagedServiceAccount, Rotation};
use k8s_openapi::api::core::v1::Secret;
use log::{error, info, warn};
use snafu::{ensure, OptionExt, ResultExt};

/// An API client for `ManagedServiceAccount` objects in one managed cluster's hub namespace, and
/// for the token secrets the reconciler writes next to them.
pub struct ManagedServiceAccountClient<'a> {
    hub: &'a dyn ClusterApi,
    cluster: ManagedCluster,
    accounts: ResourceClient<'a, ManagedServiceAccount>,
    secrets: ResourceClient<'a, Secret>,
}

impl<'a> ManagedServiceAccountClient<'a> {
    pub fn new(hub: &'a dyn ClusterApi, cluster: &ManagedCluster) -> Self {
        let namespace = cluster.object_name();
        Self {
            hub,
            cluster: cluster.clone(),
            accounts: ResourceClient::namespaced(hub, namespace),
            secrets: ResourceClient::namespaced(hub, namespace),
        }
    }

    pub async fn get(&self, name: &str) -> Result<ManagedServiceAccount> {
        self.accounts.get(name).await
    }

    pub async fn list(&self) -> Result<Vec<ManagedServiceAccount>> {
        self.accounts.list().await
    }

    /// Create an account whose name the API server generates from `name_prefix`. The returned
    /// object carries the assigned name.
    pub async fn create(
        &self,
        name_prefix: &str,
        rotation: Rotation,
    ) -> Result<ManagedServiceAccount> {
        let created = self
            .accounts
            .create(&ManagedServiceAccount::with_generated_name(
                self.cluster.object_name(),
                name_prefix,
                rotation,
            ))
            .await?;
        info!(
            "created ManagedServiceAccount '{}/{}'",
            self.cluster.object_name(),
            created.object_name()
        );
        Ok(created)
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        info!(
            "deleting ManagedServiceAccount '{}/{}'",
            self.cluster.object_name(),
            name
        );
        self.accounts.delete(name).await
    }

    /// `Ok(false)` only on a 404.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.accounts.exists(name).await
    }

    /// Wait condition: both `TokenReported` and `SecretCreated` are `True`. Errors count as
    /// "not yet".
    pub async fn is_complete(&self, name: &str) -> bool {
        match self.get(name).await {
            Ok(account) => {
                account.is_condition_true(CONDITION_TOKEN_REPORTED)
                    && account.is_condition_true(CONDITION_SECRET_CREATED)
            }
            Err(e) => {
                error!("unable to read ManagedServiceAccount '{}': {}", name, e);
                false
            }
        }
    }

    /// Wait condition for deletion. Only a confirmed 404 counts as gone.
    pub async fn is_gone(&self, name: &str) -> bool {
        match self.exists(name).await {
            Ok(exists) => !exists,
            Err(e) => {
                warn!(
                    "unable to confirm deletion of ManagedServiceAccount '{}': {}",
                    name, e
                );
                false
            }
        }
    }

    /// The hub secret referenced by the account's `status.tokenSecretRef`.
    pub async fn secret(&self, name: &str) -> Result<Secret> {
        let account = self.get(name).await?;
        let secret_name = account
            .token_secret_name()
            .context(error::MissingSecretRefSnafu { name })?;
        self.secrets.get(secret_name).await
    }

    /// The bearer token held by the account's secret. An absent or empty token is an error.
    pub async fn token(&self, name: &str) -> Result<String> {
        let secret = self.secret(name).await?;
        let secret_name = secret.metadata.name.clone().unwrap_or_default();
        let bytes = secret
            .data
            .and_then(|mut data| data.remove(TOKEN_KEY))
            .map(|token| token.0)
            .unwrap_or_default();
        ensure!(
            !bytes.is_empty(),
            error::EmptyTokenSnafu {
                secret: &secret_name,
                key: TOKEN_KEY,
            }
        );
        Ok(String::from_utf8(bytes).context(error::InvalidTokenSnafu {
            secret: secret_name,
        })?)
    }

    /// The username the managed cluster should report for the account's token:
    /// `system:serviceaccount:<add-on install namespace>:<account name>`.
    pub async fn username(&self, name: &str) -> Result<String> {
        let addon = AddonClient::new(self.hub, &self.cluster).get().await?;
        Ok(service_account_username(addon.install_namespace(), name))
    }
}

pub fn service_account_username(namespace: &str, name: &str) -> String {
    format!("{}:{}:{}", SERVICE_ACCOUNT_USER_PREFIX, namespace, name)
}

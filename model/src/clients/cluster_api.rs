use super::error::{self, Result};
use crate::resource_id::ResourceId;
use kube::api::{DeleteParams, DynamicObject, ListParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use log::trace;
use snafu::ResultExt;
use std::path::Path;

/// The untyped operations the suite needs from a Kubernetes API server. Typed access is layered on
/// top of this by [`ResourceClient`](super::ResourceClient); nothing above that layer sees a
/// [`DynamicObject`].
///
/// `namespace` is ignored for cluster-scoped resources. Errors are returned exactly as the API
/// produced them so that callers can tell a 404 from any other failure.
#[async_trait::async_trait]
pub trait ClusterApi: Send + Sync {
    /// A human readable name for the endpoint, e.g. `hub`.
    fn name(&self) -> &str;

    async fn get(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<DynamicObject>;

    async fn list(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
    ) -> kube::Result<Vec<DynamicObject>>;

    async fn create(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> kube::Result<DynamicObject>;

    /// Replace the whole object, which must already exist.
    async fn replace(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> kube::Result<DynamicObject>;

    async fn delete(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<()>;
}

/// A [`ClusterApi`] backed by a live API server.
#[derive(Clone)]
pub struct KubeEndpoint {
    name: String,
    client: Client,
}

impl KubeEndpoint {
    pub fn new<S>(name: S, client: Client) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            client,
        }
    }

    /// Create an endpoint from a kubeconfig file. Without a path, the default kubeconfig is used
    /// when a `context` is named, otherwise the configuration is inferred from the environment the
    /// way `kube::Client::try_default` does. `api_server_url`, when given, overrides the server
    /// address found in the configuration.
    pub async fn from_kubeconfig(
        name: &str,
        kubeconfig_path: Option<&Path>,
        context: Option<&str>,
        api_server_url: Option<&str>,
    ) -> Result<Self> {
        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..KubeConfigOptions::default()
        };
        let mut config = match (kubeconfig_path, context) {
            (Some(path), _) => {
                let kubeconfig =
                    Kubeconfig::read_from(path).context(error::KubeconfigSnafu { path })?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .context(error::KubeconfigSnafu { path })?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options)
                .await
                .context(error::DefaultKubeconfigSnafu)?,
            (None, None) => Config::infer().await.context(error::InferConfigSnafu)?,
        };
        if let Some(url) = api_server_url.filter(|url| !url.is_empty()) {
            config.cluster_url = url.parse().context(error::ClusterUrlSnafu { url })?;
        }
        let client =
            Client::try_from(config).context(error::InitializationSnafu { endpoint: name })?;
        Ok(Self::new(name, client))
    }

    fn api(&self, resource: &ResourceId, namespace: Option<&str>) -> Api<DynamicObject> {
        let api_resource = resource.api_resource();
        match namespace {
            Some(namespace) if resource.namespaced => {
                Api::namespaced_with(self.client.clone(), namespace, &api_resource)
            }
            _ => Api::all_with(self.client.clone(), &api_resource),
        }
    }
}

#[async_trait::async_trait]
impl ClusterApi for KubeEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<DynamicObject> {
        trace!("{}: get {} '{}'", self.name, resource.plural, name);
        self.api(resource, namespace).get(name).await
    }

    async fn list(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
    ) -> kube::Result<Vec<DynamicObject>> {
        trace!("{}: list {}", self.name, resource.plural);
        Ok(self
            .api(resource, namespace)
            .list(&ListParams::default())
            .await?
            .items)
    }

    async fn create(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> kube::Result<DynamicObject> {
        trace!("{}: create {}", self.name, resource.plural);
        self.api(resource, namespace)
            .create(&PostParams::default(), object)
            .await
    }

    async fn replace(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> kube::Result<DynamicObject> {
        let name = object.metadata.name.as_deref().unwrap_or_default();
        trace!("{}: replace {} '{}'", self.name, resource.plural, name);
        self.api(resource, namespace)
            .replace(name, &PostParams::default(), object)
            .await
    }

    async fn delete(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<()> {
        trace!("{}: delete {} '{}'", self.name, resource.plural, name);
        self.api(resource, namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }
}

use super::error::{self, AllowNotFound, Result};
use super::ClusterApi;
use crate::convert::{from_generic, to_generic};
use crate::resource_id::{self, ResourceId};
use crate::{ManagedCluster, ManagedClusterAddOn, ManagedServiceAccount};
use k8s_openapi::api::authentication::v1::TokenReview;
use k8s_openapi::api::core::v1::Secret;
use log::trace;
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;
use std::fmt::Debug;
use std::marker::PhantomData;

/// A typed object the suite reads or writes, tied to the identity the dynamic API uses for it.
pub trait TypedResource: Serialize + DeserializeOwned + Debug + Clone + Send + Sync {
    const RESOURCE: ResourceId;
}

impl TypedResource for ManagedCluster {
    const RESOURCE: ResourceId = resource_id::MANAGED_CLUSTER;
}

impl TypedResource for ManagedClusterAddOn {
    const RESOURCE: ResourceId = resource_id::MANAGED_CLUSTER_ADDON;
}

impl TypedResource for ManagedServiceAccount {
    const RESOURCE: ResourceId = resource_id::MANAGED_SERVICE_ACCOUNT;
}

impl TypedResource for Secret {
    const RESOURCE: ResourceId = resource_id::SECRET;
}

impl TypedResource for TokenReview {
    const RESOURCE: ResourceId = resource_id::TOKEN_REVIEW;
}

/// Typed get/list/create/update/delete for one kind of object on one endpoint, optionally scoped
/// to a namespace. Conversion to and from the generic form happens here and nowhere else.
///
/// Every call is a single round trip; nothing is retried.
pub struct ResourceClient<'a, K> {
    api: &'a dyn ClusterApi,
    namespace: Option<String>,
    _kind: PhantomData<fn() -> K>,
}

impl<'a, K> ResourceClient<'a, K>
where
    K: TypedResource,
{
    pub fn cluster_scoped(api: &'a dyn ClusterApi) -> Self {
        Self {
            api,
            namespace: None,
            _kind: PhantomData,
        }
    }

    pub fn namespaced<S>(api: &'a dyn ClusterApi, namespace: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            api,
            namespace: Some(namespace.into()),
            _kind: PhantomData,
        }
    }

    pub fn endpoint(&self) -> &'a dyn ClusterApi {
        self.api
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn describe(&self, name: &str) -> String {
        match self.namespace() {
            Some(namespace) => format!(
                "{} '{}/{}' on '{}'",
                K::RESOURCE.kind,
                namespace,
                name,
                self.api.name()
            ),
            None => format!("{} '{}' on '{}'", K::RESOURCE.kind, name, self.api.name()),
        }
    }

    pub async fn get(&self, name: &str) -> Result<K> {
        let object = self
            .api
            .get(&K::RESOURCE, self.namespace(), name)
            .await
            .context(error::KubeApiCallSnafu {
                method: "get",
                what: self.describe(name),
            })?;
        Ok(from_generic(&object, &K::RESOURCE)?)
    }

    pub async fn list(&self) -> Result<Vec<K>> {
        let objects = self
            .api
            .list(&K::RESOURCE, self.namespace())
            .await
            .context(error::KubeApiCallSnafu {
                method: "list",
                what: format!("{}s on '{}'", K::RESOURCE.kind, self.api.name()),
            })?;
        let mut items = Vec::with_capacity(objects.len());
        for object in &objects {
            items.push(from_generic(object, &K::RESOURCE)?);
        }
        Ok(items)
    }

    /// Create `object`. For objects using `metadata.generateName` the server picks the final
    /// name, so read it from the returned object.
    pub async fn create(&self, object: &K) -> Result<K> {
        let generic = to_generic(object, &K::RESOURCE)?;
        let name = generic
            .metadata
            .name
            .clone()
            .or_else(|| generic.metadata.generate_name.clone())
            .unwrap_or_default();
        let created = self
            .api
            .create(&K::RESOURCE, self.namespace(), &generic)
            .await
            .context(error::KubeApiCallSnafu {
                method: "create",
                what: self.describe(&name),
            })?;
        trace!(
            "created {}",
            self.describe(created.metadata.name.as_deref().unwrap_or_default())
        );
        Ok(from_generic(&created, &K::RESOURCE)?)
    }

    /// Replace the stored object with `object`.
    pub async fn update(&self, object: &K) -> Result<K> {
        let generic = to_generic(object, &K::RESOURCE)?;
        let name = generic.metadata.name.clone().unwrap_or_default();
        let updated = self
            .api
            .replace(&K::RESOURCE, self.namespace(), &generic)
            .await
            .context(error::KubeApiCallSnafu {
                method: "update",
                what: self.describe(&name),
            })?;
        Ok(from_generic(&updated, &K::RESOURCE)?)
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        self.api
            .delete(&K::RESOURCE, self.namespace(), name)
            .await
            .context(error::KubeApiCallSnafu {
                method: "delete",
                what: self.describe(name),
            })?;
        Ok(())
    }

    /// `Ok(false)` only when the API server answers 404. Any other failure is returned as an
    /// error and must not be read as absence.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .get(name)
            .await
            .allow_not_found(|_| trace!("{} not found", self.describe(name)))?
            .is_some())
    }
}

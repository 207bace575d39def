use crate::constants::{ADDON_INSTALL_NAMESPACE, ADDON_NAME};
use crate::crd_ext::{CrdExt, StatusCondition};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The per-cluster record of an add-on installation. It lives on the hub in the namespace named
/// after the managed cluster.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    derive = "Default",
    derive = "PartialEq",
    group = "addon.open-cluster-management.io",
    kind = "ManagedClusterAddOn",
    namespaced,
    plural = "managedclusteraddons",
    singular = "managedclusteraddon",
    status = "ManagedClusterAddOnStatus",
    version = "v1alpha1"
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterAddOnSpec {
    /// The namespace on the managed cluster the add-on agent is deployed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_namespace: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterAddOnStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<StatusCondition>,
    /// The namespace the add-on manager actually installed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ManagedClusterAddOn {
    /// The managed-serviceaccount add-on for the managed cluster whose hub namespace is
    /// `cluster_namespace`.
    pub fn managed_serviceaccount(cluster_namespace: &str) -> Self {
        ManagedClusterAddOn {
            metadata: ObjectMeta {
                name: Some(ADDON_NAME.to_string()),
                namespace: Some(cluster_namespace.to_string()),
                ..ObjectMeta::default()
            },
            spec: ManagedClusterAddOnSpec {
                install_namespace: Some(ADDON_INSTALL_NAMESPACE.to_string()),
            },
            status: None,
        }
    }

    /// The namespace service accounts are created in on the managed cluster. Falls back to the
    /// namespace reported in the status, then to the well-known managed-serviceaccount namespace.
    pub fn install_namespace(&self) -> &str {
        self.spec
            .install_namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .or_else(|| {
                self.status
                    .as_ref()
                    .and_then(|status| status.namespace.as_deref())
                    .filter(|ns| !ns.is_empty())
            })
            .unwrap_or(ADDON_INSTALL_NAMESPACE)
    }
}

impl CrdExt for ManagedClusterAddOn {
    fn object_meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn conditions(&self) -> &[StatusCondition] {
        self.status
            .as_ref()
            .map(|status| status.conditions.as_slice())
            .unwrap_or_default()
    }
}

use crate::constants::{
    ADDON_GROUP, AUTHENTICATION_GROUP, CLUSTER_GROUP, ENGINE_GROUP, K8S_AUTHENTICATION_GROUP,
    OPERATOR_GROUP,
};
use kube::api::ApiResource;
use kube::core::TypeMeta;

/// The identity of a kind of Kubernetes object as the dynamic API needs it: group, version, kind,
/// the plural resource name used in URLs, and whether objects live in a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
    pub namespaced: bool,
}

impl ResourceId {
    /// `group/version`, or just `version` for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.to_string()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn type_meta(&self) -> TypeMeta {
        TypeMeta {
            api_version: self.api_version(),
            kind: self.kind.to_string(),
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource {
            group: self.group.to_string(),
            version: self.version.to_string(),
            api_version: self.api_version(),
            kind: self.kind.to_string(),
            plural: self.plural.to_string(),
        }
    }
}

pub const MANAGED_CLUSTER: ResourceId = ResourceId {
    group: CLUSTER_GROUP,
    version: "v1",
    kind: "ManagedCluster",
    plural: "managedclusters",
    namespaced: false,
};

pub const MANAGED_CLUSTER_ADDON: ResourceId = ResourceId {
    group: ADDON_GROUP,
    version: "v1alpha1",
    kind: "ManagedClusterAddOn",
    plural: "managedclusteraddons",
    namespaced: true,
};

pub const MANAGED_SERVICE_ACCOUNT: ResourceId = ResourceId {
    group: AUTHENTICATION_GROUP,
    version: "v1alpha1",
    kind: "ManagedServiceAccount",
    plural: "managedserviceaccounts",
    namespaced: true,
};

pub const SECRET: ResourceId = ResourceId {
    group: "",
    version: "v1",
    kind: "Secret",
    plural: "secrets",
    namespaced: true,
};

pub const TOKEN_REVIEW: ResourceId = ResourceId {
    group: K8S_AUTHENTICATION_GROUP,
    version: "v1",
    kind: "TokenReview",
    plural: "tokenreviews",
    namespaced: false,
};

pub const MULTICLUSTER_HUB: ResourceId = ResourceId {
    group: OPERATOR_GROUP,
    version: "v1",
    kind: "MultiClusterHub",
    plural: "multiclusterhubs",
    namespaced: false,
};

pub const MULTICLUSTER_ENGINE: ResourceId = ResourceId {
    group: ENGINE_GROUP,
    version: "v1",
    kind: "MultiClusterEngine",
    plural: "multiclusterengines",
    namespaced: false,
};

#[test]
fn core_group_api_version() {
    assert_eq!(SECRET.api_version(), "v1");
    assert_eq!(
        MANAGED_SERVICE_ACCOUNT.api_version(),
        "authentication.open-cluster-management.io/v1alpha1"
    );
    assert_eq!(
        MULTICLUSTER_ENGINE.api_resource().plural,
        "multiclusterengines"
    );
}

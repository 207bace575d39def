/// Helper macro to avoid retyping the base domain-like name of Open Cluster Management API groups.
/// When given no parameters, this returns the base domain. When given a string literal parameter
/// it returns `parameter.<base domain>`.
macro_rules! ocm {
    () => {
        "open-cluster-management.io"
    };
    ($s:literal) => {
        concat!($s, ".", ocm!())
    };
}

// API groups
pub const ADDON_GROUP: &str = ocm!("addon");
pub const AUTHENTICATION_GROUP: &str = ocm!("authentication");
pub const CLUSTER_GROUP: &str = ocm!("cluster");
pub const OPERATOR_GROUP: &str = ocm!("operator");
pub const ENGINE_GROUP: &str = "multicluster.openshift.io";
pub const K8S_AUTHENTICATION_GROUP: &str = "authentication.k8s.io";

// Add-on identifiers
pub const ADDON_NAME: &str = "managed-serviceaccount";
pub const ADDON_INSTALL_NAMESPACE: &str = "open-cluster-management-managed-serviceaccount";

/// The entry in the multi-cluster engine's `spec.overrides.components` list that switches the
/// managed-serviceaccount feature on and off.
pub const FEATURE_COMPONENT: &str = "managedserviceaccount";

// Managed service account identifiers
pub const ACCOUNT_NAME_PREFIX: &str = "e2e-";
pub const SERVICE_ACCOUNT_USER_PREFIX: &str = "system:serviceaccount";
pub const TOKEN_KEY: &str = "token";
pub const TOKEN_REVIEW_NAME: &str = "token-review-request";

// Condition types
pub const CONDITION_AVAILABLE: &str = "Available";
pub const CONDITION_SECRET_CREATED: &str = "SecretCreated";
pub const CONDITION_TOKEN_REPORTED: &str = "TokenReported";
pub const CONDITION_TRUE: &str = "True";

#[test]
fn ocm_constants_macro_test() {
    assert_eq!("open-cluster-management.io", ocm!());
    assert_eq!("addon.open-cluster-management.io", ADDON_GROUP);
    assert_eq!(
        "authentication.open-cluster-management.io",
        AUTHENTICATION_GROUP
    );
}

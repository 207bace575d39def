use crate::crd_ext::{CrdExt, StatusCondition};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A hub-side request for a service account token to be issued on a managed cluster and synced
/// back to the hub as a `Secret`.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    derive = "Default",
    derive = "PartialEq",
    group = "authentication.open-cluster-management.io",
    kind = "ManagedServiceAccount",
    namespaced,
    plural = "managedserviceaccounts",
    singular = "managedserviceaccount",
    status = "ManagedServiceAccountStatus",
    version = "v1alpha1"
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedServiceAccountSpec {
    pub rotation: Rotation,
}

/// Token rotation policy.
#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    #[serde(default)]
    pub enabled: bool,
    /// How long an issued token stays valid, in Go duration notation (e.g. `1h0m0s`).
    pub validity: String,
}

impl Rotation {
    pub fn new(enabled: bool, validity: Duration) -> Self {
        Self {
            enabled,
            validity: format_validity(validity),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedServiceAccountStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<StatusCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_timestamp: Option<String>,
    /// Where the reconciler stored the issued token on the hub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret_ref: Option<SecretRef>,
}

#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refresh_timestamp: Option<String>,
}

impl ManagedServiceAccount {
    /// A new account request in `namespace` whose final name the API server generates from
    /// `name_prefix`.
    pub fn with_generated_name(namespace: &str, name_prefix: &str, rotation: Rotation) -> Self {
        ManagedServiceAccount {
            metadata: ObjectMeta {
                generate_name: Some(name_prefix.to_string()),
                namespace: Some(namespace.to_string()),
                ..ObjectMeta::default()
            },
            spec: ManagedServiceAccountSpec { rotation },
            status: None,
        }
    }

    pub fn token_secret_name(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.token_secret_ref.as_ref())
            .map(|secret_ref| secret_ref.name.as_str())
    }
}

impl CrdExt for ManagedServiceAccount {
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

/// Render a duration the way Go's `time.Duration.String` does for whole seconds, which is how
/// `metav1.Duration` values are written (`1h0m0s`, `1m30s`, `45s`).
pub fn format_validity(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

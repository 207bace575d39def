use crate::constants::CONDITION_TRUE;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One entry of an Open Cluster Management `status.conditions` list.
#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCondition {
    #[serde(rename = "type")]
    pub type_: String,
    /// `True`, `False` or `Unknown`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl StatusCondition {
    pub fn new<S1, S2>(type_: S1, status: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            type_: type_.into(),
            status: status.into(),
            ..Self::default()
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == CONDITION_TRUE
    }
}

/// Provides some conveniences for querying the Open Cluster Management objects this suite reads.
pub trait CrdExt {
    /// Returns this objects `ObjectMeta` information (i.e. the `metadata` field).
    fn object_meta(&self) -> &ObjectMeta;

    /// Returns the conditions found in the object's status, or an empty slice when the status has
    /// not been written yet.
    fn conditions(&self) -> &[StatusCondition];

    /// Returns the object.metadata.name field, unwrapping a potential `None` with `""`. An object
    /// read back from the API always has a name, so we do away with the `Option` for convenience.
    fn object_name(&self) -> &str {
        self.object_meta().name.as_deref().unwrap_or("")
    }

    /// The first condition of the given type, if any.
    fn condition(&self, type_: &str) -> Option<&StatusCondition> {
        self.conditions().iter().find(|c| c.type_ == type_)
    }

    /// Is there a condition of the given type with status `True`.
    fn is_condition_true(&self, type_: &str) -> bool {
        self.conditions()
            .iter()
            .any(|c| c.type_ == type_ && c.is_true())
    }
}

use super::error::{self, AllowNotFound, Result};
use super::ClusterApi;
use crate::constants::FEATURE_COMPONENT;
use crate::resource_id::{ResourceId, MULTICLUSTER_ENGINE, MULTICLUSTER_HUB};
use kube::api::DynamicObject;
use log::{debug, info};
use serde_json::{json, Value};
use snafu::{ensure, OptionExt, ResultExt};
use std::fmt::{Display, Formatter};

/// Which operator installed the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubFlavor {
    /// A `MultiClusterHub` exists. Its components are managed through the engine it owns.
    MultiClusterHub(String),
    /// Only a `MultiClusterEngine` exists.
    MultiClusterEngine(String),
}

impl Display for HubFlavor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HubFlavor::MultiClusterHub(name) => write!(f, "MultiClusterHub '{}'", name),
            HubFlavor::MultiClusterEngine(name) => write!(f, "MultiClusterEngine '{}' only", name),
        }
    }
}

/// Reads and toggles the operator objects that decide which hub features are installed. These
/// objects are handled untyped since only a small part of them is of interest.
pub struct HubOperatorClient<'a> {
    hub: &'a dyn ClusterApi,
}

impl<'a> HubOperatorClient<'a> {
    pub fn new(hub: &'a dyn ClusterApi) -> Self {
        Self { hub }
    }

    async fn list(&self, resource: &ResourceId) -> Result<Vec<DynamicObject>> {
        Ok(self
            .hub
            .list(resource, None)
            .await
            .context(error::KubeApiCallSnafu {
                method: "list",
                what: format!("{}s on '{}'", resource.kind, self.hub.name()),
            })?)
    }

    /// The first `MultiClusterHub`, or `None` when there is none or the kind is not installed.
    pub async fn multicluster_hub(&self) -> Result<Option<DynamicObject>> {
        Ok(self
            .list(&MULTICLUSTER_HUB)
            .await
            .allow_not_found(|_| debug!("MultiClusterHub is not served by the hub"))?
            .and_then(|hubs| hubs.into_iter().next()))
    }

    /// The first `MultiClusterEngine`. Its absence is an error.
    pub async fn multicluster_engine(&self) -> Result<DynamicObject> {
        Ok(self
            .list(&MULTICLUSTER_ENGINE)
            .await?
            .into_iter()
            .next()
            .context(error::MultiClusterEngineMissingSnafu)?)
    }

    pub async fn hub_flavor(&self) -> Result<HubFlavor> {
        if let Some(hub) = self.multicluster_hub().await? {
            let name = hub.metadata.name.unwrap_or_default();
            return Ok(HubFlavor::MultiClusterHub(name));
        }
        let engine = self.multicluster_engine().await?;
        let name = engine.metadata.name.unwrap_or_default();
        Ok(HubFlavor::MultiClusterEngine(name))
    }

    /// Switch the `managedserviceaccount` component of the engine on or off. Changes go to the
    /// engine even when a `MultiClusterHub` exists, since the hub's admission webhook rejects
    /// edits to its own component list.
    pub async fn set_feature(&self, enabled: bool) -> Result<()> {
        let mut engine = self.multicluster_engine().await?;
        set_component(&mut engine, FEATURE_COMPONENT, enabled)?;
        let name = engine.metadata.name.clone().unwrap_or_default();
        info!(
            "setting component '{}' of MultiClusterEngine '{}' to enabled={}",
            FEATURE_COMPONENT, name, enabled
        );
        self.hub
            .replace(&MULTICLUSTER_ENGINE, None, &engine)
            .await
            .context(error::KubeApiCallSnafu {
                method: "update",
                what: format!("MultiClusterEngine '{}' on '{}'", name, self.hub.name()),
            })?;
        Ok(())
    }
}

/// Set `enabled` on the entry of `spec.overrides.components` called `component`, appending a new
/// entry if there is none. Other entries, their order, and any other keys of the matching entry
/// are left alone. If several entries share the name the last one is updated.
pub fn set_component(object: &mut DynamicObject, component: &str, enabled: bool) -> Result<()> {
    let name = object.metadata.name.clone().unwrap_or_default();
    let components = object
        .data
        .pointer_mut("/spec/overrides/components")
        .and_then(Value::as_array_mut)
        .context(error::ComponentsMissingSnafu { name: &name })?;

    let mut found = None;
    for (index, entry) in components.iter().enumerate() {
        let entry = entry.as_object();
        ensure!(
            entry.is_some(),
            error::ComponentFormatSnafu {
                name: &name,
                index
            }
        );
        if entry.and_then(|e| e.get("name")).and_then(Value::as_str) == Some(component) {
            found = Some(index);
        }
    }

    match found.and_then(|index| components.get_mut(index)) {
        Some(Value::Object(entry)) => {
            entry.insert("enabled".to_string(), Value::Bool(enabled));
        }
        _ => components.push(json!({ "enabled": enabled, "name": component })),
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clients::ErrorKind;
    use crate::mock::{MockCluster, Verb};
    use http::StatusCode;

    fn engine(components: Value) -> DynamicObject {
        let mut engine = DynamicObject::new(
            "multiclusterengine",
            &MULTICLUSTER_ENGINE.api_resource(),
        );
        engine.data = json!({ "spec": { "overrides": { "components": components } } });
        engine
    }

    fn components(object: &DynamicObject) -> Value {
        object.data["spec"]["overrides"]["components"].clone()
    }

    #[test]
    fn toggle_existing_entry_in_place() {
        let mut object = engine(json!([
            { "name": "console-mce", "enabled": true },
            { "name": "managedserviceaccount", "enabled": false, "configOverrides": {} },
            { "name": "hypershift", "enabled": true },
        ]));
        set_component(&mut object, "managedserviceaccount", true).unwrap();
        let expected = json!([
            { "name": "console-mce", "enabled": true },
            { "name": "managedserviceaccount", "enabled": true, "configOverrides": {} },
            { "name": "hypershift", "enabled": true },
        ]);
        assert_eq!(components(&object), expected);

        set_component(&mut object, "managedserviceaccount", true).unwrap();
        assert_eq!(components(&object), expected);
    }

    #[test]
    fn append_missing_entry() {
        let mut object = engine(json!([{ "name": "console-mce", "enabled": true }]));
        set_component(&mut object, "managedserviceaccount", false).unwrap();
        assert_eq!(
            components(&object),
            json!([
                { "name": "console-mce", "enabled": true },
                { "name": "managedserviceaccount", "enabled": false },
            ])
        );
    }

    #[test]
    fn last_duplicate_wins() {
        let mut object = engine(json!([
            { "name": "managedserviceaccount", "enabled": false },
            { "name": "managedserviceaccount", "enabled": false },
        ]));
        set_component(&mut object, "managedserviceaccount", true).unwrap();
        assert_eq!(
            components(&object),
            json!([
                { "name": "managedserviceaccount", "enabled": false },
                { "name": "managedserviceaccount", "enabled": true },
            ])
        );
    }

    #[test]
    fn malformed_components() {
        let mut missing = DynamicObject::new("mce", &MULTICLUSTER_ENGINE.api_resource());
        missing.data = json!({ "spec": {} });
        let err = set_component(&mut missing, "managedserviceaccount", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let mut bad_entry = engine(json!([
            { "name": "managedserviceaccount", "enabled": false },
            "console-mce",
        ]));
        let err = set_component(&mut bad_entry, "managedserviceaccount", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        // nothing is modified when an entry is malformed
        assert_eq!(
            components(&bad_entry)[0],
            json!({ "name": "managedserviceaccount", "enabled": false })
        );
    }

    #[tokio::test]
    async fn flavor_prefers_multicluster_hub() {
        let hub = MockCluster::new("hub");
        hub.insert_generic(&MULTICLUSTER_ENGINE, engine(json!([])));
        let client = HubOperatorClient::new(&hub);
        assert_eq!(
            client.hub_flavor().await.unwrap(),
            HubFlavor::MultiClusterEngine("multiclusterengine".to_string())
        );

        hub.insert_generic(
            &MULTICLUSTER_HUB,
            DynamicObject::new("multiclusterhub", &MULTICLUSTER_HUB.api_resource()),
        );
        assert_eq!(
            client.hub_flavor().await.unwrap(),
            HubFlavor::MultiClusterHub("multiclusterhub".to_string())
        );
    }

    #[tokio::test]
    async fn missing_hub_and_engine() {
        let hub = MockCluster::new("hub");
        let client = HubOperatorClient::new(&hub);
        assert!(client.multicluster_hub().await.unwrap().is_none());
        hub.fail_next(Verb::List, &MULTICLUSTER_HUB, StatusCode::NOT_FOUND);
        assert!(client.multicluster_hub().await.unwrap().is_none());

        let err = client.multicluster_engine().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        hub.fail_next(Verb::List, &MULTICLUSTER_ENGINE, StatusCode::NOT_FOUND);
        let err = client.multicluster_engine().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn set_feature_updates_engine() {
        let hub = MockCluster::new("hub");
        let initial = json!([{ "name": "managedserviceaccount", "enabled": false }]);
        hub.insert_generic(&MULTICLUSTER_ENGINE, engine(initial));
        let client = HubOperatorClient::new(&hub);
        client.set_feature(true).await.unwrap();
        assert_eq!(hub.count(Verb::Replace, &MULTICLUSTER_ENGINE), 1);
        let stored = client.multicluster_engine().await.unwrap();
        assert_eq!(
            components(&stored),
            json!([{ "name": "managedserviceaccount", "enabled": true }])
        );
    }
}

/*!

Conversion between the typed objects this suite works with and kube's generic [`DynamicObject`].
Every call that crosses the [`ClusterApi`](crate::clients::ClusterApi) boundary goes through one of
these two functions, so the rest of the code never touches untyped attribute maps.

!*/

use crate::error::{self, Result};
use crate::resource_id::ResourceId;
use kube::api::DynamicObject;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use snafu::{ensure, ResultExt};

/// Convert a typed object to its generic representation. If the typed object does not carry
/// `apiVersion` and `kind`, they are taken from `resource`.
pub fn to_generic<K>(object: &K, resource: &ResourceId) -> Result<DynamicObject>
where
    K: Serialize,
{
    let kind = resource.kind;
    let value = serde_json::to_value(object).context(error::ToGenericSnafu { kind })?;
    ensure!(value.is_object(), error::NotAnObjectSnafu { kind });
    let mut generic: DynamicObject =
        serde_json::from_value(value).context(error::ToGenericSnafu { kind })?;
    if generic.types.is_none() {
        generic.types = Some(resource.type_meta());
    }
    Ok(generic)
}

/// Convert a generic object into `K`. Items of a list response come back without `apiVersion`
/// and `kind`; those are filled in from `resource` before decoding.
pub fn from_generic<K>(object: &DynamicObject, resource: &ResourceId) -> Result<K>
where
    K: DeserializeOwned,
{
    let name = object.metadata.name.clone().unwrap_or_default();
    let mut value = serde_json::to_value(object).context(error::FromGenericSnafu {
        kind: resource.kind,
        name: &name,
    })?;
    if let Value::Object(map) = &mut value {
        map.entry("apiVersion")
            .or_insert_with(|| Value::String(resource.api_version()));
        map.entry("kind")
            .or_insert_with(|| Value::String(resource.kind.to_string()));
    }
    Ok(serde_json::from_value(value).context(error::FromGenericSnafu {
        kind: resource.kind,
        name,
    })?)
}

/*!

In-memory stand-ins for an API server and for time, so that clients and whole scenarios can be
exercised without a cluster.

[`MockCluster`] stores objects by resource, namespace and name and answers the way an API server
does: 404 for missing objects, 409 for duplicate creates, `generateName` expansion, and
`TokenReview`s that are answered but never stored. Failures can be injected per verb and resource
and the controllers of an Open Cluster Management hub can be simulated with create reactors.

!*/

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use crate::clients::{ClusterApi, TypedResource};
use crate::constants::{
    CONDITION_AVAILABLE, CONDITION_SECRET_CREATED, CONDITION_TOKEN_REPORTED, CONDITION_TRUE,
    SERVICE_ACCOUNT_USER_PREFIX, TOKEN_KEY,
};
use crate::convert::{from_generic, to_generic};
use crate::managed_service_account::{ManagedServiceAccountStatus, SecretRef};
use crate::poll::Clock;
use crate::resource_id::{
    ResourceId, MANAGED_CLUSTER_ADDON, MANAGED_SERVICE_ACCOUNT, SECRET, TOKEN_REVIEW,
};
use crate::{ManagedClusterAddOn, ManagedClusterAddOnStatus, ManagedServiceAccount, StatusCondition};
use async_trait::async_trait;
use http::StatusCode;
use k8s_openapi::api::authentication::v1::{TokenReview, TokenReviewStatus, UserInfo};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::DynamicObject;
use kube::error::ErrorResponse;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// The API verbs [`MockCluster`] counts and can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    List,
    Create,
    Replace,
    Delete,
}

/// Called with every object successfully created for a resource. The returned objects are stored
/// afterwards, replacing any object with the same identity, which lets a reactor both fill in the
/// status of the new object and create others.
pub type Reactor = dyn Fn(&DynamicObject) -> Vec<(ResourceId, DynamicObject)> + Send + Sync;

type Key = (&'static str, Option<String>, String);

#[derive(Default)]
struct State {
    objects: BTreeMap<Key, DynamicObject>,
    failures: Vec<(Verb, &'static str, StatusCode)>,
    counts: HashMap<(Verb, &'static str), usize>,
    generated: u64,
    resource_version: u64,
    tokens: HashMap<String, String>,
    trusted_namespaces: Vec<String>,
}

pub struct MockCluster {
    name: String,
    state: Mutex<State>,
    reactors: Mutex<Vec<(&'static str, Arc<Reactor>)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn api_error(code: StatusCode, message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: code.canonical_reason().unwrap_or_default().replace(' ', ""),
        code: code.as_u16(),
    })
}

fn not_found(resource: &ResourceId, name: &str) -> kube::Error {
    api_error(
        StatusCode::NOT_FOUND,
        format!("{} \"{}\" not found", resource.plural, name),
    )
}

fn key(resource: &ResourceId, namespace: Option<&str>, name: &str) -> Key {
    (
        resource.plural,
        namespace
            .filter(|_| resource.namespaced)
            .map(str::to_string),
        name.to_string(),
    )
}

impl MockCluster {
    pub fn new<S>(name: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            state: Mutex::new(State::default()),
            reactors: Mutex::new(Vec::new()),
        }
    }

    /// Store `object`, replacing any object with the same name.
    pub fn insert<K>(&self, object: &K)
    where
        K: TypedResource,
    {
        let generic = to_generic(object, &K::RESOURCE).expect("unable to convert object");
        self.insert_generic(&K::RESOURCE, generic);
    }

    /// Store an untyped object, replacing any object with the same name.
    pub fn insert_generic(&self, resource: &ResourceId, mut object: DynamicObject) {
        if object.types.is_none() {
            object.types = Some(resource.type_meta());
        }
        let mut state = lock(&self.state);
        state.resource_version += 1;
        object.metadata.resource_version = Some(state.resource_version.to_string());
        let name = object.metadata.name.clone().unwrap_or_default();
        let key = key(resource, object.metadata.namespace.as_deref(), &name);
        state.objects.insert(key, object);
    }

    /// A copy of the stored object, if there is one.
    pub fn get_stored(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        name: &str,
    ) -> Option<DynamicObject> {
        lock(&self.state)
            .objects
            .get(&key(resource, namespace, name))
            .cloned()
    }

    /// The next `verb` request for `resource` fails with `code`. Calls queue up.
    pub fn fail_next(&self, verb: Verb, resource: &ResourceId, code: StatusCode) {
        lock(&self.state)
            .failures
            .push((verb, resource.plural, code));
    }

    /// How many `verb` requests for `resource` have been received, including failed ones.
    pub fn count(&self, verb: Verb, resource: &ResourceId) -> usize {
        lock(&self.state)
            .counts
            .get(&(verb, resource.plural))
            .copied()
            .unwrap_or_default()
    }

    pub fn on_create<F>(&self, resource: &ResourceId, reactor: F)
    where
        F: Fn(&DynamicObject) -> Vec<(ResourceId, DynamicObject)> + Send + Sync + 'static,
    {
        let reactor: Arc<Reactor> = Arc::new(reactor);
        lock(&self.reactors).push((resource.plural, reactor));
    }

    /// `TokenReview`s of `token` authenticate as `username`.
    pub fn authenticate<S1, S2>(&self, token: S1, username: S2)
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        lock(&self.state)
            .tokens
            .insert(token.into(), username.into());
    }

    /// Tokens issued by [`MockCluster::simulate_account_controller`] authenticate as the service
    /// account of the same name in `namespace`.
    pub fn trust_account_tokens<S>(&self, namespace: S)
    where
        S: Into<String>,
    {
        lock(&self.state).trusted_namespaces.push(namespace.into());
    }

    /// Mark every created managed-serviceaccount add-on `Available`, the way the add-on manager
    /// does once the agent is running.
    pub fn simulate_addon_manager(&self) {
        self.on_create(&MANAGED_CLUSTER_ADDON, |object| {
            let mut addon: ManagedClusterAddOn =
                from_generic(object, &MANAGED_CLUSTER_ADDON).expect("invalid add-on");
            let install_namespace = addon.install_namespace().to_string();
            addon.status = Some(ManagedClusterAddOnStatus {
                conditions: vec![StatusCondition::new(CONDITION_AVAILABLE, CONDITION_TRUE)],
                namespace: Some(install_namespace),
            });
            vec![(
                MANAGED_CLUSTER_ADDON,
                to_generic(&addon, &MANAGED_CLUSTER_ADDON).expect("invalid add-on"),
            )]
        });
    }

    /// Complete every created `ManagedServiceAccount`: both conditions become `True` and a secret
    /// holding `token-for-<account name>` is written next to it.
    pub fn simulate_account_controller(&self) {
        self.on_create(&MANAGED_SERVICE_ACCOUNT, |object| {
            let mut account: ManagedServiceAccount =
                from_generic(object, &MANAGED_SERVICE_ACCOUNT).expect("invalid account");
            let name = account.metadata.name.clone().unwrap_or_default();
            account.status = Some(ManagedServiceAccountStatus {
                conditions: vec![
                    StatusCondition::new(CONDITION_TOKEN_REPORTED, CONDITION_TRUE),
                    StatusCondition::new(CONDITION_SECRET_CREATED, CONDITION_TRUE),
                ],
                token_secret_ref: Some(SecretRef {
                    name: name.clone(),
                    last_refresh_timestamp: None,
                }),
                ..ManagedServiceAccountStatus::default()
            });
            let secret = Secret {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    namespace: account.metadata.namespace.clone(),
                    ..ObjectMeta::default()
                },
                data: Some(BTreeMap::from([(
                    TOKEN_KEY.to_string(),
                    ByteString(issued_token(&name).into_bytes()),
                )])),
                ..Secret::default()
            };
            vec![
                (
                    MANAGED_SERVICE_ACCOUNT,
                    to_generic(&account, &MANAGED_SERVICE_ACCOUNT).expect("invalid account"),
                ),
                (
                    SECRET,
                    to_generic(&secret, &SECRET).expect("invalid secret"),
                ),
            ]
        });
    }

    /// Count the request and pop a matching injected failure, if any.
    fn record(&self, verb: Verb, resource: &ResourceId) -> kube::Result<()> {
        let mut state = lock(&self.state);
        *state.counts.entry((verb, resource.plural)).or_default() += 1;
        let position = state
            .failures
            .iter()
            .position(|(v, plural, _)| *v == verb && *plural == resource.plural);
        match position {
            Some(position) => {
                let (_, _, code) = state.failures.remove(position);
                Err(api_error(
                    code,
                    format!("injected {:?} failure for {}", verb, resource.plural),
                ))
            }
            None => Ok(()),
        }
    }

    fn review(&self, object: &DynamicObject) -> kube::Result<DynamicObject> {
        let mut review: TokenReview = from_generic(object, &TOKEN_REVIEW)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        let token = review.spec.token.clone().unwrap_or_default();
        let username = {
            let state = lock(&self.state);
            state.tokens.get(&token).cloned().or_else(|| {
                let account = token.strip_prefix(ISSUED_TOKEN_PREFIX)?;
                state.trusted_namespaces.first().map(|namespace| {
                    format!("{}:{}:{}", SERVICE_ACCOUNT_USER_PREFIX, namespace, account)
                })
            })
        };
        review.status = Some(match username {
            Some(username) => TokenReviewStatus {
                authenticated: Some(true),
                user: Some(UserInfo {
                    username: Some(username),
                    ..UserInfo::default()
                }),
                ..TokenReviewStatus::default()
            },
            None => TokenReviewStatus {
                authenticated: Some(false),
                error: Some("invalid bearer token".to_string()),
                ..TokenReviewStatus::default()
            },
        });
        to_generic(&review, &TOKEN_REVIEW)
            .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}

const ISSUED_TOKEN_PREFIX: &str = "token-for-";

/// The token [`MockCluster::simulate_account_controller`] issues for an account.
pub fn issued_token(account_name: &str) -> String {
    format!("{}{}", ISSUED_TOKEN_PREFIX, account_name)
}

#[async_trait]
impl ClusterApi for MockCluster {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<DynamicObject> {
        self.record(Verb::Get, resource)?;
        self.get_stored(resource, namespace, name)
            .ok_or_else(|| not_found(resource, name))
    }

    async fn list(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
    ) -> kube::Result<Vec<DynamicObject>> {
        self.record(Verb::List, resource)?;
        let namespace = namespace.filter(|_| resource.namespaced);
        Ok(lock(&self.state)
            .objects
            .iter()
            .filter(|((plural, ns, _), _)| {
                *plural == resource.plural && (namespace.is_none() || ns.as_deref() == namespace)
            })
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn create(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> kube::Result<DynamicObject> {
        self.record(Verb::Create, resource)?;
        if resource.plural == TOKEN_REVIEW.plural {
            return self.review(object);
        }

        let mut object = object.clone();
        let namespace = namespace.filter(|_| resource.namespaced);
        object.metadata.namespace = namespace.map(str::to_string);
        {
            let mut state = lock(&self.state);
            let name = match (&object.metadata.name, &object.metadata.generate_name) {
                (Some(name), _) if !name.is_empty() => name.clone(),
                (_, Some(prefix)) => {
                    state.generated += 1;
                    format!("{}{:05x}", prefix, state.generated)
                }
                _ => {
                    return Err(api_error(
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "name or generateName is required".to_string(),
                    ))
                }
            };
            let key = key(resource, namespace, &name);
            if state.objects.contains_key(&key) {
                return Err(api_error(
                    StatusCode::CONFLICT,
                    format!("{} \"{}\" already exists", resource.plural, name),
                ));
            }
            state.resource_version += 1;
            object.metadata.name = Some(name);
            object.metadata.resource_version = Some(state.resource_version.to_string());
            if object.types.is_none() {
                object.types = Some(resource.type_meta());
            }
            state.objects.insert(key, object.clone());
        }

        let reactors: Vec<Arc<Reactor>> = lock(&self.reactors)
            .iter()
            .filter(|(plural, _)| *plural == resource.plural)
            .map(|(_, reactor)| Arc::clone(reactor))
            .collect();
        for reactor in reactors {
            for (resource, reaction) in reactor(&object) {
                self.insert_generic(&resource, reaction);
            }
        }
        Ok(object)
    }

    async fn replace(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        object: &DynamicObject,
    ) -> kube::Result<DynamicObject> {
        self.record(Verb::Replace, resource)?;
        let name = object.metadata.name.clone().unwrap_or_default();
        let namespace = namespace.filter(|_| resource.namespaced);
        let mut state = lock(&self.state);
        let key = key(resource, namespace, &name);
        if !state.objects.contains_key(&key) {
            return Err(not_found(resource, &name));
        }
        state.resource_version += 1;
        let mut object = object.clone();
        object.metadata.namespace = namespace.map(str::to_string);
        object.metadata.resource_version = Some(state.resource_version.to_string());
        if object.types.is_none() {
            object.types = Some(resource.type_meta());
        }
        state.objects.insert(key, object.clone());
        Ok(object)
    }

    async fn delete(
        &self,
        resource: &ResourceId,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<()> {
        self.record(Verb::Delete, resource)?;
        lock(&self.state)
            .objects
            .remove(&key(resource, namespace, name))
            .map(|_| ())
            .ok_or_else(|| not_found(resource, name))
    }
}

/// A [`Clock`] whose time only moves when something sleeps on it. Sleeps return immediately.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    sleeps: Mutex<Vec<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Total time slept so far.
    pub fn elapsed(&self) -> Duration {
        lock(&self.sleeps).iter().sum()
    }

    /// Every sleep, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        lock(&self.sleeps).push(duration);
        tokio::task::yield_now().await;
    }
}

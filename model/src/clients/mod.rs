/*!

Typed access to the objects of an Open Cluster Management hub and its managed clusters. Every
client here borrows a [`ClusterApi`] endpoint and talks to it one request at a time.

!*/

mod addon_client;
mod cluster_api;
mod error;
mod hub_operator_client;
mod managed_cluster_client;
mod managed_service_account_client;
mod resource_client;
mod token_review_client;

pub use addon_client::AddonClient;
pub use cluster_api::{ClusterApi, KubeEndpoint};
pub use error::{AllowNotFound, Error, ErrorKind, HttpStatusCode, Result, StatusCode};
pub use hub_operator_client::{set_component, HubFlavor, HubOperatorClient};
pub use managed_cluster_client::ManagedClusterClient;
pub use managed_service_account_client::{service_account_username, ManagedServiceAccountClient};
pub use resource_client::{ResourceClient, TypedResource};
pub use token_review_client::TokenReviewClient;

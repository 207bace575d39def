/*!

This library provides the Open Cluster Management object models used by the managed-serviceaccount
end-to-end suite, the API clients that read and write them on a hub and on a managed cluster, and
a fixed-interval poller for waiting on controllers.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use addon::{ManagedClusterAddOn, ManagedClusterAddOnSpec, ManagedClusterAddOnStatus};
pub use crd_ext::{CrdExt, StatusCondition};
pub use error::{Error, Result};
pub use managed_cluster::{
    ClientConfig, ManagedCluster, ManagedClusterSpec, ManagedClusterStatus, ManagedClusterVersion,
};
pub use managed_service_account::{
    format_validity, ManagedServiceAccount, ManagedServiceAccountSpec, ManagedServiceAccountStatus,
    Rotation, SecretRef,
};
pub use resource_id::ResourceId;

mod addon;
pub mod clients;
pub mod constants;
pub mod convert;
mod crd_ext;
mod error;
mod managed_cluster;
mod managed_service_account;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod poll;
pub mod resource_id;

/*!

An end-to-end check of the managed-serviceaccount add-on of Open Cluster Management. The
[`scenario`] installs the add-on for one managed cluster, has the hub issue a service account
token for it, proves that the managed cluster accepts the token, and then removes everything
again.

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

pub use context::{Context, Timing};
pub use error::{Error, Result};
pub use options::{ClusterOptions, Options, PollingOptions};
pub use scenario::{Report, Step, StepOutcome};

pub mod context;
mod error;
pub mod options;
pub mod scenario;

/*!

The managed-serviceaccount lifecycle, one step after the other:

1. resolve the managed cluster to test against (done while building the [`Context`]),
2. optionally switch on the feature on the hub's engine,
3. install the add-on and wait for it to be available,
4. create a managed service account and wait for its token,
5. check the token against the managed cluster's `TokenReview` API,
6. delete the account and wait for it to disappear,
7. delete the add-on and wait for it to disappear.

A failing step ends the run. Nothing created before the failure is cleaned up, so the state it
left behind can be inspected.

!*/

use crate::context::Context;
use crate::error::{self, Result};
use log::{info, warn};
use model::clients::{
    AddonClient, AllowNotFound, HubOperatorClient, ManagedServiceAccountClient, TokenReviewClient,
};
use model::constants::ACCOUNT_NAME_PREFIX;
use model::poll::await_condition;
use model::{CrdExt, Rotation};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Validity requested for the account's token.
pub const TOKEN_VALIDITY: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    ResolveCluster,
    EnableFeature,
    InstallAddon,
    CreateAccount,
    ValidateToken,
    DeleteAccount,
    UninstallAddon,
}

serde_plain::derive_display_from_serialize!(Step);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepOutcome {
    Passed,
    Skipped,
}

serde_plain::derive_display_from_serialize!(StepOutcome);

/// What happened in a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub cluster: String,
    pub account: Option<String>,
    pub steps: Vec<(Step, StepOutcome)>,
}

impl Report {
    pub fn outcome(&self, step: Step) -> Option<StepOutcome> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| *outcome)
    }

    fn record(&mut self, step: Step, outcome: StepOutcome) {
        info!("{}: {}", step, outcome);
        self.steps.push((step, outcome));
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "managed cluster: {}", self.cluster)?;
        if let Some(account) = &self.account {
            writeln!(f, "managed service account: {}", account)?;
        }
        for (step, outcome) in &self.steps {
            writeln!(f, "  {:<16}{}", step.to_string(), outcome)?;
        }
        Ok(())
    }
}

/// Run the whole lifecycle against `ctx`.
pub async fn run(ctx: &Context) -> Result<Report> {
    let mut report = Report {
        cluster: ctx.cluster_name().to_string(),
        ..Report::default()
    };
    report.record(Step::ResolveCluster, StepOutcome::Passed);

    report.record(Step::EnableFeature, enable_feature(ctx).await?);
    report.record(Step::InstallAddon, install_addon(ctx).await?);

    let account = create_account(ctx).await?;
    report.account = Some(account.clone());
    report.record(Step::CreateAccount, StepOutcome::Passed);

    validate_token(ctx, &account).await?;
    report.record(Step::ValidateToken, StepOutcome::Passed);

    delete_account(ctx, &account).await?;
    report.record(Step::DeleteAccount, StepOutcome::Passed);

    uninstall_addon(ctx).await?;
    report.record(Step::UninstallAddon, StepOutcome::Passed);

    Ok(report)
}

/// Switch on the feature when asked to. The hub flavor is only logged.
pub async fn enable_feature(ctx: &Context) -> Result<StepOutcome> {
    if !ctx.enable_feature {
        return Ok(StepOutcome::Skipped);
    }
    let step = Step::EnableFeature;
    let operator = HubOperatorClient::new(ctx.hub.as_ref());
    let flavor = operator
        .hub_flavor()
        .await
        .context(error::ClientSnafu { step })?;
    info!("hub installed by {}", flavor);
    operator
        .set_feature(true)
        .await
        .context(error::ClientSnafu { step })?;
    Ok(StepOutcome::Passed)
}

/// Install the add-on unless it already is, then wait for `Available`.
pub async fn install_addon(ctx: &Context) -> Result<StepOutcome> {
    let step = Step::InstallAddon;
    let addons = AddonClient::new(ctx.hub.as_ref(), &ctx.cluster);
    let existing = addons
        .get()
        .await
        .allow_not_found(|_| info!("add-on is not installed on '{}'", ctx.cluster_name()))
        .context(error::ClientSnafu { step })?;
    if existing.is_some() {
        warn!(
            "add-on is already installed on '{}', skipping installation",
            ctx.cluster_name()
        );
        return Ok(StepOutcome::Skipped);
    }

    addons.create().await.context(error::ClientSnafu { step })?;
    await_condition(
        ctx.clock.as_ref(),
        ctx.timing.addon,
        "add-on to become available",
        || addons.is_available(),
    )
    .await
    .context(error::PollSnafu { step })?;
    Ok(StepOutcome::Passed)
}

/// Create an account and wait until its token is reported. Returns the generated account name.
pub async fn create_account(ctx: &Context) -> Result<String> {
    let step = Step::CreateAccount;
    let accounts = ManagedServiceAccountClient::new(ctx.hub.as_ref(), &ctx.cluster);
    let account = accounts
        .create(ACCOUNT_NAME_PREFIX, Rotation::new(true, TOKEN_VALIDITY))
        .await
        .context(error::ClientSnafu { step })?;
    let name = account.object_name().to_string();
    await_condition(
        ctx.clock.as_ref(),
        ctx.timing.account,
        &format!("ManagedServiceAccount '{}' to report its token", name),
        || accounts.is_complete(&name),
    )
    .await
    .context(error::PollSnafu { step })?;
    Ok(name)
}

/// The managed cluster must authenticate the account's token as the account's service account.
pub async fn validate_token(ctx: &Context, account: &str) -> Result<()> {
    let step = Step::ValidateToken;
    let accounts = ManagedServiceAccountClient::new(ctx.hub.as_ref(), &ctx.cluster);
    let token = accounts
        .token(account)
        .await
        .context(error::ClientSnafu { step })?;
    let username = accounts
        .username(account)
        .await
        .context(error::ClientSnafu { step })?;
    TokenReviewClient::new(ctx.managed.as_ref())
        .validate(&token, &username)
        .await
        .context(error::ClientSnafu { step })
}

pub async fn delete_account(ctx: &Context, account: &str) -> Result<()> {
    let step = Step::DeleteAccount;
    let accounts = ManagedServiceAccountClient::new(ctx.hub.as_ref(), &ctx.cluster);
    accounts
        .get(account)
        .await
        .context(error::ClientSnafu { step })?;
    accounts
        .delete(account)
        .await
        .context(error::ClientSnafu { step })?;
    await_condition(
        ctx.clock.as_ref(),
        ctx.timing.deletion,
        &format!("ManagedServiceAccount '{}' to be deleted", account),
        || accounts.is_gone(account),
    )
    .await
    .context(error::PollSnafu { step })
}

pub async fn uninstall_addon(ctx: &Context) -> Result<()> {
    let step = Step::UninstallAddon;
    let addons = AddonClient::new(ctx.hub.as_ref(), &ctx.cluster);
    addons.get().await.context(error::ClientSnafu { step })?;
    addons.delete().await.context(error::ClientSnafu { step })?;
    await_condition(
        ctx.clock.as_ref(),
        ctx.timing.deletion,
        "add-on to be deleted",
        || addons.is_gone(),
    )
    .await
    .context(error::PollSnafu { step })
}

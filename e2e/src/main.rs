/*!

Runs the managed-serviceaccount end-to-end scenario against the clusters named in an options file,
or performs one of the hub-side maintenance actions it depends on.

!*/

use anyhow::{Context as _, Result};
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use model::clients::HubOperatorClient;
use msa_e2e::{context, scenario, Context, Options};
use std::path::PathBuf;

/// End-to-end test of the Open Cluster Management managed-serviceaccount add-on.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to the options file describing the hub and the managed clusters.
    #[clap(long = "options-file", env = "OPTIONS")]
    options_file: PathBuf,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Run the whole scenario.
    Run,
    /// Show whether the hub was installed by a MultiClusterHub or a MultiClusterEngine.
    HubInfo,
    /// Switch on the managedserviceaccount component of the MultiClusterEngine.
    EnableFeature,
    /// Switch off the managedserviceaccount component of the MultiClusterEngine.
    DisableFeature,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let options = Options::load(&args.options_file).await?;
    match args.command {
        Command::Run => {
            let ctx = Context::connect(&options).await?;
            let report = scenario::run(&ctx).await?;
            print!("{}", report);
        }
        Command::HubInfo => {
            let hub = context::connect_hub(&options).await?;
            let flavor = HubOperatorClient::new(hub.as_ref())
                .hub_flavor()
                .await
                .context("Unable to determine the hub flavor")?;
            println!("{}", flavor);
        }
        Command::EnableFeature => set_feature(&options, true).await?,
        Command::DisableFeature => set_feature(&options, false).await?,
    }
    Ok(())
}

async fn set_feature(options: &Options, enabled: bool) -> Result<()> {
    let hub = context::connect_hub(options).await?;
    HubOperatorClient::new(hub.as_ref())
        .set_feature(enabled)
        .await
        .context(format!(
            "Unable to set the managedserviceaccount component to enabled={}",
            enabled
        ))
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use the default level for this binary and its model crate.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("msa_e2e_model"), level)
                .init();
        }
    }
}

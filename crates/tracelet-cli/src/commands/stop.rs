//! `tlt stop` — Remove the instrumentation layer from the host and all
//! reachable containers.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use tracelet_common::config::StopConfig;
use tracelet_common::constants::BIN_NAME;
use tracelet_core::stop::{run_stop, CancelToken};

use crate::output;

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Proceed without the interactive warning. Required for any change to
    /// be made.
    #[arg(short, long)]
    pub force: bool,

    /// Print the run report as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Clean the host only; do not descend into container namespaces.
    #[arg(long)]
    pub no_containers: bool,

    /// Path to a JSON configuration file overriding the defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Executes the `stop` command.
///
/// # Errors
///
/// Returns an error on structural failure only: bad configuration, or the
/// inability to enumerate namespaces or processes at all. Per-item cleanup
/// failures are printed as unresolved items and exit 0.
#[allow(clippy::print_stdout)]
pub fn execute(args: StopArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => StopConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => StopConfig::default(),
    };
    if args.no_containers {
        config.scan_containers = false;
    }

    if !args.force {
        println!("{}", output::stop_warning(&config));
        println!("\nIf you wish to proceed, run `{BIN_NAME} stop --force`.");
        return Ok(());
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("interrupt received; finishing in-flight work");
        handler_token.cancel();
    })
    .context("installing interrupt handler")?;

    let report = run_stop(&config, &cancel).context("stop failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", output::render_report(&report));
    }
    Ok(())
}

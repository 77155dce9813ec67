use std::process::ExitCode;

use anyhow::{Context, Result};
use mirror_renderer::HarnessError;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::config::ResolvedConfig;

/// Exit status when no rendering context could be acquired.
const EXIT_CONTEXT_UNAVAILABLE: u8 = 2;

pub fn run(args: Args) -> Result<ExitCode> {
    initialise_tracing();

    let resolved = ResolvedConfig::discover(&args)?;
    if args.print_config {
        let json =
            serde_json::to_string_pretty(&resolved).context("failed to serialise configuration")?;
        println!("{json}");
        return Ok(ExitCode::SUCCESS);
    }

    tracing::info!(
        width = resolved.width,
        height = resolved.height,
        shaders = ?resolved.shaders,
        bounces = %resolved.bounces,
        vsync = resolved.vsync,
        "starting mirrortrace"
    );
    let config = resolved.into_harness_config()?;

    match mirror_renderer::run(config) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => halt_status(err).map(ExitCode::from),
    }
}

/// Turns an unavailable rendering context into a logged halt with its own
/// exit status. Every other failure is passed back to `main`.
fn halt_status(err: anyhow::Error) -> Result<u8> {
    match err.downcast_ref::<HarnessError>() {
        Some(harness_err) if harness_err.is_context_unavailable() => {
            tracing::error!(error = %harness_err, "rendering context unavailable; halting");
            Ok(EXIT_CONTEXT_UNAVAILABLE)
        }
        _ => Err(err),
    }
}

/// Logs go to stderr so `--print-config` output stays machine-readable.
fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

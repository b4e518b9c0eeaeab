//! `dockerless copy` command: forward one image without touching state.

use clap::Args;
use dockerless_runtime::provider::diagnostics::{Diagnostic, DOCKER_REGISTRY_ERROR};

use super::Context;
use crate::output::format_bytes;

#[derive(Args)]
pub struct CopyArgs {
    /// Source image (e.g., "nginx:1.25")
    pub source: String,

    /// Target image (e.g., "ghcr.io/org/nginx:1.25")
    pub target: String,

    /// Only print the pushed digest
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn execute(args: CopyArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let provider = super::configure(&ctx.provider_config()?)?;

    if !args.quiet {
        println!("Copying {} to {}...", args.source, args.target);
    }

    let result = provider
        .registry()
        .forward_image(&args.source, &args.target)
        .await
        .map_err(|e| Diagnostic::from_error(DOCKER_REGISTRY_ERROR, &e))?;

    if args.quiet {
        println!("{}", result.digest);
    } else {
        println!(
            "Pushed: {} ({})",
            result.reference,
            format_bytes(result.size_bytes)
        );
    }

    Ok(())
}

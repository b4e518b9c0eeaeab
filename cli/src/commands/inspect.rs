//! `dockerless inspect` command.

use clap::Args;
use dockerless_runtime::provider::diagnostics::{Diagnostic, DOCKER_REGISTRY_ERROR};

use super::Context;

#[derive(Args)]
pub struct InspectArgs {
    /// Image reference
    pub reference: String,

    /// Print reference and digest as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: InspectArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let provider = super::configure(&ctx.provider_config()?)?;

    let descriptor = provider
        .registry()
        .head(&args.reference)
        .await
        .map_err(|e| Diagnostic::from_error(DOCKER_REGISTRY_ERROR, &e))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
    } else {
        println!("{}", descriptor.digest);
    }
    Ok(())
}

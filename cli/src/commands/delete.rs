//! `dockerless delete` command.

use clap::Args;
use dockerless_runtime::provider::diagnostics::{Diagnostic, DOCKER_REGISTRY_ERROR};

use super::Context;

#[derive(Args)]
pub struct DeleteArgs {
    /// Image reference to delete (only this tag or digest)
    pub reference: String,
}

pub async fn execute(args: DeleteArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let provider = super::configure(&ctx.provider_config()?)?;

    provider
        .registry()
        .delete(&args.reference)
        .await
        .map_err(|e| Diagnostic::from_error(DOCKER_REGISTRY_ERROR, &e))?;

    println!("Deleted: {}", args.reference);
    Ok(())
}

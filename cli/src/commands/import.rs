//! `dockerless import` command.

use clap::Args;
use dockerless_core::config::is_valid_resource_name;
use dockerless_core::error::DockerlessError;

use super::Context;

#[derive(Args)]
pub struct ImportArgs {
    /// Resource name to record the image under
    pub name: String,

    /// Import ID: the image digest
    pub id: String,
}

pub async fn execute(args: ImportArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    if !is_valid_resource_name(&args.name) {
        return Err(DockerlessError::ConfigError(format!(
            "invalid resource name '{}': use letters, digits, '_' or '-'",
            args.name
        ))
        .into());
    }

    let provider = super::configure(&ctx.provider_config()?)?;
    let mut state = ctx.open_state()?;

    if state.get(&args.name).is_some() {
        return Err(DockerlessError::StateError(format!(
            "resource '{}' already exists in state",
            args.name
        ))
        .into());
    }

    let model = provider.remote_image().import_state(&args.id)?;
    state.upsert(&args.name, model)?;

    println!("Import successful: {} ({})", args.name, args.id.trim());
    Ok(())
}

//! `dockerless refresh` command.

use clap::Args;
use dockerless_runtime::provider::Diagnostics;
use dockerless_runtime::RemoteImageResource;

use super::Context;
use crate::state::StateFile;

#[derive(Args)]
pub struct RefreshArgs {}

pub async fn execute(_args: RefreshArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let provider = super::configure(&ctx.provider_config()?)?;
    let mut state = ctx.open_state()?;

    if state.is_empty() {
        println!("No resources in state.");
        return Ok(());
    }

    let (changed, warnings) = refresh_state(&provider.remote_image(), &mut state).await?;
    print_warnings(&warnings);
    println!("Refreshed state: {} digest(s) changed.", changed);
    Ok(())
}

/// Read every recorded resource and persist the results.
///
/// Returns how many digests changed and the warnings raised by the reads.
/// Stops at the first failing read.
pub(crate) async fn refresh_state(
    resource: &RemoteImageResource,
    state: &mut StateFile,
) -> Result<(usize, Diagnostics), Box<dyn std::error::Error>> {
    let mut changed = 0;
    let mut warnings = Diagnostics::new();
    for (name, model) in state.models() {
        let response = resource.read(&model).await.map_err(|d| {
            tracing::error!(resource = %name, "Refresh failed");
            d
        })?;
        warnings.extend(response.diagnostics);
        if response.state != model {
            changed += 1;
            state.upsert(&name, response.state)?;
        }
    }
    Ok((changed, warnings))
}

pub(crate) fn print_warnings(warnings: &Diagnostics) {
    for warning in warnings.iter() {
        eprintln!("Warning: {}", warning);
    }
}

//! `dockerless apply` command.

use clap::Args;
use dockerless_runtime::provider::{plan, Action, Plan};
use dockerless_runtime::RemoteImageResource;

use super::Context;
use crate::output::{plan_table, short_digest};
use crate::state::StateFile;

#[derive(Args)]
pub struct ApplyArgs {
    /// Refresh recorded digests before planning
    #[arg(long)]
    pub refresh: bool,
}

pub async fn execute(args: ApplyArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let declarations = ctx.declarations()?;
    let provider = super::configure(&declarations.provider)?;
    let resource = provider.remote_image();
    let mut state = ctx.open_state()?;

    if args.refresh && !state.is_empty() {
        let (_, warnings) = super::refresh::refresh_state(&resource, &mut state).await?;
        super::refresh::print_warnings(&warnings);
    }

    let plan = plan::plan(&declarations.resources, &state.models());
    if !plan.has_changes() {
        println!("No changes. Remote images match the declarations.");
        return Ok(());
    }

    println!("{}", plan_table(&plan));
    println!();

    apply_plan(&resource, &plan, &mut state).await?;

    println!();
    println!(
        "Apply complete! Resources: {} added, {} changed, {} destroyed.",
        plan.count(Action::Create),
        plan.count(Action::Update),
        plan.count(Action::Delete)
    );
    Ok(())
}

/// Execute `plan` in order, saving state after each resource.
///
/// Stops at the first failure; resources applied before it stay recorded.
pub(crate) async fn apply_plan(
    resource: &RemoteImageResource,
    plan: &Plan,
    state: &mut StateFile,
) -> Result<(), Box<dyn std::error::Error>> {
    for change in &plan.changes {
        let name = change.name.as_str();
        let result = match (change.action, &change.before, &change.after) {
            (Action::NoOp, _, _) => continue,
            (Action::Create, _, Some(after)) => {
                println!("{}: Creating...", name);
                resource.create(after).await.map(Some)
            }
            (Action::Update, Some(before), Some(after)) => {
                println!("{}: Modifying...", name);
                resource.update(after, before).await.map(Some)
            }
            (Action::Delete, Some(before), _) => {
                println!("{}: Destroying...", name);
                resource.delete(before).await.map(|_| None)
            }
            (action, _, _) => {
                tracing::warn!(resource = name, %action, "Skipping incomplete change");
                continue;
            }
        };

        match result {
            Ok(Some(model)) => {
                let digest = model.digest.clone().unwrap_or_default();
                state.upsert(name, model)?;
                println!("{}: Complete [digest={}]", name, short_digest(&digest));
            }
            Ok(None) => {
                state.remove(name)?;
                println!("{}: Destruction complete", name);
            }
            Err(diagnostic) => {
                tracing::error!(resource = name, action = %change.action, "Apply failed");
                return Err(diagnostic.into());
            }
        }
    }
    Ok(())
}

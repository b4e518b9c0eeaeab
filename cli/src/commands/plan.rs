//! `dockerless plan` command.

use clap::Args;
use dockerless_runtime::provider::plan;

use super::Context;
use crate::output::plan_table;

#[derive(Args)]
pub struct PlanArgs {
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: PlanArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let declarations = ctx.declarations()?;
    let state = ctx.open_state()?;

    let plan = plan::plan(&declarations.resources, &state.models());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if !plan.has_changes() {
        println!("No changes. Remote images match the declarations.");
        return Ok(());
    }

    println!("{}", plan_table(&plan));
    println!();
    println!("{}", plan.summary());
    Ok(())
}

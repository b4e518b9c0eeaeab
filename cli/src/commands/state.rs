//! `dockerless state` command.

use clap::{Args, Subcommand};
use dockerless_core::error::DockerlessError;

use super::Context;
use crate::output::{new_table, short_digest};

#[derive(Args)]
pub struct StateArgs {
    #[command(subcommand)]
    pub command: StateCommand,
}

#[derive(Subcommand)]
pub enum StateCommand {
    /// List recorded resources
    List,
    /// Show one recorded resource as JSON
    Show {
        /// Resource name
        name: String,
    },
}

pub async fn execute(args: StateArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let state = ctx.open_state()?;

    match args.command {
        StateCommand::List => {
            let mut table = new_table(&["NAME", "TARGET", "DIGEST", "UPDATED"]);
            for (name, record) in state.list() {
                table.add_row(vec![
                    name.clone(),
                    record.model.target.clone().unwrap_or_else(|| "-".to_string()),
                    record
                        .model
                        .digest
                        .as_deref()
                        .map(short_digest)
                        .unwrap_or("-")
                        .to_string(),
                    record.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                ]);
            }
            println!("{table}");
        }
        StateCommand::Show { name } => {
            let record = state.get(&name).ok_or_else(|| {
                DockerlessError::StateError(format!("resource '{}' not found in state", name))
            })?;
            println!("{}", serde_json::to_string_pretty(record)?);
        }
    }
    Ok(())
}

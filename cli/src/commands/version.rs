//! `dockerless version` command.

use clap::Args;

#[derive(Args)]
pub struct VersionArgs;

pub async fn execute(_args: VersionArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("dockerless version {}", dockerless_runtime::VERSION);
    Ok(())
}

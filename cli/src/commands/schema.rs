//! `dockerless schema` command.

use clap::Args;
use dockerless_runtime::{DockerlessProvider, RemoteImageResource, RESOURCE_TYPE_NAME};

#[derive(Args)]
pub struct SchemaArgs;

pub async fn execute(_args: SchemaArgs) -> Result<(), Box<dyn std::error::Error>> {
    let provider = DockerlessProvider::new(dockerless_runtime::VERSION);

    let output = serde_json::json!({
        "provider": {
            "metadata": provider.metadata(),
            "schema": provider.schema(),
        },
        "resource_schemas": {
            RESOURCE_TYPE_NAME: RemoteImageResource::schema(),
        },
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

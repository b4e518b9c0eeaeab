//! `dockerless destroy` command.

use clap::Args;
use dockerless_runtime::RemoteImageResource;

use super::Context;
use crate::state::StateFile;

#[derive(Args)]
pub struct DestroyArgs {}

pub async fn execute(_args: DestroyArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let provider = super::configure(&ctx.provider_config()?)?;
    let mut state = ctx.open_state()?;

    if state.is_empty() {
        println!("No resources in state.");
        return Ok(());
    }

    let destroyed = destroy_all(&provider.remote_image(), &mut state).await?;
    println!("Destroy complete! Resources: {} destroyed.", destroyed);
    Ok(())
}

/// Delete every recorded image in name order, dropping each from state as
/// it goes. Stops at the first failure.
pub(crate) async fn destroy_all(
    resource: &RemoteImageResource,
    state: &mut StateFile,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut destroyed = 0;
    for (name, model) in state.models() {
        println!("{}: Destroying...", name);
        resource.delete(&model).await.map_err(|d| {
            tracing::error!(resource = %name, "Destroy failed");
            d
        })?;
        state.remove(&name)?;
        destroyed += 1;
    }
    Ok(destroyed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::MemoryRegistry;
    use dockerless_runtime::RemoteImageModel;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn model(target: &str) -> RemoteImageModel {
        RemoteImageModel {
            source: Some("app:v1".to_string()),
            target: Some(target.to_string()),
            digest: Some("sha256:v1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_destroy_all() {
        let registry = Arc::new(MemoryRegistry::default());
        registry.insert("ghcr.io/o/a:v1", "sha256:v1");
        registry.insert("ghcr.io/o/b:v1", "sha256:v1");
        let resource = RemoteImageResource::new(registry.clone());

        let tmp = TempDir::new().unwrap();
        let mut state = StateFile::load(&tmp.path().join("s.json")).unwrap();
        state.upsert("a", model("ghcr.io/o/a:v1")).unwrap();
        state.upsert("b", model("ghcr.io/o/b:v1")).unwrap();

        assert_eq!(destroy_all(&resource, &mut state).await.unwrap(), 2);
        assert!(state.is_empty());
        assert!(registry.digest_of("ghcr.io/o/a:v1").is_none());
    }

    #[tokio::test]
    async fn test_destroy_keeps_failed_record() {
        let registry = Arc::new(MemoryRegistry::default());
        registry.insert("ghcr.io/o/a:v1", "sha256:v1");
        registry.insert("ghcr.io/o/b:v1", "sha256:v1");
        registry.fail_on("ghcr.io/o/b:v1");
        let resource = RemoteImageResource::new(registry);

        let tmp = TempDir::new().unwrap();
        let mut state = StateFile::load(&tmp.path().join("s.json")).unwrap();
        state.upsert("a", model("ghcr.io/o/a:v1")).unwrap();
        state.upsert("b", model("ghcr.io/o/b:v1")).unwrap();

        assert!(destroy_all(&resource, &mut state).await.is_err());
        assert!(state.get("a").is_none());
        assert!(state.get("b").is_some());
    }
}

//! dockerless runtime: registry client, image forwarding and the
//! `dockerless` provider with its `dockerless_remote_image` resource.

pub mod forward;
pub mod oci;
pub mod provider;

pub use forward::forward_image;
pub use oci::{ForwardResult, ImageDescriptor, ImageReference, ImageRegistry, RegistryClient};
pub use provider::remote_image::{RemoteImageResource, RESOURCE_TYPE_NAME};
pub use provider::{
    ConfiguredProvider, DockerlessProvider, ProviderMetadata, RemoteImageModel, PROVIDER_TYPE_NAME,
};

/// dockerless runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

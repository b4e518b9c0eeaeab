//! OCI registry support for dockerless.
//!
//! - Reference parsing and registry credential lookup
//! - A registry client built on `oci-distribution`
//! - The on-disk OCI layout and the gzip tarball an image passes through
//!   while being forwarded
//!
//! # Architecture
//!
//! ```text
//! source registry ──pull──▶ layout/ ──pack──▶ image.tgz
//!                                                │
//! target registry ◀──push── layout/ ◀──unpack────┘
//! ```

pub mod archive;
pub mod auth;
pub mod challenge;
pub mod layout;
#[cfg(test)]
pub(crate) mod mock_registry;
pub mod reference;
pub mod registry;

pub use auth::{RegistryAuth, RegistryAuthMap};
pub use layout::{ImageLayout, LoadedImage};
pub use reference::ImageReference;
pub use registry::{ForwardResult, ImageDescriptor, ImageRegistry, RegistryClient, ResolvedReference};

//! Spec resolution: caches, registry, mounts, credentials, context

pub mod cache;
pub mod context;
pub mod helpers;
pub mod keychain;
pub mod mount;
pub mod registry;

pub use cache::ObjectsCache;
pub use context::ResolverContext;
pub use keychain::{Credential, KeyChain};
pub use mount::MountTable;
pub use registry::{HelperRegistry, ResolverHelper};

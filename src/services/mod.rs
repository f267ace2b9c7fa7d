//! Service layer
//!
//! - [`avatar_cache`]: the shared in-memory cache
//! - [`resolver`]: the cache → directory → remote → default pipeline
//! - [`remote_fallback`]: the remote avatar service client

pub mod avatar_cache;
pub mod remote_fallback;
pub mod resolver;

pub use avatar_cache::{AvatarCache, CacheEntry};
pub use remote_fallback::{GravatarClient, RemoteAvatarSource};
pub use resolver::{AvatarResolver, Resolution, ResolutionOutcome};

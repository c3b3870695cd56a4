//! # Rolegate Auth
//!
//! Role-based access control on top of an existing authentication layer.
//!
//! ## Features
//!
//! - **Role resolution** through ordered hooks, first answer wins
//! - **Per-identity caching** so hooks run once per identity until logout
//! - **Guest fallback** for identities no hook resolves
//! - **Named ACL containers** created lazily and shared per unit of work
//! - **Broadcast** of declared operations to every container, in order
//! - **Persistence** of containers through pluggable memory providers
//!
//! ## Example
//!
//! ```rust
//! use rolegate_auth::{
//!     AclEnvironment, AclOperation, Identity, MemoryProvider, RoleResolver, RoleSet,
//!     RuntimeMemory, SessionAuthenticator,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = Arc::new(SessionAuthenticator::with_identity(Identity::new(1)));
//!     let resolver = Arc::new(RoleResolver::new(auth));
//!     resolver.register_hook(|identity: Option<&Identity>, _: &RoleSet| {
//!         identity.map(|_| RoleSet::single("Admin"))
//!     });
//!
//!     let memory: Arc<dyn MemoryProvider> = Arc::new(RuntimeMemory::new());
//!     let env: AclEnvironment = AclEnvironment::new(resolver.clone());
//!
//!     let acl = env.make("site", Some(memory.clone()))?;
//!     acl.add_role("admin")?;
//!     acl.add_action("manage")?;
//!     acl.allow("admin", "manage")?;
//!
//!     assert!(resolver.is("Admin"));
//!     assert!(acl.can("manage")?);
//!
//!     let answers = env.broadcast(&AclOperation::Can("manage".into()));
//!     assert_eq!(answers.len(), 1);
//!
//!     // Persist everything and start the next unit of work empty
//!     env.finish()?;
//!     assert!(env.is_empty());
//!
//!     Ok(())
//! }
//! ```

pub mod acl;
pub mod config;
pub mod environment;
pub mod error;
pub mod identity;
pub mod memory;
pub mod resolver;
pub mod types;

// Re-export commonly used types
pub use acl::{AclDriver, AclOperation, Container, OperationOutput};
pub use config::AuthConfig;
pub use environment::AclEnvironment;
pub use error::{AuthError, Result};
pub use identity::{Authenticator, SessionAuthenticator};
pub use memory::{JsonFileMemory, MemoryProvider, RuntimeMemory};
pub use resolver::{CacheStats, RoleHook, RoleResolver};
pub use types::{Identity, IdentityId, Names, RoleSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! ACL containers
//!
//! A container is a named permission scope: a set of roles, a set of actions
//! and an allow/deny matrix between them. Containers consult the shared
//! [`RoleResolver`] to authorize the current identity and persist themselves
//! through an optional [`MemoryProvider`].
//!
//! # Example
//!
//! ```rust
//! use rolegate_auth::acl::{AclDriver, Container};
//! use rolegate_auth::{RoleResolver, SessionAuthenticator};
//! use std::sync::Arc;
//!
//! # fn example() -> rolegate_auth::Result<()> {
//! let resolver = Arc::new(RoleResolver::new(Arc::new(SessionAuthenticator::new())));
//! let acl = Container::create(resolver, "site", None)?;
//!
//! acl.add_role("admin")?;
//! acl.add_actions(["view page", "manage"])?;
//! acl.allow(["guest", "admin"], "view page")?;
//! acl.allow("admin", "manage")?;
//!
//! // Guests resolve to the "Guest" role, which matches "guest"
//! assert!(acl.can("view page")?);
//! assert!(!acl.can("manage")?);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod container;
mod operation;

pub use container::{AclEntry, AclSnapshot, Container};
pub use operation::{AclOperation, OperationOutput};

use crate::error::Result;
use crate::memory::MemoryProvider;
use crate::resolver::RoleResolver;
use std::sync::Arc;

/// Capability every driver managed by an [`AclEnvironment`](crate::AclEnvironment) provides
pub trait AclDriver: Send + Sync + 'static {
    /// Construct a driver bound to the resolver, its name and an optional provider
    fn create(
        resolver: Arc<RoleResolver>,
        name: &str,
        memory: Option<Arc<dyn MemoryProvider>>,
    ) -> Result<Self>
    where
        Self: Sized;

    /// Registry name of this driver
    fn name(&self) -> &str;

    /// Execute a declared operation
    fn apply(&self, operation: &AclOperation) -> Result<OperationOutput>;

    /// Flush state to the attached memory provider
    fn sync(&self) -> Result<()>;
}

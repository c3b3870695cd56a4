//! Role resolver with per-identity caching
//!
//! The `RoleResolver` turns "who is logged in" into "which roles does that
//! identity hold". Resolution is delegated to an ordered list of hooks; the
//! first hook that answers wins. Each identity is resolved once and cached
//! until logout, so callers may ask for roles as often as they like without
//! repeating expensive lookups.
//!
//! # Example
//!
//! ```rust
//! use rolegate_auth::{Identity, RoleResolver, RoleSet, SessionAuthenticator};
//! use std::sync::Arc;
//!
//! let auth = Arc::new(SessionAuthenticator::with_identity(Identity::new(1)));
//! let resolver = RoleResolver::new(auth);
//!
//! resolver.register_hook(|identity: Option<&Identity>, _roles: &RoleSet| {
//!     identity.map(|_| RoleSet::from_iter(["Editor", "Author"]))
//! });
//!
//! assert!(resolver.is("Editor"));
//! assert!(resolver.is(["Editor", "Author"]));
//! assert!(!resolver.is(["Editor", "Admin"]));
//! ```

use crate::config::{AuthConfig, DEFAULT_GUEST_ROLE};
use crate::error::Result;
use crate::identity::Authenticator;
use crate::types::{Identity, IdentityId, Names, RoleSet};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Resolves the roles of an identity
///
/// Hooks receive the identity (`None` for guests) and an empty role set, and
/// return `None` to defer to the next hook.
pub trait RoleHook: Send + Sync {
    fn resolve(&self, identity: Option<&Identity>, roles: &RoleSet) -> Option<RoleSet>;
}

impl<F> RoleHook for F
where
    F: Fn(Option<&Identity>, &RoleSet) -> Option<RoleSet> + Send + Sync,
{
    fn resolve(&self, identity: Option<&Identity>, roles: &RoleSet) -> Option<RoleSet> {
        self(identity, roles)
    }
}

/// Role resolver wrapping an authentication layer
///
/// # Thread Safety
///
/// The resolver can be shared across threads using `Arc`. The cache is a
/// `DashMap` of per-identity cells; the first caller for an identity runs the
/// hooks while concurrent callers for that identity wait on its cell, so the
/// hooks run once per identity even under contention. No map shard is locked
/// while hooks run.
pub struct RoleResolver {
    /// Identity mechanism being wrapped
    auth: Arc<dyn Authenticator>,

    /// Resolution hooks, in registration order
    hooks: RwLock<Vec<Arc<dyn RoleHook>>>,

    /// Resolved roles keyed by identity; an empty cell means "being resolved"
    cache: DashMap<IdentityId, Arc<OnceLock<RoleSet>>>,

    /// Number of resolution rounds run since construction
    resolutions: AtomicU64,

    /// Role assigned when no hook answers
    guest_role: String,
}

impl RoleResolver {
    /// Create a resolver with the default guest role
    pub fn new(auth: Arc<dyn Authenticator>) -> Self {
        Self {
            auth,
            hooks: RwLock::new(Vec::new()),
            cache: DashMap::new(),
            resolutions: AtomicU64::new(0),
            guest_role: DEFAULT_GUEST_ROLE.to_string(),
        }
    }

    /// Create a resolver using the configured guest role
    ///
    /// Fails with [`AuthError::Config`](crate::AuthError::Config) when the
    /// configured guest role is blank.
    pub fn with_config(auth: Arc<dyn Authenticator>, config: &AuthConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            guest_role: config.guest_role.clone(),
            ..Self::new(auth)
        })
    }

    /// Append a resolution hook
    ///
    /// Hooks registered later only run when every earlier hook returned `None`.
    pub fn register_hook(&self, hook: impl RoleHook + 'static) {
        self.hooks.write().push(Arc::new(hook));
    }

    /// The identity currently reported by the authentication layer
    pub fn user(&self) -> Option<Identity> {
        self.auth.user()
    }

    /// Roles held by the current identity
    ///
    /// Guests resolve under [`IdentityId::GUEST`]. The hooks run at most once
    /// per identity until [`logout`](Self::logout); when none of them answers
    /// the identity gets the guest role.
    pub fn roles(&self) -> RoleSet {
        let user = self.auth.user();
        let id = user
            .as_ref()
            .map(|u| u.id.clone())
            .unwrap_or_else(IdentityId::guest);

        // Clone the cell out so the shard guard is gone before any hook runs
        let cell = self.cache.entry(id.clone()).or_default().value().clone();

        if let Some(roles) = cell.get() {
            debug!(identity = %id, "Role cache hit");
            return roles.clone();
        }

        cell.get_or_init(|| match self.dispatch(user.as_ref()) {
            Some(roles) => roles,
            None => {
                debug!(identity = %id, role = %self.guest_role, "No hook resolved roles, using guest role");
                RoleSet::single(self.guest_role.clone())
            }
        })
        .clone()
    }

    /// Whether the current identity holds every given role
    ///
    /// Accepts a single role name or a sequence. An empty sequence is
    /// trivially satisfied.
    pub fn is(&self, roles: impl Into<Names>) -> bool {
        let wanted: Names = roles.into();
        self.roles().contains_all(wanted.iter())
    }

    /// Log out through the authentication layer and forget every cached role set
    pub fn logout(&self) {
        self.auth.logout();
        self.invalidate_cache();
    }

    /// Drop every cached role set
    pub fn invalidate_cache(&self) {
        self.cache.clear();
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            cached_identities: self
                .cache
                .iter()
                .filter(|entry| entry.value().get().is_some())
                .count(),
            resolutions: self.resolutions.load(Ordering::Relaxed),
        }
    }

    /// The configured guest role
    pub fn guest_role(&self) -> &str {
        &self.guest_role
    }

    /// Run the hooks in order until one answers
    fn dispatch(&self, identity: Option<&Identity>) -> Option<RoleSet> {
        let hooks: Vec<Arc<dyn RoleHook>> = self.hooks.read().clone();
        self.resolutions.fetch_add(1, Ordering::Relaxed);

        let empty = RoleSet::new();
        let resolved = hooks.iter().find_map(|hook| hook.resolve(identity, &empty));

        debug!(
            hooks = hooks.len(),
            resolved = resolved.is_some(),
            "Role resolution completed"
        );
        resolved
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Identities with a cached role set
    pub cached_identities: usize,
    /// Resolution rounds run since construction
    pub resolutions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SessionAuthenticator;
    use std::sync::atomic::AtomicUsize;

    fn resolver_for(identity: Option<Identity>) -> (Arc<SessionAuthenticator>, RoleResolver) {
        let auth = Arc::new(match identity {
            Some(identity) => SessionAuthenticator::with_identity(identity),
            None => SessionAuthenticator::new(),
        });
        let resolver = RoleResolver::new(auth.clone());
        (auth, resolver)
    }

    #[test]
    fn test_resolver_creation() {
        let (_, resolver) = resolver_for(None);
        assert_eq!(resolver.cache_stats().cached_identities, 0);
        assert_eq!(resolver.cache_stats().resolutions, 0);
        assert_eq!(resolver.guest_role(), "Guest");
    }

    #[test]
    fn test_guest_without_hooks() {
        let (_, resolver) = resolver_for(None);
        assert_eq!(resolver.roles().into_vec(), vec!["Guest"]);
        assert!(resolver.is("Guest"));
    }

    #[test]
    fn test_hook_receives_identity_and_empty_roles() {
        let (_, resolver) = resolver_for(Some(Identity::new("alice")));
        resolver.register_hook(|identity: Option<&Identity>, roles: &RoleSet| {
            assert!(roles.is_empty());
            let id = identity?.id.as_str().to_string();
            Some(RoleSet::single(format!("owner:{id}")))
        });

        assert!(resolver.is("owner:alice"));
    }

    #[test]
    fn test_caching() {
        let (_, resolver) = resolver_for(Some(Identity::new(5)));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        resolver.register_hook(move |_: Option<&Identity>, _: &RoleSet| {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(RoleSet::single("Member"))
        });

        let first = resolver.roles();
        let second = resolver.roles();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cache_stats().cached_identities, 1);
        assert_eq!(resolver.cache_stats().resolutions, 1);
    }

    #[test]
    fn test_fallback_is_cached_too() {
        let (_, resolver) = resolver_for(Some(Identity::new(9)));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        resolver.register_hook(move |_: Option<&Identity>, _: &RoleSet| {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });

        assert_eq!(resolver.roles().into_vec(), vec!["Guest"]);
        assert_eq!(resolver.roles().into_vec(), vec!["Guest"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_invalidation() {
        let (auth, resolver) = resolver_for(Some(Identity::new(3)));
        resolver.register_hook(|identity: Option<&Identity>, _: &RoleSet| {
            identity.map(|_| RoleSet::single("Member"))
        });

        assert!(resolver.is("Member"));
        resolver.invalidate_cache();
        assert_eq!(resolver.cache_stats().cached_identities, 0);

        resolver.logout();
        assert!(!auth.check());
        assert!(resolver.is("Guest"));
        assert!(!resolver.is("Member"));
    }

    #[test]
    fn test_custom_guest_role() {
        let config = AuthConfig {
            guest_role: "Anonymous".to_string(),
            ..Default::default()
        };
        let resolver =
            RoleResolver::with_config(Arc::new(SessionAuthenticator::new()), &config).unwrap();

        assert_eq!(resolver.roles().into_vec(), vec!["Anonymous"]);
        assert!(!resolver.is("Guest"));
    }

    #[test]
    fn test_blank_guest_role_rejected() {
        let config = AuthConfig {
            guest_role: "  ".to_string(),
            ..Default::default()
        };
        let result = RoleResolver::with_config(Arc::new(SessionAuthenticator::new()), &config);

        assert!(matches!(result, Err(crate::AuthError::Config(_))));
    }
}

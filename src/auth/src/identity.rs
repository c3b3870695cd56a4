//! Identity mechanism consumed by the role resolver
//!
//! Authentication (credential checks, session persistence) lives outside this
//! crate. The resolver only needs to know who is currently logged in and how to
//! log them out, which is what [`Authenticator`] captures.

use crate::types::Identity;
use parking_lot::RwLock;
use tracing::debug;

/// The authentication layer the resolver sits on top of
pub trait Authenticator: Send + Sync {
    /// The currently authenticated identity, `None` for guests
    fn user(&self) -> Option<Identity>;

    /// Log the current identity out
    fn logout(&self);

    /// Whether an identity is currently authenticated
    fn check(&self) -> bool {
        self.user().is_some()
    }
}

/// In-process authenticator holding the current identity
///
/// Suitable for embedding where the surrounding application has already
/// verified credentials and only needs to publish the result.
#[derive(Debug, Default)]
pub struct SessionAuthenticator {
    current: RwLock<Option<Identity>>,
}

impl SessionAuthenticator {
    /// Create an authenticator with no logged-in identity
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an authenticator with `identity` already logged in
    pub fn with_identity(identity: Identity) -> Self {
        Self {
            current: RwLock::new(Some(identity)),
        }
    }

    /// Publish `identity` as the current identity
    pub fn login(&self, identity: Identity) {
        debug!(identity = %identity.id, "Identity logged in");
        *self.current.write() = Some(identity);
    }
}

impl Authenticator for SessionAuthenticator {
    fn user(&self) -> Option<Identity> {
        self.current.read().clone()
    }

    fn logout(&self) {
        if let Some(identity) = self.current.write().take() {
            debug!(identity = %identity.id, "Identity logged out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_logout() {
        let auth = SessionAuthenticator::new();
        assert!(!auth.check());

        auth.login(Identity::new(7).with_name("alice"));
        assert_eq!(auth.user().map(|u| u.id), Some(7.into()));

        auth.logout();
        assert!(auth.user().is_none());

        // Logging out twice is harmless
        auth.logout();
        assert!(!auth.check());
    }
}

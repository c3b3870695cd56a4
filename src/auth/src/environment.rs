//! Registry of named ACL drivers
//!
//! The `AclEnvironment` owns every ACL driver of one unit of work (a request,
//! a job, a process). Drivers are created lazily on first reference to their
//! name, share the environment's [`RoleResolver`], and are flushed to their
//! memory providers and dropped by [`finish`](AclEnvironment::finish). A driver
//! whose flush fails stays registered so the caller can retry.
//!
//! # Architecture
//!
//! ```text
//! make/register ──► [name → driver registry] ──► broadcast ──► Vec<result>
//!                          │                         (insertion order)
//!                          ▼
//!                       finish ──► driver.sync() … ──► synced drivers removed
//! ```

use crate::acl::{AclDriver, AclOperation, Container, OperationOutput};
use crate::config::{AuthConfig, DEFAULT_DRIVER};
use crate::error::{AuthError, Result};
use crate::memory::MemoryProvider;
use crate::resolver::RoleResolver;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Named ACL drivers sharing one role resolver
///
/// # Thread Safety
///
/// The registry sits behind a `RwLock`. Driver construction in
/// [`make`](Self::make) runs under the write lock, so a name is built at most
/// once. Setup callbacks, broadcasts and syncs run on a snapshot with the
/// lock released.
pub struct AclEnvironment<D: AclDriver = Container> {
    /// Resolver bound into every driver
    resolver: Arc<RoleResolver>,

    /// Drivers in insertion order
    drivers: RwLock<IndexMap<String, Arc<D>>>,

    /// Name used when callers do not give one
    default_name: String,
}

impl<D: AclDriver> AclEnvironment<D> {
    /// Create an empty environment
    pub fn new(resolver: Arc<RoleResolver>) -> Self {
        Self {
            resolver,
            drivers: RwLock::new(IndexMap::new()),
            default_name: DEFAULT_DRIVER.to_string(),
        }
    }

    /// Create an empty environment using the configured default driver name
    pub fn with_config(resolver: Arc<RoleResolver>, config: &AuthConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            default_name: config.default_driver.clone(),
            ..Self::new(resolver)
        })
    }

    /// The resolver shared by every driver
    pub fn resolver(&self) -> &Arc<RoleResolver> {
        &self.resolver
    }

    /// Get the driver registered under `name`, creating it if needed
    ///
    /// `None` selects the default name. A driver is constructed at most once
    /// per name; later calls return the same instance and ignore `memory`.
    ///
    /// Construction runs under the registry write lock, including the
    /// driver's initial read from `memory`. A slow provider therefore blocks
    /// [`get`](Self::get), [`all`](Self::all) and every other registry access
    /// until the new driver is in place.
    pub fn make<'a>(
        &self,
        name: impl Into<Option<&'a str>>,
        memory: Option<Arc<dyn MemoryProvider>>,
    ) -> Result<Arc<D>> {
        let name = name.into().unwrap_or(&self.default_name);

        if let Some(driver) = self.drivers.read().get(name) {
            if memory.is_some() {
                debug!(name = %name, "Driver already registered, ignoring memory provider");
            }
            return Ok(driver.clone());
        }

        let mut drivers = self.drivers.write();
        if let Some(driver) = drivers.get(name) {
            return Ok(driver.clone());
        }

        let driver = Arc::new(D::create(self.resolver.clone(), name, memory)?);
        drivers.insert(name.to_string(), driver.clone());
        debug!(name = %name, total = drivers.len(), "Registered ACL driver");

        Ok(driver)
    }

    /// Get or create the driver under `name` and hand it to `setup`
    ///
    /// `setup` runs exactly once per call, before this returns. Its error is
    /// returned unchanged; the driver stays registered either way.
    pub fn register<'a, F, E>(
        &self,
        name: impl Into<Option<&'a str>>,
        setup: F,
    ) -> std::result::Result<Arc<D>, E>
    where
        F: FnOnce(&D) -> std::result::Result<(), E>,
        E: From<AuthError>,
    {
        let driver = self.make(name, None)?;
        setup(driver.as_ref())?;
        Ok(driver)
    }

    /// [`register`](Self::register) under the default name
    pub fn register_default<F, E>(&self, setup: F) -> std::result::Result<Arc<D>, E>
    where
        F: FnOnce(&D) -> std::result::Result<(), E>,
        E: From<AuthError>,
    {
        self.register(None, setup)
    }

    /// Apply `operation` to every driver, in registration order
    ///
    /// One result per driver; a failure in one driver does not stop the rest.
    pub fn broadcast(&self, operation: &AclOperation) -> Vec<Result<OperationOutput>> {
        debug!(operation = %operation, drivers = self.len(), "Broadcasting ACL operation");
        self.broadcast_with(|driver| driver.apply(operation))
    }

    /// Parse and broadcast a named operation
    ///
    /// Fails up front with [`AuthError::UnknownOperation`] when the name is not
    /// part of the declared operation set.
    pub fn broadcast_named(
        &self,
        name: &str,
        args: &[&str],
    ) -> Result<Vec<Result<OperationOutput>>> {
        let operation = AclOperation::parse(name, args)?;
        Ok(self.broadcast(&operation))
    }

    /// Run `f` against every driver, in registration order, collecting results
    pub fn broadcast_with<R, F>(&self, mut f: F) -> Vec<R>
    where
        F: FnMut(&D) -> R,
    {
        self.snapshot().iter().map(|driver| f(driver.as_ref())).collect()
    }

    /// Sync every driver, then drop the ones that synced
    ///
    /// Every driver is synced in registration order even if an earlier one
    /// fails. Drivers that synced are removed; drivers whose sync failed stay
    /// registered with their state intact, so a later `finish` retries them.
    /// The first sync error is returned.
    pub fn finish(&self) -> Result<&Self> {
        let drivers = self.all();

        let mut synced = Vec::with_capacity(drivers.len());
        let mut first_error = None;
        for (name, driver) in drivers {
            match driver.sync() {
                Ok(()) => synced.push((name, driver)),
                Err(e) => {
                    warn!(name = %name, error = %e, "Failed to sync ACL driver, keeping it registered");
                    first_error.get_or_insert(e);
                }
            }
        }

        let remaining = {
            let mut registry = self.drivers.write();
            for (name, driver) in &synced {
                // Leave alone a name that was replaced while syncing
                if registry.get(name).is_some_and(|current| Arc::ptr_eq(current, driver)) {
                    registry.shift_remove(name);
                }
            }
            registry.len()
        };

        info!(
            synced = synced.len(),
            remaining,
            failed = first_error.is_some(),
            "ACL environment finished"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }

    /// Every registered driver with its name, in registration order
    pub fn all(&self) -> Vec<(String, Arc<D>)> {
        self.drivers
            .read()
            .iter()
            .map(|(name, driver)| (name.clone(), driver.clone()))
            .collect()
    }

    /// The driver registered under exactly `name`, never creating one
    pub fn get(&self, name: &str) -> Option<Arc<D>> {
        self.drivers.read().get(name).cloned()
    }

    /// Registered names, in registration order
    pub fn names(&self) -> Vec<String> {
        self.drivers.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.drivers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<D>> {
        self.drivers.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SessionAuthenticator;
    use crate::memory::RuntimeMemory;

    fn environment() -> AclEnvironment {
        let resolver = Arc::new(RoleResolver::new(Arc::new(SessionAuthenticator::new())));
        AclEnvironment::new(resolver)
    }

    #[test]
    fn test_make_defaults_name() {
        let env = environment();
        let acl = env.make(None, None).unwrap();
        assert_eq!(acl.name(), "default");
        assert_eq!(env.names(), vec!["default"]);
    }

    #[test]
    fn test_make_is_idempotent() {
        let env = environment();
        let first = env.make("reports", None).unwrap();
        let second = env.make("reports", None).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_make_ignores_memory_for_existing_name() {
        let env = environment();
        let acl = env.make("reports", None).unwrap();

        let memory: Arc<dyn MemoryProvider> = Arc::new(RuntimeMemory::new());
        let again = env.make("reports", Some(memory)).unwrap();

        assert!(Arc::ptr_eq(&acl, &again));
        assert!(!again.has_memory());
    }

    #[test]
    fn test_configured_default_name() {
        let resolver = Arc::new(RoleResolver::new(Arc::new(SessionAuthenticator::new())));
        let config = AuthConfig {
            default_driver: "site".to_string(),
            ..Default::default()
        };
        let env: AclEnvironment = AclEnvironment::with_config(resolver, &config).unwrap();

        env.make(None, None).unwrap();
        assert!(env.get("site").is_some());
        assert!(env.get("default").is_none());
    }

    #[test]
    fn test_blank_default_name_rejected() {
        let resolver = Arc::new(RoleResolver::new(Arc::new(SessionAuthenticator::new())));
        let config = AuthConfig {
            default_driver: String::new(),
            ..Default::default()
        };

        let result = AclEnvironment::<Container>::with_config(resolver, &config);
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_register_runs_setup_once() {
        let env = environment();
        let mut calls = 0;

        let acl = env
            .register("admin", |acl: &Container| {
                calls += 1;
                acl.add_action("manage")?;
                Ok::<(), AuthError>(())
            })
            .unwrap();

        assert_eq!(calls, 1);
        assert!(acl.has_action("manage"));
        assert!(Arc::ptr_eq(&acl, &env.get("admin").unwrap()));
    }

    #[test]
    fn test_register_default() {
        let env = environment();
        let acl = env
            .register_default(|acl: &Container| acl.add_role("admin").map(|_| ()))
            .unwrap();

        assert_eq!(acl.name(), "default");
        assert!(acl.has_role("admin"));
    }

    #[test]
    fn test_get_does_not_create() {
        let env = environment();
        assert!(env.get("missing").is_none());
        assert!(env.is_empty());
    }

    #[test]
    fn test_finish_on_empty_environment() {
        let env = environment();
        assert!(env.finish().is_ok());
        assert!(env.finish().unwrap().is_empty());
    }
}

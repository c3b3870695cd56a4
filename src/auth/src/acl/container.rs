//! Role × action permission container

use super::{AclDriver, AclOperation, OperationOutput};
use crate::error::{AuthError, Result};
use crate::memory::MemoryProvider;
use crate::resolver::RoleResolver;
use crate::types::Names;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Prefix of the memory key a container persists under
const SNAPSHOT_PREFIX: &str = "acl_";

/// Role every container starts with
const GUEST_ROLE: &str = "guest";

/// Persisted form of a container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclSnapshot {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub acl: Vec<AclEntry>,
}

/// One cell of the permission matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub role: String,
    pub action: String,
    pub allow: bool,
}

#[derive(Debug, Default)]
struct AclState {
    roles: Vec<String>,
    actions: Vec<String>,
    /// (role, action) -> allowed
    acl: BTreeMap<(String, String), bool>,
}

impl AclState {
    fn with_guest() -> Self {
        Self {
            roles: vec![GUEST_ROLE.to_string()],
            ..Default::default()
        }
    }

    fn merge(&mut self, snapshot: AclSnapshot, container: &str) {
        for role in snapshot.roles.iter().filter_map(|r| normalize(r)) {
            if !self.roles.contains(&role) {
                self.roles.push(role);
            }
        }
        for action in snapshot.actions.iter().filter_map(|a| normalize(a)) {
            if !self.actions.contains(&action) {
                self.actions.push(action);
            }
        }
        for entry in snapshot.acl {
            let (Some(role), Some(action)) = (normalize(&entry.role), normalize(&entry.action))
            else {
                continue;
            };
            if !self.roles.contains(&role) || !self.actions.contains(&action) {
                warn!(
                    container = %container,
                    role = %role,
                    action = %action,
                    "Skipping persisted ACL entry for unknown role or action"
                );
                continue;
            }
            self.acl.insert((role, action), entry.allow);
        }
    }

    fn snapshot(&self) -> AclSnapshot {
        AclSnapshot {
            roles: self.roles.clone(),
            actions: self.actions.clone(),
            acl: self
                .acl
                .iter()
                .map(|((role, action), allow)| AclEntry {
                    role: role.clone(),
                    action: action.clone(),
                    allow: *allow,
                })
                .collect(),
        }
    }
}

/// Canonical form of a role or action name, `None` when blank
///
/// Trimmed, lowercased, inner whitespace collapsed to `-`.
fn normalize(name: &str) -> Option<String> {
    let slug = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    (!slug.is_empty()).then_some(slug)
}

fn require(name: &str) -> Result<String> {
    normalize(name).ok_or_else(|| AuthError::InvalidArgument(format!("blank name: {:?}", name)))
}

/// Named permission scope
///
/// All methods take `&self`; state sits behind a `RwLock` so a container can
/// be shared as `Arc<Container>` by the environment and its callers.
pub struct Container {
    name: String,
    resolver: Arc<RoleResolver>,
    memory: RwLock<Option<Arc<dyn MemoryProvider>>>,
    state: RwLock<AclState>,
}

impl Container {
    /// Create a container, attaching and loading from `memory` if given
    pub fn new(
        resolver: Arc<RoleResolver>,
        name: impl Into<String>,
        memory: Option<Arc<dyn MemoryProvider>>,
    ) -> Result<Self> {
        let container = Self {
            name: name.into(),
            resolver,
            memory: RwLock::new(None),
            state: RwLock::new(AclState::with_guest()),
        };

        if let Some(memory) = memory {
            container.attach(memory)?;
        }

        Ok(container)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Memory key this container persists under
    pub fn snapshot_key(&self) -> String {
        format!("{}{}", SNAPSHOT_PREFIX, self.name)
    }

    /// Bind a memory provider and merge its persisted snapshot
    ///
    /// Attaching the provider that is already attached is a no-op; attaching a
    /// different one is an error.
    pub fn attach(&self, memory: Arc<dyn MemoryProvider>) -> Result<()> {
        let mut slot = self.memory.write();

        if let Some(existing) = slot.as_ref() {
            if Arc::ptr_eq(existing, &memory) {
                return Ok(());
            }
            return Err(AuthError::ProviderAlreadyAttached(self.name.clone()));
        }

        if let Some(value) = memory.get(&self.snapshot_key())? {
            let snapshot: AclSnapshot = serde_json::from_value(value)?;
            debug!(
                container = %self.name,
                roles = snapshot.roles.len(),
                actions = snapshot.actions.len(),
                "Loaded persisted ACL"
            );
            self.state.write().merge(snapshot, &self.name);
        }

        *slot = Some(memory);
        Ok(())
    }

    /// Whether a memory provider is attached
    pub fn has_memory(&self) -> bool {
        self.memory.read().is_some()
    }

    /// Add a role, returning `false` if it already existed
    pub fn add_role(&self, role: &str) -> Result<bool> {
        let role = require(role)?;
        let mut state = self.state.write();
        if state.roles.contains(&role) {
            return Ok(false);
        }
        state.roles.push(role);
        Ok(true)
    }

    pub fn add_roles<I, S>(&self, roles: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for role in roles {
            self.add_role(role.as_ref())?;
        }
        Ok(())
    }

    /// Remove a role and its permissions, returning whether it existed
    pub fn remove_role(&self, role: &str) -> bool {
        let Some(role) = normalize(role) else {
            return false;
        };
        let mut state = self.state.write();
        let before = state.roles.len();
        state.roles.retain(|r| r != &role);
        state.acl.retain(|(r, _), _| r != &role);
        state.roles.len() < before
    }

    pub fn has_role(&self, role: &str) -> bool {
        normalize(role).is_some_and(|role| self.state.read().roles.contains(&role))
    }

    pub fn roles(&self) -> Vec<String> {
        self.state.read().roles.clone()
    }

    /// Add an action, returning `false` if it already existed
    pub fn add_action(&self, action: &str) -> Result<bool> {
        let action = require(action)?;
        let mut state = self.state.write();
        if state.actions.contains(&action) {
            return Ok(false);
        }
        state.actions.push(action);
        Ok(true)
    }

    pub fn add_actions<I, S>(&self, actions: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for action in actions {
            self.add_action(action.as_ref())?;
        }
        Ok(())
    }

    /// Remove an action and its permissions, returning whether it existed
    pub fn remove_action(&self, action: &str) -> bool {
        let Some(action) = normalize(action) else {
            return false;
        };
        let mut state = self.state.write();
        let before = state.actions.len();
        state.actions.retain(|a| a != &action);
        state.acl.retain(|(_, a), _| a != &action);
        state.actions.len() < before
    }

    pub fn has_action(&self, action: &str) -> bool {
        normalize(action).is_some_and(|action| self.state.read().actions.contains(&action))
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.read().actions.clone()
    }

    /// Set the permission of every role for every action
    ///
    /// All names are validated before anything changes.
    pub fn assign(
        &self,
        roles: impl Into<Names>,
        actions: impl Into<Names>,
        allow: bool,
    ) -> Result<()> {
        let roles: Names = roles.into();
        let actions: Names = actions.into();
        let roles = roles.iter().map(|r| require(r)).collect::<Result<Vec<_>>>()?;
        let actions = actions.iter().map(|a| require(a)).collect::<Result<Vec<_>>>()?;

        let mut state = self.state.write();

        if let Some(role) = roles.iter().find(|r| !state.roles.contains(r)) {
            return Err(AuthError::UnknownRole(role.clone()));
        }
        if let Some(action) = actions.iter().find(|a| !state.actions.contains(a)) {
            return Err(AuthError::UnknownAction(action.clone()));
        }

        for role in &roles {
            for action in &actions {
                state.acl.insert((role.clone(), action.clone()), allow);
            }
        }

        debug!(
            container = %self.name,
            roles = roles.len(),
            actions = actions.len(),
            allow,
            "Updated ACL"
        );
        Ok(())
    }

    pub fn allow(&self, roles: impl Into<Names>, actions: impl Into<Names>) -> Result<()> {
        self.assign(roles, actions, true)
    }

    pub fn deny(&self, roles: impl Into<Names>, actions: impl Into<Names>) -> Result<()> {
        self.assign(roles, actions, false)
    }

    /// Whether any of `roles` may perform `action`
    ///
    /// Unknown roles are ignored; an unknown action is an error.
    pub fn check(&self, roles: impl Into<Names>, action: &str) -> Result<bool> {
        let roles: Names = roles.into();
        let action = require(action)?;
        let state = self.state.read();

        if !state.actions.contains(&action) {
            return Err(AuthError::UnknownAction(action));
        }

        let allowed = roles.iter().filter_map(|r| normalize(r)).any(|role| {
            state
                .acl
                .get(&(role, action.clone()))
                .copied()
                .unwrap_or(false)
        });
        Ok(allowed)
    }

    /// Whether the current identity may perform `action`
    pub fn can(&self, action: &str) -> Result<bool> {
        let roles = self.resolver.roles();
        self.check(&roles, action)
    }

    /// Current state in persisted form
    pub fn snapshot(&self) -> AclSnapshot {
        self.state.read().snapshot()
    }

    /// Write the snapshot to the attached memory provider, if any
    pub fn sync(&self) -> Result<()> {
        let Some(memory) = self.memory.read().clone() else {
            debug!(container = %self.name, "No memory attached, skipping sync");
            return Ok(());
        };

        let value = serde_json::to_value(self.snapshot())?;
        memory.put(&self.snapshot_key(), value)?;
        debug!(container = %self.name, "Synced ACL to memory");
        Ok(())
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_memory = self.has_memory();
        let state = self.state.read();
        f.debug_struct("Container")
            .field("name", &self.name)
            .field("roles", &state.roles)
            .field("actions", &state.actions)
            .field("has_memory", &has_memory)
            .finish()
    }
}

impl AclDriver for Container {
    fn create(
        resolver: Arc<RoleResolver>,
        name: &str,
        memory: Option<Arc<dyn MemoryProvider>>,
    ) -> Result<Self> {
        Container::new(resolver, name, memory)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, operation: &AclOperation) -> Result<OperationOutput> {
        let output = match operation {
            AclOperation::AddRole(role) => OperationOutput::Flag(self.add_role(role)?),
            AclOperation::RemoveRole(role) => OperationOutput::Flag(self.remove_role(role)),
            AclOperation::HasRole(role) => OperationOutput::Flag(self.has_role(role)),
            AclOperation::AddAction(action) => OperationOutput::Flag(self.add_action(action)?),
            AclOperation::RemoveAction(action) => {
                OperationOutput::Flag(self.remove_action(action))
            }
            AclOperation::HasAction(action) => OperationOutput::Flag(self.has_action(action)),
            AclOperation::Allow { roles, actions } => {
                self.allow(roles.clone(), actions.clone())?;
                OperationOutput::Done
            }
            AclOperation::Deny { roles, actions } => {
                self.deny(roles.clone(), actions.clone())?;
                OperationOutput::Done
            }
            AclOperation::Check { roles, action } => {
                OperationOutput::Flag(self.check(roles.clone(), action)?)
            }
            AclOperation::Can(action) => OperationOutput::Flag(self.can(action)?),
            AclOperation::Sync => {
                Container::sync(self)?;
                OperationOutput::Done
            }
        };
        Ok(output)
    }

    fn sync(&self) -> Result<()> {
        Container::sync(self)
    }
}

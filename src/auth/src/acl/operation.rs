//! Declared operations that can be broadcast to every ACL driver

use crate::error::{AuthError, Result};
use std::fmt;

/// An operation understood by every [`AclDriver`](super::AclDriver)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclOperation {
    AddRole(String),
    RemoveRole(String),
    HasRole(String),
    AddAction(String),
    RemoveAction(String),
    HasAction(String),
    /// Grant every listed action to every listed role
    Allow {
        roles: Vec<String>,
        actions: Vec<String>,
    },
    /// Revoke every listed action from every listed role
    Deny {
        roles: Vec<String>,
        actions: Vec<String>,
    },
    /// Whether any of the roles may perform the action
    Check {
        roles: Vec<String>,
        action: String,
    },
    /// Whether the current identity may perform the action
    Can(String),
    /// Flush the driver to its memory provider
    Sync,
}

/// Value produced by applying an [`AclOperation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutput {
    /// The operation changed or persisted state
    Done,
    /// Answer to a query operation, or whether a mutation took effect
    Flag(bool),
}

impl OperationOutput {
    /// The boolean answer, if this output carries one
    pub fn flag(self) -> Option<bool> {
        match self {
            OperationOutput::Flag(value) => Some(value),
            OperationOutput::Done => None,
        }
    }
}

impl AclOperation {
    /// Canonical operation name
    pub fn name(&self) -> &'static str {
        match self {
            AclOperation::AddRole(_) => "add_role",
            AclOperation::RemoveRole(_) => "remove_role",
            AclOperation::HasRole(_) => "has_role",
            AclOperation::AddAction(_) => "add_action",
            AclOperation::RemoveAction(_) => "remove_action",
            AclOperation::HasAction(_) => "has_action",
            AclOperation::Allow { .. } => "allow",
            AclOperation::Deny { .. } => "deny",
            AclOperation::Check { .. } => "check",
            AclOperation::Can(_) => "can",
            AclOperation::Sync => "sync",
        }
    }

    /// Build an operation from its name and string arguments
    ///
    /// Names are matched case-insensitively, with `-` accepted for `_`.
    /// List arguments (the roles and actions of `allow`, `deny` and `check`)
    /// are comma separated.
    ///
    /// ```rust
    /// use rolegate_auth::acl::AclOperation;
    ///
    /// let op = AclOperation::parse("allow", &["admin, editor", "manage"]).unwrap();
    /// assert_eq!(
    ///     op,
    ///     AclOperation::Allow {
    ///         roles: vec!["admin".into(), "editor".into()],
    ///         actions: vec!["manage".into()],
    ///     }
    /// );
    /// ```
    pub fn parse(name: &str, args: &[&str]) -> Result<Self> {
        let canonical = name.trim().to_ascii_lowercase().replace('-', "_");

        let op = match canonical.as_str() {
            "add_role" => AclOperation::AddRole(single(&canonical, args)?),
            "remove_role" => AclOperation::RemoveRole(single(&canonical, args)?),
            "has_role" => AclOperation::HasRole(single(&canonical, args)?),
            "add_action" => AclOperation::AddAction(single(&canonical, args)?),
            "remove_action" => AclOperation::RemoveAction(single(&canonical, args)?),
            "has_action" => AclOperation::HasAction(single(&canonical, args)?),
            "allow" => {
                let [roles, actions] = pair(&canonical, args)?;
                AclOperation::Allow {
                    roles: list(roles),
                    actions: list(actions),
                }
            }
            "deny" => {
                let [roles, actions] = pair(&canonical, args)?;
                AclOperation::Deny {
                    roles: list(roles),
                    actions: list(actions),
                }
            }
            "check" => {
                let [roles, action] = pair(&canonical, args)?;
                AclOperation::Check {
                    roles: list(roles),
                    action: action.trim().to_string(),
                }
            }
            "can" => AclOperation::Can(single(&canonical, args)?),
            "sync" => {
                expect_arity(&canonical, args, 0)?;
                AclOperation::Sync
            }
            _ => return Err(AuthError::UnknownOperation(name.to_string())),
        };

        Ok(op)
    }
}

impl fmt::Display for AclOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn expect_arity(name: &str, args: &[&str], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(AuthError::InvalidArgument(format!(
            "{} expects {} argument(s), got {}",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn single(name: &str, args: &[&str]) -> Result<String> {
    expect_arity(name, args, 1)?;
    Ok(args[0].trim().to_string())
}

fn pair<'a>(name: &str, args: &[&'a str]) -> Result<[&'a str; 2]> {
    expect_arity(name, args, 2)?;
    Ok([args[0], args[1]])
}

fn list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

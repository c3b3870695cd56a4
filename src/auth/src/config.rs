//! Authorization layer configuration loading

use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Role name used when no hook resolves the current identity
pub const DEFAULT_GUEST_ROLE: &str = "Guest";

/// Driver name used when a caller does not name one
pub const DEFAULT_DRIVER: &str = "default";

/// Settings shared by the role resolver and the ACL environment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Fallback role for identities no hook resolves
    #[serde(default = "default_guest_role")]
    pub guest_role: String,

    /// Name given to containers requested without a name
    #[serde(default = "default_driver")]
    pub default_driver: String,
}

fn default_guest_role() -> String {
    DEFAULT_GUEST_ROLE.to_string()
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            guest_role: default_guest_role(),
            default_driver: default_driver(),
        }
    }
}

impl AuthConfig {
    /// Parse configuration from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| AuthError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            AuthError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// Reject blank names
    ///
    /// Loading runs this already; constructors taking a config run it again
    /// so struct literals are checked too.
    pub fn validate(&self) -> Result<()> {
        if self.guest_role.trim().is_empty() {
            return Err(AuthError::Config("guest_role must not be empty".to_string()));
        }
        if self.default_driver.trim().is_empty() {
            return Err(AuthError::Config("default_driver must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.guest_role, "Guest");
        assert_eq!(config.default_driver, "default");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AuthConfig::from_toml_str(r#"guest_role = "Visitor""#).unwrap();
        assert_eq!(config.guest_role, "Visitor");
        assert_eq!(config.default_driver, "default");
    }

    #[test]
    fn test_empty_values_rejected() {
        let result = AuthConfig::from_toml_str(r#"default_driver = "  ""#);
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = AuthConfig::from_toml_str("guest_role = ");
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "guest_role = \"Anonymous\"").unwrap();
        writeln!(file, "default_driver = \"site\"").unwrap();

        let config = AuthConfig::load(file.path()).unwrap();
        assert_eq!(config.guest_role, "Anonymous");
        assert_eq!(config.default_driver, "site");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AuthConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(AuthError::Config(_))));
    }
}

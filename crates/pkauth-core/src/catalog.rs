//! Action catalog: the externally supplied list of known actions.
//!
//! The catalog is only consulted for listing and describing actions. It never
//! takes part in an authorization decision.
//!
//! # TOML format
//!
//! [`TomlActionCatalog`] reads a flat `[[action]]` array:
//!
//! ```toml
//! [[action]]
//! action_id = "org.freedesktop.hal.storage.mount-removable"
//! description = "Mount removable media"
//! message = "System policy prevents mounting removable media"
//! vendor = "HAL"
//! policy_any = "auth_admin"
//! policy_active = "yes"
//!
//! [action.annotations]
//! "org.freedesktop.policykit.exec.path" = "/usr/bin/mount"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};
use crate::types::ActionId;

/// Implicit authorization an action grants when no explicit record applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplicitAuthorization {
    /// Never authorized.
    No,
    /// Always authorized.
    Yes,
    /// The user must authenticate as themselves.
    AuthSelf,
    /// The user must authenticate as an administrator.
    AuthAdmin,
    /// As [`Self::AuthSelf`], retained for a short while.
    AuthSelfKeep,
    /// As [`Self::AuthAdmin`], retained for a short while.
    AuthAdminKeep,
}

impl ImplicitAuthorization {
    /// Wire name, as written in catalog files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Yes => "yes",
            Self::AuthSelf => "auth_self",
            Self::AuthAdmin => "auth_admin",
            Self::AuthSelfKeep => "auth_self_keep",
            Self::AuthAdminKeep => "auth_admin_keep",
        }
    }
}

impl fmt::Display for ImplicitAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive metadata for one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescription {
    /// The action this entry describes.
    pub action_id: ActionId,
    /// Short human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Message shown when the action is requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Vendor providing the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Vendor home page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_url: Option<String>,
    /// Icon name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Free-form key/value annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Default for any client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_any: Option<ImplicitAuthorization>,
    /// Default for clients in an inactive session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_inactive: Option<ImplicitAuthorization>,
    /// Default for clients in an active session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_active: Option<ImplicitAuthorization>,
}

impl ActionDescription {
    /// Bare description carrying only the action id.
    #[must_use]
    pub fn new(action_id: ActionId) -> Self {
        Self {
            action_id,
            description: None,
            message: None,
            vendor: None,
            vendor_url: None,
            icon: None,
            annotations: BTreeMap::new(),
            policy_any: None,
            policy_inactive: None,
            policy_active: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the vendor.
    #[must_use]
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }
}

/// Provider of action metadata.
pub trait ActionCatalog: Send + Sync {
    /// Every known action, in the order the registry supplies them.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Catalog`] if the registry cannot be read.
    fn actions(&self) -> AuthResult<Vec<ActionDescription>>;

    /// Ids of every known action, in registry order.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Catalog`] if the registry cannot be read.
    fn list_actions(&self) -> AuthResult<Vec<ActionId>> {
        Ok(self
            .actions()?
            .into_iter()
            .map(|a| a.action_id)
            .collect())
    }

    /// Metadata for `action_id`, or `None` if the catalog does not know it.
    ///
    /// Takes a raw string so malformed ids simply miss.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Catalog`] if the registry cannot be read.
    fn describe(&self, action_id: &str) -> AuthResult<Option<ActionDescription>> {
        Ok(self
            .actions()?
            .into_iter()
            .find(|a| a.action_id.as_str() == action_id))
    }
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticActionCatalog {
    actions: Vec<ActionDescription>,
}

impl StaticActionCatalog {
    /// Catalog over the given descriptions, kept in order.
    #[must_use]
    pub fn new(actions: Vec<ActionDescription>) -> Self {
        Self { actions }
    }

    /// Catalog with no actions.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl ActionCatalog for StaticActionCatalog {
    fn actions(&self) -> AuthResult<Vec<ActionDescription>> {
        Ok(self.actions.clone())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "action")]
    actions: Vec<ActionDescription>,
}

/// Catalog read from a TOML file on every call.
///
/// A missing file is an empty catalog.
#[derive(Debug, Clone)]
pub struct TomlActionCatalog {
    path: PathBuf,
}

impl TomlActionCatalog {
    /// Catalog backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, content: &str) -> AuthResult<Vec<ActionDescription>> {
        let file: CatalogFile = toml::from_str(content).map_err(|e| {
            AuthError::Catalog(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        Ok(file.actions)
    }
}

impl ActionCatalog for TomlActionCatalog {
    fn actions(&self) -> AuthResult<Vec<ActionDescription>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let actions = self.parse(&content)?;
                debug!(path = %self.path.display(), actions = actions.len(), "Loaded action catalog");
                Ok(actions)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Action catalog not found, treating as empty");
                Ok(Vec::new())
            },
            Err(e) => Err(AuthError::Catalog(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }
}

//! Identity resolution: mapping numeric uids to login names and back.
//!
//! The authorization database keys everything by uid, but the policy file
//! stores login names. Resolution is delegated to an [`IdentityResolver`] so
//! tests and embedders can supply their own user table.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// A resolved user: canonical uid plus its login name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Numeric user id.
    pub uid: u32,
    /// Login name, used as the on-disk section key.
    pub name: String,
}

impl Identity {
    /// Create an identity from its parts.
    #[must_use]
    pub fn new(uid: u32, name: impl Into<String>) -> Self {
        Self {
            uid,
            name: name.into(),
        }
    }

    /// The informational `Identity` field written to the policy file.
    #[must_use]
    pub fn unix_user(&self) -> String {
        format!("unix-user:{}", self.name)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.uid)
    }
}

/// Maps uids to login names and back.
pub trait IdentityResolver: Send + Sync {
    /// Login name for `uid`, or `None` if no such user exists.
    fn login_name(&self, uid: u32) -> Option<String>;

    /// Uid for `name`, or `None` if no such user exists.
    fn uid_for_name(&self, name: &str) -> Option<u32>;

    /// Resolve `uid` to a full [`Identity`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownIdentity`] if the uid does not resolve.
    fn resolve(&self, uid: u32) -> AuthResult<Identity> {
        self.login_name(uid)
            .map(|name| Identity::new(uid, name))
            .ok_or(AuthError::UnknownIdentity { uid })
    }
}

/// Resolver backed by the operating system's user database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentityResolver;

impl SystemIdentityResolver {
    /// Create a resolver over the system user database.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl IdentityResolver for SystemIdentityResolver {
    fn login_name(&self, uid: u32) -> Option<String> {
        use nix::unistd::{Uid, User};

        match User::from_uid(Uid::from_raw(uid)) {
            Ok(user) => user.map(|u| u.name),
            Err(e) => {
                debug!(uid, error = %e, "passwd lookup by uid failed");
                None
            },
        }
    }

    fn uid_for_name(&self, name: &str) -> Option<u32> {
        use nix::unistd::User;

        match User::from_name(name) {
            Ok(user) => user.map(|u| u.uid.as_raw()),
            Err(e) => {
                debug!(name, error = %e, "passwd lookup by name failed");
                None
            },
        }
    }
}

#[cfg(not(unix))]
impl IdentityResolver for SystemIdentityResolver {
    fn login_name(&self, uid: u32) -> Option<String> {
        debug!(uid, "no system user database on this platform");
        None
    }

    fn uid_for_name(&self, _name: &str) -> Option<u32> {
        None
    }
}

/// Fixed uid/name table, for tests and sandboxed deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    by_uid: HashMap<u32, String>,
}

impl StaticIdentityResolver {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user to the table.
    #[must_use]
    pub fn with_user(mut self, uid: u32, name: impl Into<String>) -> Self {
        self.insert(uid, name);
        self
    }

    /// Add or replace a user.
    pub fn insert(&mut self, uid: u32, name: impl Into<String>) {
        self.by_uid.insert(uid, name.into());
    }

    /// Remove a user, as if the account had been deleted.
    pub fn remove(&mut self, uid: u32) -> Option<String> {
        self.by_uid.remove(&uid)
    }
}

impl IdentityResolver for StaticIdentityResolver {
    fn login_name(&self, uid: u32) -> Option<String> {
        self.by_uid.get(&uid).cloned()
    }

    fn uid_for_name(&self, name: &str) -> Option<u32> {
        self.by_uid
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(uid, _)| *uid)
    }
}

//! Policy vocabulary: action identifiers, grant scopes, record polarity and
//! resolution outcomes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Opaque, reverse-DNS style action identifier (e.g. `org.freedesktop.hal.storage.mount`).
///
/// The on-disk format joins action ids with `:`, so ids may not contain a
/// colon, an `=`, whitespace or control characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActionId(String);

impl ActionId {
    /// Validate and wrap an action identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] if the id is empty or contains
    /// a character that cannot be stored in the policy file.
    pub fn new(id: impl Into<String>) -> AuthResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(AuthError::InvalidArgument(
                "action id must not be empty".to_string(),
            ));
        }
        if let Some(bad) = id
            .chars()
            .find(|c| *c == ':' || *c == '=' || c.is_whitespace() || c.is_control())
        {
            return Err(AuthError::InvalidArgument(format!(
                "action id {id:?} contains forbidden character {bad:?}"
            )));
        }
        Ok(Self(id))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ActionId {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ActionId {
    type Error = AuthError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ActionId> for String {
    fn from(id: ActionId) -> Self {
        id.0
    }
}

impl AsRef<str> for ActionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifetime of a granted authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Valid for a single use by one process.
    OneShot,
    /// Valid for the lifetime of one process.
    Process,
    /// Valid for the login session.
    Session,
    /// Persists indefinitely.
    Always,
}

impl Scope {
    /// Whether a grant of this scope must name the process it is bound to.
    #[must_use]
    pub fn requires_pid(self) -> bool {
        matches!(self, Self::OneShot | Self::Process)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::OneShot => "one_shot",
            Self::Process => "process",
            Self::Session => "session",
            Self::Always => "always",
        })
    }
}

impl FromStr for Scope {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "one_shot" | "oneshot" => Ok(Self::OneShot),
            "process" => Ok(Self::Process),
            "session" => Ok(Self::Session),
            "always" => Ok(Self::Always),
            other => Err(AuthError::InvalidArgument(format!("unknown scope: {other}"))),
        }
    }
}

/// Whether a record grants or blocks its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Positive grant.
    Allow,
    /// Negative grant; wins over any allow for the same action.
    Deny,
}

impl Polarity {
    /// Section-key suffix used on disk.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }

    /// Parse a section-key suffix.
    #[must_use]
    pub fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "allow" => Some(Self::Allow),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }

    /// Result value a freshly created record of this polarity carries.
    #[must_use]
    pub fn default_result(self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Effective authorization of one uid for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// An allow record names the action and no deny record does.
    Allowed,
    /// A deny record names the action.
    Blocked,
    /// Nothing in the store names the action for this uid.
    Unspecified,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "allowed"),
            Self::Blocked => write!(f, "blocked"),
            Self::Unspecified => write!(f, "unspecified"),
        }
    }
}
